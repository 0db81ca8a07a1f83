//! Unit test suite.
//!
//! Exercises the library API across module boundaries without going through
//! the binary: channel resolution against manifest-built tables, and release
//! trees travelling from the cache into installations.

mod provisioning_tests;
mod resolver_tests;
