//! Property-based tests for the cache and the circuit breaker.
//!
//! Run with: cargo test --test property_tests

pub mod cache;
