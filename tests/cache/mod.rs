//! Cache behavior under time, capacity and concurrency pressure.
//!
//! Test organization:
//! - expiry.rs: expiry after write, driven by a paused clock
//! - eviction.rs: size bound and least-recently-used order
//! - concurrency.rs: shared handles used from many tasks

mod expiry;
