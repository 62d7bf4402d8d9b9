//! Common test utilities and infrastructure
//!
//! Fixtures and helpers shared by the natsserver test suites. Process
//! tests run against small shell scripts standing in for nats-server.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::{FakeBroker, TestFixtures};
pub use helpers::{ServerBuilder, TestHelpers};
