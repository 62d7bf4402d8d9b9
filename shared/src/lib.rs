//! Shared types for the embedded NATS server harness
//!
//! Contains the pieces every crate in the workspace needs: operating
//! system detection, the shared error type and tracing setup.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
