//! Service implementations
//!
//! Real implementations of the collaborator traits: environment property
//! sources and local executable lookup.

pub mod binary_resolver;
pub mod environment;

// Re-export all service implementations
pub use binary_resolver::LocalBinaryResolver;
pub use environment::{EnvPropertySource, MapPropertySource};
