//! Configuration Management
//!
//! Option registry, the resolved option map, raw embedded configuration and
//! the merge of all configuration sources.

pub mod builder;
pub mod embedded;
pub mod map;
pub mod merger;
pub mod option;

// Re-export main types
pub use builder::EmbeddedConfigBuilder;
pub use embedded::EmbeddedConfig;
pub use map::ConfigMap;
pub use merger::{merge, resolve_config, ResolvedConfig};
pub use option::{ConfigOption, DefaultValue, OptionKind, DEFAULT_PORT};
