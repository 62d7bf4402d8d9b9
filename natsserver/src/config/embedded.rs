//! Embedded server configuration
//!
//! Raw, unmerged configuration handed to the lifecycle adapter by test
//! setup code.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::Readiness;

/// Default teardown timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed for the server to become ready
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default environment property namespace
pub const DEFAULT_NAMESPACE: &str = "nats";

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedConfig {
    /// Ordered `name:value` entries, e.g. `port:4222`, `user:admin`
    pub entries: Vec<String>,
    /// Fixed port; only honoured when it differs from the built-in default
    pub port: Option<i32>,
    pub source_url: Option<String>,
    /// Executable to use instead of searching for one
    pub binary_path: Option<PathBuf>,
    /// Bound for stopping the server at teardown
    pub timeout: Duration,
    pub startup_timeout: Duration,
    pub readiness: Readiness,
    /// Prefix of environment property names
    pub namespace: String,
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            port: None,
            source_url: None,
            binary_path: None,
            timeout: DEFAULT_TIMEOUT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            readiness: Readiness::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl EmbeddedConfig {
    /// Create a new builder
    pub fn builder() -> crate::config::builder::EmbeddedConfigBuilder {
        crate::config::builder::EmbeddedConfigBuilder::new()
    }

    /// Property key carrying an environment value for a server option
    pub fn server_key(&self, option_name: &str) -> String {
        format!("{}.server.{}", self.namespace, option_name)
    }

    /// Prefix shared by every server option property
    pub fn server_prefix(&self) -> String {
        format!("{}.server.", self.namespace)
    }

    /// Property key carrying a source url override (`default` or an OS type)
    pub fn source_key(&self, qualifier: &str) -> String {
        format!("{}.source.{}", self.namespace, qualifier)
    }
}
