//! Embedded Configuration Builder
//!
//! Provides a flexible builder pattern for constructing embedded server configurations

use std::path::PathBuf;
use std::time::Duration;

use super::EmbeddedConfig;
use crate::core::Readiness;

pub struct EmbeddedConfigBuilder {
    config: EmbeddedConfig,
}

impl EmbeddedConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EmbeddedConfig::default(),
        }
    }

    /// Add a single `name:value` entry
    pub fn entry<S: Into<String>>(mut self, entry: S) -> Self {
        self.config.entries.push(entry.into());
        self
    }

    /// Add several `name:value` entries, keeping their order
    pub fn entries<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.entries.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Set a fixed port (`-1` asks for a free port)
    pub fn port(mut self, port: i32) -> Self {
        self.config.port = Some(port);
        self
    }

    /// Set the url the server executable is obtained from
    pub fn source_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.source_url = Some(url.into());
        self
    }

    /// Use this executable instead of searching for one
    pub fn binary_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.binary_path = Some(path.into());
        self
    }

    /// Set teardown timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set teardown timeout in milliseconds
    pub fn timeout_ms(self, timeout_ms: u64) -> Self {
        self.timeout(Duration::from_millis(timeout_ms))
    }

    /// Set how long to wait for the server to become ready
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.config.startup_timeout = timeout;
        self
    }

    pub fn readiness(mut self, readiness: Readiness) -> Self {
        self.config.readiness = readiness;
        self
    }

    /// Set environment property namespace
    pub fn namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> EmbeddedConfig {
        self.config
    }
}

impl Default for EmbeddedConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
