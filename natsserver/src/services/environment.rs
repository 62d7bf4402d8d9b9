//! Property sources backing environment overrides
//!
//! ## Configuration Sources
//! [`EnvPropertySource`] reads:
//! 1. `.env` file in the current directory or parent directories (if present)
//! 2. System environment variables
//!
//! Environment variables take precedence over .env file values. A dotted
//! key such as `nats.server.user` is also answered by its upper-snake form
//! `NATS_SERVER_USER`.

use std::collections::HashMap;

use crate::traits::PropertySource;

/// Property source over the process environment
pub struct EnvPropertySource;

impl EnvPropertySource {
    pub fn new() -> Self {
        Self
    }

    /// Load `.env` into the process environment, then read from it
    ///
    /// Safe to call multiple times as dotenv ignores already set variables.
    pub fn load() -> Self {
        // Silently continue when no .env file exists
        let _ = dotenv::dotenv();
        Self::new()
    }
}

impl Default for EnvPropertySource {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySource for EnvPropertySource {
    fn property(&self, key: &str) -> Option<String> {
        read_var(key).or_else(|| read_var(&env_var_name(key)))
    }

    /// Variables whose name or value is not valid unicode are skipped
    fn property_names(&self) -> Vec<String> {
        std::env::vars_os()
            .filter_map(|(name, value)| {
                value.into_string().ok()?;
                name.into_string().ok()
            })
            .map(|name| {
                if name.contains('.') {
                    name
                } else {
                    dotted_name(&name)
                }
            })
            .collect()
    }
}

fn read_var(name: &str) -> Option<String> {
    if name.is_empty() || name.contains(['=', '\0']) {
        return None;
    }
    std::env::var_os(name)?.into_string().ok()
}

/// Upper-snake environment variable name for a dotted key
pub fn env_var_name(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Dotted key for an upper-snake variable: the first two `_` separate
/// namespace, group and name (`NATS_SERVER_HTTP_PORT` → `nats.server.http_port`)
pub fn dotted_name(var: &str) -> String {
    var.to_ascii_lowercase().splitn(3, '_').collect::<Vec<_>>().join(".")
}

/// In-memory property source
#[derive(Debug, Clone, Default)]
pub struct MapPropertySource {
    properties: HashMap<String, String>,
}

impl MapPropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property (fluent API)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapPropertySource {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl PropertySource for MapPropertySource {
    fn property(&self, key: &str) -> Option<String> {
        self.properties.get(key).cloned()
    }

    fn property_names(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("nats.server.user"), "NATS_SERVER_USER");
        assert_eq!(env_var_name("nats.server.http_port"), "NATS_SERVER_HTTP_PORT");
        assert_eq!(env_var_name("nats.source.default"), "NATS_SOURCE_DEFAULT");
    }

    #[test]
    fn test_dotted_name() {
        assert_eq!(dotted_name("NATS_SERVER_HTTP_PORT"), "nats.server.http_port");
        assert_eq!(dotted_name("NATS_SOURCE_LINUX"), "nats.source.linux");
        assert_eq!(dotted_name("PATH"), "path");
    }

    #[test]
    fn test_map_source() {
        let source: MapPropertySource = [("nats.server.user", "admin")].into_iter().collect();
        assert_eq!(source.property("nats.server.user").as_deref(), Some("admin"));
        assert_eq!(source.property("nats.server.pass"), None);
        assert_eq!(source.property_names(), vec!["nats.server.user".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_env_source_skips_non_unicode_variables() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        // SAFETY: no other test touches BADENV_* variables
        unsafe {
            std::env::set_var("BADENV_SERVER_PASS", OsStr::from_bytes(&[0xff, 0xfe]));
            std::env::set_var(OsStr::from_bytes(b"BADENV_SERVER_\xff"), "admin");
            std::env::set_var("BADENV_SERVER_USER", "admin");
        }
        let source = EnvPropertySource::new();

        let names = source.property_names();

        assert!(names.contains(&"badenv.server.user".to_string()));
        assert!(!names.contains(&"badenv.server.pass".to_string()));
        assert_eq!(source.property("badenv.server.pass"), None);
        assert_eq!(source.property("badenv.server.user").as_deref(), Some("admin"));

        unsafe {
            std::env::remove_var("BADENV_SERVER_PASS");
            std::env::remove_var(OsStr::from_bytes(b"BADENV_SERVER_\xff"));
            std::env::remove_var("BADENV_SERVER_USER");
        }
    }

    #[test]
    fn test_env_source_reads_relaxed_names() {
        // Unique names keep this independent of other tests touching the environment
        unsafe {
            std::env::set_var("ENVTEST_SERVER_USER", "admin");
        }
        let source = EnvPropertySource::new();

        assert_eq!(source.property("envtest.server.user").as_deref(), Some("admin"));
        assert!(
            source
                .property_names()
                .contains(&"envtest.server.user".to_string())
        );

        unsafe {
            std::env::remove_var("ENVTEST_SERVER_USER");
        }
    }
}
