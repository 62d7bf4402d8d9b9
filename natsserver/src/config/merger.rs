//! Configuration merging
//!
//! Layers are folded first-write-wins, highest precedence first:
//!
//! 1. values passed explicitly by the caller
//! 2. `<namespace>.source.default` / `<namespace>.server.<option>` properties
//! 3. `<namespace>.source.<os>` properties
//! 4. built-in option defaults
//!
//! A lower layer never replaces a value a higher layer already set.

use shared::OsType;
use url::Url;

use super::option::{ConfigOption, DEFAULT_PORT};
use super::{ConfigMap, EmbeddedConfig};
use crate::error::{NatsServerError, NatsServerResult};
use crate::traits::PropertySource;

/// Release fetched when nothing overrides the source url
pub const DEFAULT_SERVER_VERSION: &str = "v2.10.22";

/// Configuration after every source has been applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub config: ConfigMap,
    pub source_url: Option<Url>,
}

/// Fold `overrides` into `base`, never replacing a value already present
pub fn merge<'a, I>(base: ConfigMap, overrides: I) -> ConfigMap
where
    I: IntoIterator<Item = (&'a str, ConfigMap)>,
{
    let mut merged = base;
    for (source, layer) in overrides {
        for (option, value) in layer.iter() {
            if merged.insert_if_absent(option, value) {
                tracing::debug!(source, option = %option, "Applied configuration value");
            } else {
                tracing::trace!(source, option = %option, "Kept higher precedence value");
            }
        }
    }
    merged
}

/// Collect server option values from the environment
///
/// Properties under `<namespace>.server.` whose suffix is not a known option
/// are ignored. Empty values are ignored.
pub fn environment_overrides(env: &dyn PropertySource, config: &EmbeddedConfig) -> ConfigMap {
    let mut overrides = ConfigMap::new();

    for option in ConfigOption::all() {
        if let Some(value) = non_empty(env.property(&config.server_key(option.name()))) {
            overrides.insert(*option, value);
        }
    }

    let prefix = config.server_prefix();
    for name in env.property_names() {
        let Some(suffix) = name.strip_prefix(&prefix) else {
            continue;
        };
        match ConfigOption::from_name(suffix) {
            Ok(option) => {
                // Aliases and relaxed spellings not covered by the canonical lookup
                if !overrides.contains(option) {
                    if let Some(value) = non_empty(env.property(&name)) {
                        overrides.insert(option, value);
                    }
                }
            }
            Err(_) => {
                tracing::debug!(property = %name, "Ignoring unknown server option from environment");
            }
        }
    }

    overrides
}

/// Apply a caller-supplied fixed port
///
/// The port is only taken when it differs from the built-in default, since
/// the default says nothing about what the caller wants; an already
/// configured port is kept in that case.
pub fn apply_port_override(config: &mut ConfigMap, port: Option<i32>) {
    match port {
        Some(port) if port != DEFAULT_PORT as i32 => {
            config.insert(ConfigOption::Port, port.to_string());
        }
        _ => {}
    }
}

/// Built-in defaults that must be present before launch
pub fn required_defaults() -> ConfigMap {
    ConfigMap::from([(ConfigOption::Port, "4222")])
}

/// Resolve the url the server executable is obtained from
pub fn resolve_source_url(
    env: &dyn PropertySource,
    config: &EmbeddedConfig,
    os: OsType,
) -> NatsServerResult<Option<Url>> {
    if let Some(explicit) = &config.source_url {
        let url = Url::parse(explicit).map_err(|source| NatsServerError::InvalidSourceUrl {
            url: explicit.clone(),
            source,
        })?;
        return Ok(Some(url));
    }

    for qualifier in ["default", os.as_str()] {
        let key = config.source_key(qualifier);
        if let Some(value) = non_empty(env.property(&key)) {
            match Url::parse(&value) {
                Ok(url) => return Ok(Some(url)),
                Err(e) => {
                    tracing::warn!(property = %key, value = %value, "Ignoring invalid source url: {}", e);
                }
            }
        }
    }

    Ok(default_source_url(os))
}

/// Release archive of nats-server for `os` on the current architecture
pub fn default_source_url(os: OsType) -> Option<Url> {
    let platform = match os {
        OsType::Linux => "linux",
        OsType::Mac => "darwin",
        OsType::Windows => "windows",
        OsType::Solaris | OsType::Unknown => return None,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "arm" => "arm7",
        other => other,
    };
    let url = format!(
        "https://github.com/nats-io/nats-server/releases/download/{v}/nats-server-{v}-{platform}-{arch}.zip",
        v = DEFAULT_SERVER_VERSION
    );
    Url::parse(&url).ok()
}

/// Run the full merge for an embedded configuration
pub fn resolve_config(
    config: &EmbeddedConfig,
    env: &dyn PropertySource,
    os: OsType,
) -> NatsServerResult<ResolvedConfig> {
    let explicit = ConfigMap::parse_entries(&config.entries)?;

    let mut merged = merge(explicit, [("environment", environment_overrides(env, config))]);
    apply_port_override(&mut merged, config.port);
    let merged = merge(merged, [("default", required_defaults())]);

    let source_url = resolve_source_url(env, config, os)?;

    Ok(ResolvedConfig {
        config: merged,
        source_url,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MapPropertySource;
    use crate::traits::MockPropertySource;

    fn config_with(entries: &[&str]) -> EmbeddedConfig {
        EmbeddedConfig::builder().entries(entries.iter().copied()).build()
    }

    #[test]
    fn test_merge_adds_missing_values() {
        let base = ConfigMap::from([(ConfigOption::Port, "4222")]);
        let explicit = ConfigMap::from([(ConfigOption::User, "admin")]);

        let merged = merge(base, [("explicit", explicit)]);

        assert_eq!(
            merged,
            ConfigMap::from([(ConfigOption::Port, "4222"), (ConfigOption::User, "admin")])
        );
    }

    #[test]
    fn test_merge_first_write_wins() {
        let base = ConfigMap::from([(ConfigOption::User, "caller")]);
        let merged = merge(
            base,
            [
                ("environment", ConfigMap::from([(ConfigOption::User, "env"), (ConfigOption::Pass, "env")])),
                ("default", ConfigMap::from([(ConfigOption::Pass, "default")])),
            ],
        );

        assert_eq!(merged.get(ConfigOption::User), Some("caller"));
        assert_eq!(merged.get(ConfigOption::Pass), Some("env"));
    }

    #[test]
    fn test_caller_value_beats_environment() {
        let env = MapPropertySource::new()
            .with("nats.server.user", "from-env")
            .with("nats.server.pass", "env-pass");
        let config = config_with(&["user:admin"]);

        let resolved = resolve_config(&config, &env, OsType::Linux).unwrap();

        assert_eq!(resolved.config.get(ConfigOption::User), Some("admin"));
        assert_eq!(resolved.config.get(ConfigOption::Pass), Some("env-pass"));
    }

    #[test]
    fn test_unknown_environment_keys_are_ignored() {
        let env = MapPropertySource::new()
            .with("nats.server.colour", "blue")
            .with("nats.server.user", "admin")
            .with("other.server.pass", "nope");

        let overrides = environment_overrides(&env, &EmbeddedConfig::default());

        assert_eq!(overrides, ConfigMap::from([(ConfigOption::User, "admin")]));
    }

    #[test]
    fn test_environment_aliases_and_relaxed_names() {
        let env = MapPropertySource::new()
            .with("nats.server.password", "secret")
            .with("nats.server.HTTP-PORT", "8222");

        let overrides = environment_overrides(&env, &EmbeddedConfig::default());

        assert_eq!(overrides.get(ConfigOption::Pass), Some("secret"));
        assert_eq!(overrides.get(ConfigOption::HttpPort), Some("8222"));
    }

    #[test]
    fn test_empty_environment_values_are_ignored() {
        let env = MapPropertySource::new().with("nats.server.user", "  ");
        let overrides = environment_overrides(&env, &EmbeddedConfig::default());
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_environment_scan_uses_namespace() {
        let env = MapPropertySource::new()
            .with("broker.server.user", "admin")
            .with("nats.server.pass", "ignored");
        let config = EmbeddedConfig::builder().namespace("broker").build();

        let overrides = environment_overrides(&env, &config);

        assert_eq!(overrides, ConfigMap::from([(ConfigOption::User, "admin")]));
    }

    #[test]
    fn test_default_port_keeps_previous_port() {
        let env = MapPropertySource::new().with("nats.server.port", "4333");
        let config = EmbeddedConfig::builder().port(4222).build();

        let resolved = resolve_config(&config, &env, OsType::Linux).unwrap();

        assert_eq!(resolved.config.get(ConfigOption::Port), Some("4333"));
    }

    #[test]
    fn test_non_default_port_wins() {
        let env = MapPropertySource::new().with("nats.server.port", "4333");
        let config = EmbeddedConfig::builder().entry("port:4444").port(4555).build();

        let resolved = resolve_config(&config, &env, OsType::Linux).unwrap();

        assert_eq!(resolved.config.get(ConfigOption::Port), Some("4555"));
    }

    #[test]
    fn test_port_defaults_when_absent() {
        let resolved =
            resolve_config(&EmbeddedConfig::default(), &MapPropertySource::new(), OsType::Linux).unwrap();
        assert_eq!(resolved.config.get(ConfigOption::Port), Some("4222"));
    }

    #[test]
    fn test_explicit_unknown_option_is_fatal() {
        let config = config_with(&["colour:blue"]);
        let result = resolve_config(&config, &MapPropertySource::new(), OsType::Linux);
        assert!(matches!(result, Err(NatsServerError::UnknownOption { .. })));
    }

    #[test]
    fn test_source_url_precedence() {
        let env = MapPropertySource::new()
            .with("nats.source.default", "https://mirror.example.org/default.zip")
            .with("nats.source.linux", "https://mirror.example.org/linux.zip");

        let caller = EmbeddedConfig::builder()
            .source_url("https://caller.example.org/nats.zip")
            .build();
        let url = resolve_source_url(&env, &caller, OsType::Linux).unwrap().unwrap();
        assert_eq!(url.as_str(), "https://caller.example.org/nats.zip");

        let url = resolve_source_url(&env, &EmbeddedConfig::default(), OsType::Linux)
            .unwrap()
            .unwrap();
        assert_eq!(url.as_str(), "https://mirror.example.org/default.zip");

        let os_only = MapPropertySource::new().with("nats.source.mac", "https://mirror.example.org/mac.zip");
        let url = resolve_source_url(&os_only, &EmbeddedConfig::default(), OsType::Mac)
            .unwrap()
            .unwrap();
        assert_eq!(url.as_str(), "https://mirror.example.org/mac.zip");
    }

    #[test]
    fn test_source_url_falls_back_to_release() {
        let url = resolve_source_url(&MapPropertySource::new(), &EmbeddedConfig::default(), OsType::Linux)
            .unwrap()
            .unwrap();
        assert!(url.as_str().contains("nats-server"));
        assert!(url.as_str().contains("linux"));

        let none = resolve_source_url(&MapPropertySource::new(), &EmbeddedConfig::default(), OsType::Unknown)
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_invalid_environment_source_url_is_skipped() {
        let env = MapPropertySource::new()
            .with("nats.source.default", "not a url")
            .with("nats.source.linux", "https://mirror.example.org/linux.zip");

        let url = resolve_source_url(&env, &EmbeddedConfig::default(), OsType::Linux)
            .unwrap()
            .unwrap();
        assert_eq!(url.as_str(), "https://mirror.example.org/linux.zip");
    }

    #[test]
    fn test_invalid_caller_source_url_is_fatal() {
        let config = EmbeddedConfig::builder().source_url("::nope").build();
        let result = resolve_source_url(&MapPropertySource::new(), &config, OsType::Linux);
        assert!(matches!(result, Err(NatsServerError::InvalidSourceUrl { .. })));
    }

    #[test]
    fn test_non_enumerable_source() {
        let mut env = MockPropertySource::new();
        env.expect_property()
            .returning(|key| (key == "nats.server.user").then(|| "admin".to_string()));
        env.expect_property_names().returning(Vec::new);

        let overrides = environment_overrides(&env, &EmbeddedConfig::default());

        assert_eq!(overrides, ConfigMap::from([(ConfigOption::User, "admin")]));
    }
}
