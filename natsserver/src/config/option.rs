//! Registry of recognised nats-server options
//!
//! A closed set: every option the harness knows how to pass to the server,
//! with its canonical name, built-in default and how it is rendered on the
//! command line.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{NatsServerError, NatsServerResult};

/// Built-in default port of nats-server
pub const DEFAULT_PORT: u16 = 4222;

/// Built-in default of an option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Text(&'static str),
    Int(i64),
    Switch(bool),
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Text(text) => f.write_str(text),
            DefaultValue::Int(value) => write!(f, "{value}"),
            DefaultValue::Switch(value) => write!(f, "{value}"),
        }
    }
}

/// How an option is rendered on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// `--name value`
    Value,
    /// `--name`, only when the value is truthy
    Switch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigOption {
    Addr,
    Port,
    Name,
    Pid,
    HttpPort,
    HttpsPort,
    ClientAdvertise,
    PortsFileDir,
    Config,
    Log,
    Logtime,
    Syslog,
    RemoteSyslog,
    Debug,
    Trace,
    User,
    Pass,
    Auth,
    Tls,
    TlsCert,
    TlsKey,
    TlsVerify,
    TlsCaCert,
    Routes,
    Cluster,
    ClusterName,
    NoAdvertise,
    ClusterAdvertise,
    ConnectRetries,
    Jetstream,
    StoreDir,
}

use ConfigOption::*;

const ALL: [ConfigOption; 31] = [
    Addr,
    Port,
    Name,
    Pid,
    HttpPort,
    HttpsPort,
    ClientAdvertise,
    PortsFileDir,
    Config,
    Log,
    Logtime,
    Syslog,
    RemoteSyslog,
    Debug,
    Trace,
    User,
    Pass,
    Auth,
    Tls,
    TlsCert,
    TlsKey,
    TlsVerify,
    TlsCaCert,
    Routes,
    Cluster,
    ClusterName,
    NoAdvertise,
    ClusterAdvertise,
    ConnectRetries,
    Jetstream,
    StoreDir,
];

impl ConfigOption {
    /// Every recognised option, in command-line order
    pub fn all() -> &'static [ConfigOption] {
        &ALL
    }

    /// Canonical lowercase name, as used in `name:value` entries and
    /// environment property keys
    pub fn name(&self) -> &'static str {
        match self {
            Addr => "addr",
            Port => "port",
            Name => "name",
            Pid => "pid",
            HttpPort => "http_port",
            HttpsPort => "https_port",
            ClientAdvertise => "client_advertise",
            PortsFileDir => "ports_file_dir",
            Config => "config",
            Log => "log",
            Logtime => "logtime",
            Syslog => "syslog",
            RemoteSyslog => "remote_syslog",
            Debug => "debug",
            Trace => "trace",
            User => "user",
            Pass => "pass",
            Auth => "auth",
            Tls => "tls",
            TlsCert => "tlscert",
            TlsKey => "tlskey",
            TlsVerify => "tlsverify",
            TlsCaCert => "tlscacert",
            Routes => "routes",
            Cluster => "cluster",
            ClusterName => "cluster_name",
            NoAdvertise => "no_advertise",
            ClusterAdvertise => "cluster_advertise",
            ConnectRetries => "connect_retries",
            Jetstream => "jetstream",
            StoreDir => "store_dir",
        }
    }

    pub fn default_value(&self) -> Option<DefaultValue> {
        match self {
            Addr => Some(DefaultValue::Text("0.0.0.0")),
            Port => Some(DefaultValue::Int(DEFAULT_PORT as i64)),
            Logtime => Some(DefaultValue::Switch(true)),
            Syslog | Debug | Trace | Tls | TlsVerify | NoAdvertise | Jetstream => {
                Some(DefaultValue::Switch(false))
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> OptionKind {
        match self.default_value() {
            Some(DefaultValue::Switch(_)) => OptionKind::Switch,
            _ => OptionKind::Value,
        }
    }

    /// Command-line flag for this option
    pub fn flag(&self) -> String {
        format!("--{}", self.name())
    }

    /// Look up an option by name, ignoring case and `-`/`_` differences
    pub fn from_name(name: &str) -> NatsServerResult<ConfigOption> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        if normalized == "password" {
            return Ok(Pass);
        }

        ALL.iter()
            .copied()
            .find(|option| option.name() == normalized)
            .ok_or_else(|| NatsServerError::UnknownOption {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigOption {
    type Err = NatsServerError;

    fn from_str(s: &str) -> NatsServerResult<Self> {
        ConfigOption::from_name(s)
    }
}

impl Serialize for ConfigOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ConfigOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        ConfigOption::from_name(&name).map_err(serde::de::Error::custom)
    }
}

/// Whether a switch value turns the switch on
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
