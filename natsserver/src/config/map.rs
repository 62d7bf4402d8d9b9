//! Resolved option → value mapping

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::option::ConfigOption;
use crate::error::{NatsServerError, NatsServerResult};

/// Final set of settings used to launch the server
///
/// Iteration follows registry order so rendered command lines are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap {
    values: BTreeMap<ConfigOption, String>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse ordered `name:value` entries, e.g. `port:4222`, `user:admin`
    ///
    /// Names are resolved against the registry; an unknown name is an error
    /// here since these entries come straight from the caller. Later entries
    /// for the same option replace earlier ones.
    pub fn parse_entries<I, S>(entries: I) -> NatsServerResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = ConfigMap::new();
        for entry in entries {
            let (option, value) = parse_entry(entry.as_ref())?;
            map.insert(option, value);
        }
        Ok(map)
    }

    pub fn get(&self, option: ConfigOption) -> Option<&str> {
        self.values.get(&option).map(String::as_str)
    }

    pub fn contains(&self, option: ConfigOption) -> bool {
        self.values.contains_key(&option)
    }

    pub fn insert(&mut self, option: ConfigOption, value: impl Into<String>) -> Option<String> {
        self.values.insert(option, value.into())
    }

    /// Insert only when the option has no value yet; returns whether it was set
    pub fn insert_if_absent(&mut self, option: ConfigOption, value: impl Into<String>) -> bool {
        if self.values.contains_key(&option) {
            return false;
        }
        self.values.insert(option, value.into());
        true
    }

    pub fn remove(&mut self, option: ConfigOption) -> Option<String> {
        self.values.remove(&option)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConfigOption, &str)> {
        self.values.iter().map(|(option, value)| (*option, value.as_str()))
    }

    /// Configured port as a signed number (`-1` requests auto-assignment)
    pub fn port(&self) -> Option<i32> {
        self.get(ConfigOption::Port)
            .and_then(|value| value.trim().parse::<i32>().ok())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl FromIterator<(ConfigOption, String)> for ConfigMap {
    fn from_iter<T: IntoIterator<Item = (ConfigOption, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<[(ConfigOption, &str); N]> for ConfigMap {
    fn from(entries: [(ConfigOption, &str); N]) -> Self {
        entries
            .into_iter()
            .map(|(option, value)| (option, value.to_string()))
            .collect()
    }
}

fn parse_entry(entry: &str) -> NatsServerResult<(ConfigOption, String)> {
    let (name, value) = entry
        .split_once(':')
        .ok_or_else(|| NatsServerError::InvalidConfigEntry {
            entry: entry.to_string(),
            reason: "expected name:value".to_string(),
        })?;

    if name.trim().is_empty() {
        return Err(NatsServerError::InvalidConfigEntry {
            entry: entry.to_string(),
            reason: "missing option name".to_string(),
        });
    }

    let value = value.trim();
    if value.is_empty() {
        return Err(NatsServerError::InvalidConfigEntry {
            entry: entry.to_string(),
            reason: "missing value".to_string(),
        });
    }

    Ok((ConfigOption::from_name(name)?, value.to_string()))
}
