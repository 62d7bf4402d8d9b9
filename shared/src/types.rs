//! Core shared types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{SharedError, SharedResult};

/// Operating system family the harness is running on
///
/// The lowercase display form (`linux`, `mac`, `windows`, `solaris`) is used
/// to key per-platform environment properties and executable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsType {
    Linux,
    Mac,
    Windows,
    Solaris,
    Unknown,
}

impl OsType {
    /// Detect the operating system of the current process
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map a Rust target OS name (`std::env::consts::OS`) to an [`OsType`]
    pub fn from_os_name(name: &str) -> Self {
        match name {
            "linux" | "android" => OsType::Linux,
            "macos" | "ios" => OsType::Mac,
            "windows" => OsType::Windows,
            "solaris" | "illumos" => OsType::Solaris,
            _ => OsType::Unknown,
        }
    }

    /// Lowercase name used in property keys
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Linux => "linux",
            OsType::Mac => "mac",
            OsType::Windows => "windows",
            OsType::Solaris => "solaris",
            OsType::Unknown => "unknown",
        }
    }

    /// File suffix executables carry on this platform
    pub fn executable_suffix(&self) -> &'static str {
        match self {
            OsType::Windows => ".exe",
            _ => "",
        }
    }

    /// Whether a prebuilt server binary can exist for this platform
    pub fn is_supported(&self) -> bool {
        !matches!(self, OsType::Unknown)
    }

    /// `self` when nats-server is built for it, `UnsupportedOs` otherwise
    pub fn ensure_supported(self) -> SharedResult<Self> {
        if self.is_supported() {
            Ok(self)
        } else {
            Err(SharedError::UnsupportedOs {
                name: std::env::consts::OS.to_string(),
            })
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsType {
    type Err = SharedError;

    fn from_str(s: &str) -> SharedResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(OsType::Linux),
            "mac" | "macos" | "darwin" => Ok(OsType::Mac),
            "windows" => Ok(OsType::Windows),
            "solaris" => Ok(OsType::Solaris),
            "unknown" => Ok(OsType::Unknown),
            other => Err(SharedError::InvalidConfig {
                field: "os_type".to_string(),
                value: other.to_string(),
            }),
        }
    }
}
