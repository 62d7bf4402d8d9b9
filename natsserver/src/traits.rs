//! Trait definitions with mockall annotations for testing
//!
//! These are the seams to the harness's external collaborators: where
//! configuration properties come from and how the server executable is
//! obtained for the current platform.

use shared::OsType;
use std::path::PathBuf;
use url::Url;

use crate::error::NatsServerResult;

/// Environment abstraction supplying configuration properties
///
/// Keys use the dotted form `<namespace>.server.<option>` and
/// `<namespace>.source.<default|os>`.
#[mockall::automock]
pub trait PropertySource: Send + Sync {
    /// Value of a single property, if set
    fn property(&self, key: &str) -> Option<String>;

    /// Names of every property this source can enumerate
    ///
    /// Used to detect keys that look like server options but are not
    /// recognised. Sources that cannot enumerate may return an empty list.
    fn property_names(&self) -> Vec<String>;
}

/// Locates (or installs) the nats-server executable for a platform
#[mockall::automock]
pub trait BinaryResolver: Send + Sync {
    /// Path of an executable usable on `os`
    ///
    /// `source_url` is where an installer would fetch the binary from when it
    /// is not present locally.
    fn resolve(&self, os: OsType, source_url: Option<Url>) -> NatsServerResult<PathBuf>;
}
