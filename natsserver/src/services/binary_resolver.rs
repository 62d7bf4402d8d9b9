//! Local nats-server executable lookup
//!
//! Searches, in order: an explicitly configured path, the install directory
//! an installer unpacks releases into, and every directory on `PATH`.
//! Downloading from the source url is the installer's job; this resolver
//! only finds what is already on disk.

use shared::OsType;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{NatsServerError, NatsServerResult};
use crate::traits::BinaryResolver;

/// Executable name nats-server ships under
pub const EXECUTABLE_NAME: &str = "nats-server";

pub struct LocalBinaryResolver {
    explicit: Option<PathBuf>,
    install_dir: PathBuf,
    search_path: bool,
}

impl LocalBinaryResolver {
    pub fn new() -> Self {
        Self {
            explicit: None,
            install_dir: default_install_dir(),
            search_path: true,
        }
    }

    /// Use this executable before anything else (fluent API)
    pub fn with_explicit_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    /// Configure install directory (fluent API)
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = dir.into();
        self
    }

    /// Enable or disable the `PATH` search (fluent API)
    pub fn with_path_search(mut self, enabled: bool) -> Self {
        self.search_path = enabled;
        self
    }

    /// Where an installer puts the executable for `os`
    pub fn installed_path(&self, os: OsType) -> PathBuf {
        self.install_dir
            .join(format!("{EXECUTABLE_NAME}_{os}{}", os.executable_suffix()))
    }

    fn candidates(&self, os: OsType) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(explicit) = &self.explicit {
            candidates.push(explicit.clone());
        }
        candidates.push(self.installed_path(os));

        if self.search_path {
            if let Some(path) = std::env::var_os("PATH") {
                let name = format!("{EXECUTABLE_NAME}{}", os.executable_suffix());
                candidates.extend(std::env::split_paths(&path).map(|dir| dir.join(&name)));
            }
        }
        candidates
    }
}

impl Default for LocalBinaryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryResolver for LocalBinaryResolver {
    fn resolve(&self, os: OsType, source_url: Option<Url>) -> NatsServerResult<PathBuf> {
        let os = os.ensure_supported()?;

        let candidates = self.candidates(os);
        if let Some(found) = candidates.iter().find(|candidate| is_executable(candidate)) {
            tracing::debug!(path = %found.display(), "Resolved nats-server executable");
            return Ok(found.clone());
        }

        if let Some(url) = source_url {
            tracing::debug!(
                source = %url,
                install_path = %self.installed_path(os).display(),
                "nats-server not installed; an installer can fetch it from the source url"
            );
        }

        Err(NatsServerError::ExecutableNotFound {
            os,
            searched: candidates,
        })
    }
}

/// Default install directory: `<temp>/nats`
pub fn default_install_dir() -> PathBuf {
    std::env::temp_dir().join("nats")
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
