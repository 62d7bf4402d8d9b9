//! Test harness lifecycle for an embedded nats-server
//!
//! [`EmbeddedNatsServer`] is what test setup code owns: it merges the raw
//! configuration with the environment at construction, starts the server
//! once, and stops it exactly once at teardown. Dropping it performs the
//! teardown if nobody did, so a guard held for the duration of a test is
//! enough to release the server.

use shared::OsType;
use std::time::Duration;

use crate::config::{resolve_config, EmbeddedConfig};
use crate::core::{NatsServer, ServerState};
use crate::error::{NatsServerError, NatsServerResult};
use crate::services::{EnvPropertySource, LocalBinaryResolver};
use crate::traits::{BinaryResolver, PropertySource};

pub struct EmbeddedNatsServer {
    /// `None` when no configuration was supplied: the server is disabled
    server: Option<NatsServer>,
    destroyed: bool,
}

impl EmbeddedNatsServer {
    /// Merge `config` with `env` and prepare (not start) the server
    ///
    /// The executable is looked up locally, honouring
    /// [`EmbeddedConfig::binary_path`].
    pub fn new(config: Option<EmbeddedConfig>, env: &dyn PropertySource) -> NatsServerResult<Self> {
        let resolver = LocalBinaryResolver::new()
            .with_explicit_path(config.as_ref().and_then(|c| c.binary_path.clone()));
        Self::with_resolver(config, env, Box::new(resolver), OsType::current())
    }

    /// Like [`EmbeddedNatsServer::new`] with an explicit resolver and platform
    pub fn with_resolver(
        config: Option<EmbeddedConfig>,
        env: &dyn PropertySource,
        resolver: Box<dyn BinaryResolver>,
        os: OsType,
    ) -> NatsServerResult<Self> {
        let Some(config) = config else {
            return Ok(Self::disabled());
        };

        let resolved = resolve_config(&config, env, os)?;
        tracing::debug!(config = %resolved.config.to_json(), "Resolved nats-server configuration");

        let server = NatsServer::with_boxed_resolver(resolved.config, resolver)
            .with_os(os)
            .with_source_url(resolved.source_url)
            .with_readiness(config.readiness)
            .with_startup_timeout(config.startup_timeout)
            .with_teardown_timeout(config.timeout);

        Ok(Self {
            server: Some(server),
            destroyed: false,
        })
    }

    /// Adapter with nothing to run
    pub fn disabled() -> Self {
        Self {
            server: None,
            destroyed: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.server.is_some()
    }

    pub fn server(&self) -> Option<&NatsServer> {
        self.server.as_ref()
    }

    /// Server state; `Created` when disabled
    pub fn state(&self) -> ServerState {
        self.server
            .as_ref()
            .map_or(ServerState::Created, NatsServer::state)
    }

    pub fn port(&self) -> Option<u16> {
        self.server.as_ref().and_then(NatsServer::port)
    }

    pub fn url(&self) -> Option<String> {
        self.server.as_ref().and_then(NatsServer::url)
    }

    pub fn is_running(&mut self) -> bool {
        self.server.as_mut().is_some_and(NatsServer::is_running)
    }

    /// Start the server and block until it is ready
    ///
    /// Skipped when disabled. Starting an already running server does
    /// nothing, starting after [`EmbeddedNatsServer::destroy`] is rejected.
    /// Any failure stops the server again and is returned as
    /// [`NatsServerError::StartupFailure`].
    pub fn start(&mut self) -> NatsServerResult<()> {
        let Some(server) = self.server.as_mut() else {
            tracing::debug!("Skipping embedded nats-server: no configuration supplied");
            return Ok(());
        };

        if self.destroyed {
            return Err(NatsServerError::InvalidState {
                operation: "start",
                state: server.state(),
            });
        }

        if server.state() == ServerState::Running {
            return Ok(());
        }

        if let Err(e) = server.start() {
            if let Err(stop_err) = server.stop(Duration::ZERO) {
                tracing::warn!("⚠️ Cleanup after failed start also failed: {}", stop_err);
            }
            return Err(NatsServerError::startup(e));
        }

        Ok(())
    }

    /// Stop the server with the teardown timeout
    ///
    /// Only the first call does anything; it is safe whether or not the
    /// server ever started.
    pub fn destroy(&mut self) -> NatsServerResult<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;

        match self.server.as_mut() {
            Some(server) => server.shutdown(),
            None => Ok(()),
        }
    }
}

impl Drop for EmbeddedNatsServer {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            tracing::error!("❌ Failed to stop embedded nats-server: {}", e);
        }
    }
}

/// Create an embedded server from `config` and the process environment
///
/// Loads `.env` before reading `<namespace>.*` properties. The server is
/// not started.
pub fn create_nats_server(config: EmbeddedConfig) -> NatsServerResult<EmbeddedNatsServer> {
    let env = EnvPropertySource::load();
    EmbeddedNatsServer::new(Some(config), &env)
}

/// Run `f` against a started server, always tearing it down afterwards
///
/// A teardown failure is reported only when `f` itself returned normally.
pub fn with_nats_server<T, F>(config: EmbeddedConfig, f: F) -> NatsServerResult<T>
where
    F: FnOnce(&NatsServer) -> T,
{
    let mut embedded = create_nats_server(config)?;
    embedded.start()?;

    let result = embedded.server().map(f);

    embedded.destroy()?;
    result.ok_or(NatsServerError::InvalidState {
        operation: "with_nats_server",
        state: ServerState::Created,
    })
}
