//! Embedded server error types

use shared::{OsType, SharedError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::ServerState;

#[derive(Error, Debug)]
pub enum NatsServerError {
    #[error("Unknown configuration option: {name}")]
    UnknownOption { name: String },

    #[error("Invalid configuration entry '{entry}': {reason}")]
    InvalidConfigEntry { entry: String, reason: String },

    #[error("Invalid source url '{url}': {source}")]
    InvalidSourceUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("No nats-server executable found for {os} (searched: {searched:?})")]
    ExecutableNotFound { os: OsType, searched: Vec<PathBuf> },

    #[error("Failed to spawn {}: {source}", path.display())]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("nats-server not ready on port {port} after {timeout:?}")]
    StartupTimeout { port: u16, timeout: Duration },

    #[error("nats-server exited before becoming ready ({status}): {output}")]
    ProcessExitedEarly { status: String, output: String },

    #[error("nats-server (PID: {pid}) could not be stopped: {reason}")]
    StopFailed { pid: u32, reason: String },

    #[error("Operation '{operation}' not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ServerState,
    },

    #[error("Failed to start embedded nats-server: {source}")]
    StartupFailure {
        #[source]
        source: Box<NatsServerError>,
    },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NatsServerError {
    /// Wrap a startup cause into the single error type callers see
    pub fn startup(cause: NatsServerError) -> Self {
        match cause {
            already @ NatsServerError::StartupFailure { .. } => already,
            other => NatsServerError::StartupFailure {
                source: Box::new(other),
            },
        }
    }

    /// Underlying cause of a [`NatsServerError::StartupFailure`], or `self`
    pub fn root_cause(&self) -> &NatsServerError {
        match self {
            NatsServerError::StartupFailure { source } => source.root_cause(),
            other => other,
        }
    }
}

pub type NatsServerResult<T> = Result<T, NatsServerError>;
