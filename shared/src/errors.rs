//! Shared error types for the embedded NATS server harness

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Unsupported operating system: {name}")]
    UnsupportedOs { name: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
