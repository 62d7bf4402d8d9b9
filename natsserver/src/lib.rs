//! Embedded nats-server for test harnesses
//!
//! Resolves a nats-server executable, merges configuration from the caller
//! and the environment, launches the server, waits until it accepts clients
//! and guarantees it is stopped again.
//!
//! ```no_run
//! use natsserver::{create_nats_server, EmbeddedConfig};
//!
//! let config = EmbeddedConfig::builder()
//!     .entries(["user:admin", "password:admin"])
//!     .port(-1)
//!     .timeout_ms(5000)
//!     .build();
//!
//! let mut nats = create_nats_server(config)?;
//! nats.start()?;
//! println!("connect to {}", nats.url().unwrap_or_default());
//! nats.destroy()?;
//! # Ok::<(), natsserver::NatsServerError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod lifecycle;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use crate::config::{ConfigMap, ConfigOption, EmbeddedConfig, EmbeddedConfigBuilder};
pub use crate::core::{NatsServer, Readiness, ServerState};
pub use error::{NatsServerError, NatsServerResult};
pub use lifecycle::{create_nats_server, with_nats_server, EmbeddedNatsServer};
pub use services::{EnvPropertySource, LocalBinaryResolver, MapPropertySource};
pub use traits::{BinaryResolver, MockBinaryResolver, MockPropertySource, PropertySource};
