//! Process supervision
//!
//! Launch command construction, readiness detection and the supervised
//! server handle with its state machine.

pub mod command;
pub mod readiness;
pub mod state;
pub mod supervisor;

pub use command::{build_args, ServerCommand};
pub use readiness::{Readiness, READY_MARKER};
pub use state::ServerState;
pub use supervisor::NatsServer;
