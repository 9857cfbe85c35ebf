//! Headless host surface: newline-delimited JSON over stdin/stdout.

pub mod contract;
pub mod handler;
pub mod stdio;

pub use contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
pub use handler::{EventForwarder, handle_command};
pub use stdio::{run_bridge, run_stdio_bridge};
