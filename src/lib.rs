//! wasm-agent
//!
//! Command-execution subsystem of an agent. Commands arrive as
//! [`agent_jobs::Command`] values and always produce an
//! [`agent_jobs::Results`]. The `wasm` command downloads a WebAssembly module
//! and runs it in a WASI sandbox with captured output; see [`wasm`].

pub mod command;
pub mod config;
pub mod messages;
pub mod platform;
pub mod wasm;

#[cfg(test)]
mod test_support;

pub use command::{CommandExecutor, CommandKind};
pub use config::AgentConfig;
pub use messages::{Message, MessageLevel, Messenger};
