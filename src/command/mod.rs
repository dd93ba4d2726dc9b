//! Command execution for the agent
//!
//! This module handles:
//! - Classifying incoming commands by name
//! - Dispatching to the matching handler
//! - Returning a `Results` value for every command, supported or not

mod executor;
pub mod handlers;

pub use executor::{CommandExecutor, CommandKind, WASM_COMMAND};
