//! Agent Job Protocol Types
//!
//! This crate provides the job types exchanged between the agent's
//! command-execution subsystem and the job-reporting layer, plus the
//! length-prefixed codec used to frame them.

pub mod codec;
pub mod proto;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-export commonly used types at crate root
pub use proto::*;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Resource limits for job handling
pub mod limits {
    /// Maximum size of a single codec frame
    pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

    /// Maximum size of a downloaded bytecode payload
    pub const MAX_BYTECODE_SIZE: usize = 64 * 1024 * 1024;

    /// Default connect timeout for bytecode downloads
    pub const FETCH_CONNECT_TIMEOUT_MS: u64 = 10_000;

    /// Default overall deadline for a bytecode download
    pub const FETCH_TIMEOUT_MS: u64 = 60_000;

    /// Default wall-clock deadline for running a module
    pub const EXECUTION_TIMEOUT_MS: u64 = 30_000;

    /// Default linear memory ceiling for a module instance
    pub const MAX_MEMORY_BYTES: usize = 256 * 1024 * 1024;

    /// Default capacity of each captured output stream
    pub const CAPTURE_CAPACITY_BYTES: usize = 4 * 1024 * 1024;
}

/// Fixed response text for commands this agent cannot run
pub fn unsupported_message(command: &str) -> String {
    format!("the {} command is not supported by this agent type", command)
}

impl Command {
    /// Create a new command
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Results {
    /// Results carrying only a failure message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
        }
    }

    /// Results for a command this agent cannot run
    pub fn unsupported(command: &str) -> Self {
        Self::failure(unsupported_message(command))
    }

    /// True if the results carry any error text
    pub fn is_error(&self) -> bool {
        !self.stderr.is_empty()
    }
}

impl JobResult {
    /// Wrap results for the job they answer
    pub fn new(id: impl Into<String>, results: Results) -> Self {
        Self {
            id: id.into(),
            results: Some(results),
            completed_at_ms: now_ms(),
        }
    }
}
