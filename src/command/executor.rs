//! Command executor - selects a handler by command name and returns its results

use super::handlers::{self, HandlerContext};
use crate::messages::Messenger;
use crate::platform::{PipeCapability, PIPES_COMMAND};
use crate::wasm::{Pipeline, PipelineError};
use agent_jobs::{Command, Results};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the execute-bytecode command
pub const WASM_COMMAND: &str = "wasm";

/// Commands known to this agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Wasm,
    Pipes,
    Unknown,
}

impl CommandKind {
    /// Classify a command by name
    pub fn from_name(name: &str) -> Self {
        match name {
            WASM_COMMAND => CommandKind::Wasm,
            PIPES_COMMAND => CommandKind::Pipes,
            _ => CommandKind::Unknown,
        }
    }
}

/// Executes commands received from the job system
pub struct CommandExecutor {
    ctx: HandlerContext,
    executed: AtomicU64,
}

impl CommandExecutor {
    /// Create a new command executor
    pub fn new(
        pipeline: Arc<Pipeline>,
        pipes: Arc<dyn PipeCapability>,
        messenger: Messenger,
    ) -> Self {
        Self {
            ctx: HandlerContext {
                pipeline,
                pipes,
                messenger,
            },
            executed: AtomicU64::new(0),
        }
    }

    /// Number of commands executed so far
    pub fn executed_count(&self) -> u64 {
        self.executed.load(Ordering::SeqCst)
    }

    /// Execute a command and return its results. Never fails.
    pub async fn execute(&self, command: &Command) -> Results {
        let kind = CommandKind::from_name(&command.name);
        let seq = self.executed.fetch_add(1, Ordering::SeqCst) + 1;

        debug!("Executing command: seq={} name={} kind={:?}", seq, command.name, kind);

        let results = match kind {
            CommandKind::Wasm => handlers::handle_wasm(&self.ctx, command).await,
            CommandKind::Pipes => handlers::handle_pipes(&self.ctx, command),
            CommandKind::Unknown => {
                self.ctx
                    .messenger
                    .warn(format!("Unknown command: {}", command.name));
                Results::failure(
                    PipelineError::UnsupportedCommand(command.name.clone()).to_string(),
                )
            }
        };

        if results.is_error() {
            warn!("  Command {} failed: {}", command.name, results.stderr);
        } else {
            info!(
                "  Command {} completed ({} bytes of output)",
                command.name,
                results.stdout.len()
            );
        }

        results
    }
}
