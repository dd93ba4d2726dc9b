//! Pipeline error taxonomy
//!
//! Every stage of the fetch/compile/run pipeline fails with its own variant
//! so an operator can tell network, format, environment and runtime faults
//! apart from the `stderr` text alone.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the bytecode pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no bytecode URL supplied (expected: wasm <url> [args...])")]
    MissingUrl,

    #[error("failed to download bytecode from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to read bytecode response body from {url}: {reason}")]
    Read { url: String, reason: String },

    #[error("failed to initialize WASI sandbox: {0}")]
    SandboxInit(String),

    #[error("failed to compile module: {0}")]
    Compile(String),

    #[error("failed to resolve module imports: {0}")]
    ImportResolution(String),

    #[error("failed to instantiate module: {0}")]
    Instantiation(String),

    #[error("failed to find the WASI start function `_start`: {0}")]
    EntryPointNotFound(String),

    #[error("failed to execute the WASI start function: {0}")]
    Execution(String),

    #[error("module exited with non-zero status {0}")]
    ExitStatus(i32),

    #[error("module execution exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("the {0} command is not supported by this agent type")]
    UnsupportedCommand(String),
}

impl PipelineError {
    /// Short name of the stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::MissingUrl | PipelineError::Fetch { .. } => "fetch",
            PipelineError::Read { .. } => "read",
            PipelineError::SandboxInit(_) => "sandbox",
            PipelineError::Compile(_) => "compile",
            PipelineError::ImportResolution(_) => "link",
            PipelineError::Instantiation(_) => "instantiate",
            PipelineError::EntryPointNotFound(_) => "entry-point",
            PipelineError::Execution(_)
            | PipelineError::ExitStatus(_)
            | PipelineError::DeadlineExceeded(_) => "execute",
            PipelineError::UnsupportedCommand(_) => "dispatch",
        }
    }

    /// True for failures raised while `_start` was running
    pub fn is_execution(&self) -> bool {
        self.stage() == "execute"
    }
}
