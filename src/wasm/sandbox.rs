//! Sandbox builder - WASI environment for a single module invocation
//!
//! The sandbox exposes exactly two things to a module: its argument vector
//! and a pair of in-memory pipes standing in for stdout and stderr. There are
//! no environment variables, no preopened directories and stdin is empty.

use super::error::PipelineError;
use crate::config::SandboxConfig;
use wasmtime_wasi::preview1::WasiP1Ctx;
use wasmtime_wasi::p2::pipe::MemoryOutputPipe;
use wasmtime_wasi::WasiCtxBuilder;

/// Join the program arguments of a `wasm` command.
///
/// Takes `args[1 .. len-1]`: the URL at index 1 is passed through as the first
/// program argument and the final element is always dropped. Commands with
/// fewer than two arguments yield an empty string.
pub fn argument_string(args: &[String]) -> String {
    if args.len() < 2 {
        return String::new();
    }
    args[1..args.len() - 1].join(" ")
}

/// Output captured from a module's standard streams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// Set to the pipe capacity when stdout filled up; later writes were lost
    pub stdout_truncated_at: Option<usize>,
    /// Set to the pipe capacity when stderr filled up; later writes were lost
    pub stderr_truncated_at: Option<usize>,
}

impl CapturedOutput {
    /// One line per stream that hit its capture limit
    pub fn truncation_notices(&self) -> Vec<String> {
        [
            ("stdout", self.stdout_truncated_at),
            ("stderr", self.stderr_truncated_at),
        ]
        .into_iter()
        .filter_map(|(stream, at)| {
            at.map(|n| format!("{} truncated at {} bytes (capture buffer full)", stream, n))
        })
        .collect()
    }
}

/// Read side of the sandbox's capture pipes
#[derive(Clone)]
pub struct CaptureHandles {
    stdout: MemoryOutputPipe,
    stderr: MemoryOutputPipe,
    stdout_capacity: usize,
    stderr_capacity: usize,
}

impl CaptureHandles {
    /// Copy everything written so far out of both pipes.
    ///
    /// A pipe holding exactly its capacity is reported as truncated: the WASI
    /// adapter turns writes past the limit into short writes, which most
    /// guests ignore.
    pub fn drain(&self) -> CapturedOutput {
        let (stdout, stdout_truncated_at) = read_pipe(&self.stdout, self.stdout_capacity);
        let (stderr, stderr_truncated_at) = read_pipe(&self.stderr, self.stderr_capacity);
        CapturedOutput {
            stdout,
            stderr,
            stdout_truncated_at,
            stderr_truncated_at,
        }
    }
}

fn read_pipe(pipe: &MemoryOutputPipe, capacity: usize) -> (String, Option<usize>) {
    let contents = pipe.contents();
    let truncated = (contents.len() >= capacity).then_some(capacity);
    (String::from_utf8_lossy(&contents).into_owned(), truncated)
}

/// A finalized, single-use WASI environment
pub struct Sandbox {
    wasi: WasiP1Ctx,
    capture: CaptureHandles,
    argv: Vec<String>,
}

impl Sandbox {
    /// Build a sandbox whose argv is `[program_name, argument]`
    pub fn build(config: &SandboxConfig, argument: &str) -> Result<Self, PipelineError> {
        validate(config, argument)?;

        let stdout = MemoryOutputPipe::new(config.stdout_capacity);
        let stderr = MemoryOutputPipe::new(config.stderr_capacity);
        let argv = vec![config.program_name.clone(), argument.to_string()];

        let mut builder = WasiCtxBuilder::new();
        builder
            .args(argv.as_slice())
            .stdout(stdout.clone())
            .stderr(stderr.clone());

        Ok(Self {
            wasi: builder.build_p1(),
            capture: CaptureHandles {
                stdout,
                stderr,
                stdout_capacity: config.stdout_capacity,
                stderr_capacity: config.stderr_capacity,
            },
            argv,
        })
    }

    /// Argument vector the module will see
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Split into the WASI context (moved into a store) and the capture handles
    pub fn into_parts(self) -> (WasiP1Ctx, CaptureHandles) {
        (self.wasi, self.capture)
    }
}

fn validate(config: &SandboxConfig, argument: &str) -> Result<(), PipelineError> {
    if config.program_name.is_empty() {
        return Err(PipelineError::SandboxInit(
            "program name must not be empty".into(),
        ));
    }
    if config.program_name.contains('\0') {
        return Err(PipelineError::SandboxInit(
            "program name contains a NUL byte".into(),
        ));
    }
    if argument.contains('\0') {
        return Err(PipelineError::SandboxInit(
            "program argument contains a NUL byte".into(),
        ));
    }
    if config.stdout_capacity == 0 || config.stderr_capacity == 0 {
        return Err(PipelineError::SandboxInit(
            "output capture capacity must be non-zero".into(),
        ));
    }
    Ok(())
}
