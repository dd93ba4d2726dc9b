//! Agent configuration
//!
//! Every section has a `Default` tuned for a single agent process. Values
//! can be overridden from `AGENT_*` environment variables and, in the binary,
//! from command-line flags.

use agent_jobs::limits;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Bytecode download settings
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Deadline for the whole request, body included
    pub request_timeout: Duration,
    /// Largest accepted bytecode payload
    pub max_bytecode_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(limits::FETCH_CONNECT_TIMEOUT_MS),
            request_timeout: Duration::from_millis(limits::FETCH_TIMEOUT_MS),
            max_bytecode_size: limits::MAX_BYTECODE_SIZE,
        }
    }
}

/// WASI sandbox settings
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// argv[0] seen by the module
    pub program_name: String,
    /// Capacity of the captured stdout buffer
    pub stdout_capacity: usize,
    /// Capacity of the captured stderr buffer
    pub stderr_capacity: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            program_name: "wasi-program".into(),
            stdout_capacity: limits::CAPTURE_CAPACITY_BYTES,
            stderr_capacity: limits::CAPTURE_CAPACITY_BYTES,
        }
    }
}

/// Module execution bounds
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Wall-clock deadline for instantiation plus `_start`
    pub timeout: Duration,
    /// Interval between engine epoch increments
    pub epoch_tick: Duration,
    /// Linear memory ceiling per instance
    pub max_memory_bytes: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(limits::EXECUTION_TIMEOUT_MS),
            epoch_tick: Duration::from_millis(10),
            max_memory_bytes: limits::MAX_MEMORY_BYTES,
        }
    }
}

impl ExecutionConfig {
    /// Deadline expressed in epoch ticks, rounded up and never zero
    pub fn deadline_ticks(&self) -> u64 {
        let tick = self.epoch_tick.as_millis().max(1);
        let ticks = self.timeout.as_millis().div_ceil(tick);
        ticks.max(1) as u64
    }
}

/// Top-level agent configuration
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    pub fetch: FetchConfig,
    pub sandbox: SandboxConfig,
    pub execution: ExecutionConfig,
}

impl AgentConfig {
    /// Build a configuration from defaults and `AGENT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration using `lookup` to resolve variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64, _>(&lookup, "AGENT_FETCH_CONNECT_TIMEOUT_MS")? {
            config.fetch.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "AGENT_FETCH_TIMEOUT_MS")? {
            config.fetch.request_timeout = Duration::from_millis(ms);
        }
        if let Some(bytes) = parse_var(&lookup, "AGENT_MAX_BYTECODE_BYTES")? {
            config.fetch.max_bytecode_size = bytes;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "AGENT_EXEC_TIMEOUT_MS")? {
            config.execution.timeout = Duration::from_millis(ms);
        }
        if let Some(bytes) = parse_var(&lookup, "AGENT_MAX_MEMORY_BYTES")? {
            config.execution.max_memory_bytes = bytes;
        }
        if let Some(name) = lookup("AGENT_PROGRAM_NAME") {
            config.sandbox.program_name = name;
        }

        debug!("Loaded agent config: {:?}", config);
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
