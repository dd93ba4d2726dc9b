//! Platform capabilities
//!
//! Commands that only make sense on some operating systems are expressed as
//! a capability trait with one implementation per platform. The choice is
//! made once, here, so the dispatcher never sees a `cfg`.

use agent_jobs::Results;
use std::sync::Arc;

/// Name of the named-pipe listing command
pub const PIPES_COMMAND: &str = "pipes";

/// Lists the named pipes visible to the agent
pub trait PipeCapability: Send + Sync {
    fn list_pipes(&self) -> Results;
}

/// Platforms without named pipes
#[derive(Debug, Default)]
pub struct UnsupportedPipes;

impl PipeCapability for UnsupportedPipes {
    fn list_pipes(&self) -> Results {
        Results::unsupported(PIPES_COMMAND)
    }
}

/// Windows named pipes under `\\.\pipe\`
#[cfg(windows)]
#[derive(Debug, Default)]
pub struct WindowsPipes;

#[cfg(windows)]
impl PipeCapability for WindowsPipes {
    fn list_pipes(&self) -> Results {
        const PIPE_ROOT: &str = r"\\.\pipe\";

        let entries = match std::fs::read_dir(PIPE_ROOT) {
            Ok(entries) => entries,
            Err(e) => return Results::failure(format!("failed to list named pipes: {}", e)),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| format!("{}{}", PIPE_ROOT, entry.file_name().to_string_lossy()))
            .collect();
        names.sort();

        Results {
            stdout: format!("Named pipes:\n{}\n", names.join("\n")),
            stderr: String::new(),
        }
    }
}

/// The pipe capability for the platform this agent was built for
pub fn default_pipe_capability() -> Arc<dyn PipeCapability> {
    #[cfg(windows)]
    {
        Arc::new(WindowsPipes)
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnsupportedPipes)
    }
}
