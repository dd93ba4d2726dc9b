//! Bytecode pipeline
//!
//! Fetches a WebAssembly module, builds a WASI sandbox for it, runs its
//! `_start` entry point and reports the outcome:
//!
//! ```text
//! fetch -> sandbox -> compile -> resolve imports -> instantiate -> _start -> report
//! ```
//!
//! Each stage returns a `Result`; the first error short-circuits the rest and
//! is carried to the reporter, which is reached on every path.

mod error;
mod executor;
mod fetch;
mod report;
mod runtime;
mod sandbox;

pub use error::PipelineError;
pub use executor::{execute, run_module, Execution, ENTRY_POINT};
pub use fetch::{BytecodeSource, HttpFetcher};
pub use report::report;
pub use runtime::{EpochTicker, StoreState, WasmRuntime};
pub use sandbox::{argument_string, CaptureHandles, CapturedOutput, Sandbox};

use crate::config::SandboxConfig;
use std::sync::Arc;
use tracing::debug;

/// The fetch/compile/run chain for `wasm` commands
pub struct Pipeline {
    runtime: Arc<WasmRuntime>,
    source: Arc<dyn BytecodeSource>,
    sandbox: SandboxConfig,
}

impl Pipeline {
    /// Create a pipeline over a shared runtime and bytecode source
    pub fn new(
        runtime: Arc<WasmRuntime>,
        source: Arc<dyn BytecodeSource>,
        sandbox: SandboxConfig,
    ) -> Self {
        Self {
            runtime,
            source,
            sandbox,
        }
    }

    /// Run the command arguments through every stage.
    ///
    /// `args[1]` is the bytecode URL; see [`argument_string`] for how the
    /// program's arguments are derived.
    pub async fn run(&self, args: &[String]) -> Result<Execution, PipelineError> {
        let url = args.get(1).ok_or(PipelineError::MissingUrl)?;

        debug!("Fetching bytecode via {} from {}", self.source.name(), url);
        let bytecode = self.source.fetch(url).await?;

        let sandbox = Sandbox::build(&self.sandbox, &argument_string(args))?;
        debug!("Sandbox argv: {:?}", sandbox.argv());

        execute(self.runtime.clone(), bytecode, sandbox).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutionConfig, FetchConfig};
    use crate::test_support::*;

    fn pipeline() -> Pipeline {
        let runtime = Arc::new(WasmRuntime::new(ExecutionConfig::default()).expect("runtime"));
        let fetcher = Arc::new(HttpFetcher::new(&FetchConfig::default()).expect("client"));
        Pipeline::new(runtime, fetcher, SandboxConfig::default())
    }

    fn args(url: &str) -> Vec<String> {
        vec!["wasm".into(), url.into(), "end".into()]
    }

    #[tokio::test]
    async fn test_pipeline_runs_hello() {
        let server = HttpFixture::serve(200, wasm(HELLO_WAT)).await;
        let execution = pipeline()
            .run(&args(&server.url("/hello.wasm")))
            .await
            .expect("pipeline");
        assert_eq!(execution.captured.stdout, "hello");
        assert_eq!(execution.status, Ok(()));
    }

    #[tokio::test]
    async fn test_missing_url() {
        let err = pipeline()
            .run(&["wasm".to_string()])
            .await
            .expect_err("should fail");
        assert_eq!(err, PipelineError::MissingUrl);
    }

    #[tokio::test]
    async fn test_unreachable_url_stops_before_compile() {
        let err = pipeline()
            .run(&args(&unreachable_url().await))
            .await
            .expect_err("should fail");
        assert_eq!(err.stage(), "fetch");
    }
}
