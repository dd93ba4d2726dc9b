use agent_jobs::{codec, codec::FrameDecoder, Command, Job, JobResult, Results};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wasm_agent::config::AgentConfig;
use wasm_agent::messages::{self, Messenger};
use wasm_agent::platform::default_pipe_capability;
use wasm_agent::wasm::{HttpFetcher, Pipeline, WasmRuntime};
use wasm_agent::CommandExecutor;

use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "wasm-agent", version, about = "Runs agent commands, including WebAssembly payloads")]
struct Cli {
    /// Wall-clock limit for a module run, in milliseconds
    #[arg(long, global = true)]
    exec_timeout_ms: Option<u64>,

    /// Overall limit for a bytecode download, in milliseconds
    #[arg(long, global = true)]
    fetch_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one command, e.g. `run wasm http://host/app.wasm arg1 end`
    Run {
        /// Command name
        name: String,
        /// Command arguments (the name is prepended as args[0])
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Read length-prefixed Job frames from stdin, write JobResult frames to stdout
    Jobs,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr; stdout carries command output and result frames
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    let mut config = AgentConfig::from_env()?;
    if let Some(ms) = cli.exec_timeout_ms {
        config.execution.timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.fetch_timeout_ms {
        config.fetch.request_timeout = Duration::from_millis(ms);
    }

    let runtime = Arc::new(WasmRuntime::new(config.execution.clone()).context("creating wasm runtime")?);
    let _ticker = runtime.start_epoch_ticker();
    info!("Wasm runtime initialized");

    let fetcher = Arc::new(HttpFetcher::new(&config.fetch).context("creating HTTP client")?);
    let pipeline = Arc::new(Pipeline::new(runtime.clone(), fetcher, config.sandbox.clone()));

    let (messenger, message_rx) = Messenger::channel();
    let drain = tokio::spawn(messages::drain_to_tracing(message_rx));

    let executor = CommandExecutor::new(pipeline, default_pipe_capability(), messenger);

    let exit = match cli.command {
        Commands::Run { name, args } => run_once(&executor, name, args).await,
        Commands::Jobs => run_jobs(&executor).await.map(|_| ExitCode::SUCCESS),
    };

    // Dropping the executor closes the message channel so the drain finishes
    drop(executor);
    let _ = drain.await;

    exit
}

async fn run_once(executor: &CommandExecutor, name: String, args: Vec<String>) -> Result<ExitCode> {
    let command = Command::new(name.clone(), std::iter::once(name).chain(args));
    let results = executor.execute(&command).await;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(results.stdout.as_bytes()).await?;
    stdout.flush().await?;

    if results.is_error() {
        let mut stderr = tokio::io::stderr();
        stderr.write_all(results.stderr.as_bytes()).await?;
        stderr.write_all(b"\n").await?;
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

/// Serve framed jobs from stdin until EOF
async fn run_jobs(executor: &CommandExecutor) -> Result<()> {
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut decoder = FrameDecoder::<Job>::new();
    let mut buf = vec![0u8; 4096];

    info!("Waiting for jobs on stdin");

    loop {
        let n = stdin.read(&mut buf).await?;
        if n == 0 {
            if decoder.buffer_len() > 0 {
                error!("stdin closed with {} bytes of partial frame", decoder.buffer_len());
            }
            info!("Job stream closed");
            return Ok(());
        }
        decoder.extend(&buf[..n]);

        // Process all complete frames
        while let Some(job) = decoder.decode_next().context("decoding job frame")? {
            debug!("Received job {}", job.id);

            let results = match &job.command {
                Some(command) => executor.execute(command).await,
                None => Results::failure("job carries no command"),
            };

            let frame = codec::encode(&JobResult::new(job.id, results))?;
            stdout.write_all(&frame).await?;
            stdout.flush().await?;
        }
    }
}
