//! Process-wide Wasm runtime
//!
//! One `WasmRuntime` is built at startup and shared by `Arc` across every
//! invocation. It holds the engine and a linker with WASI preview 1
//! registered; neither is mutated after construction. Stores, modules and
//! instances are always per invocation.

use crate::config::ExecutionConfig;
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;
use wasmtime::{Config, Engine, Linker, StoreLimits};
use wasmtime_wasi::preview1::WasiP1Ctx;

/// Per-invocation data owned by a `Store`
pub struct StoreState {
    pub wasi: WasiP1Ctx,
    pub limits: StoreLimits,
}

fn wasi_ctx(state: &mut StoreState) -> &mut WasiP1Ctx {
    &mut state.wasi
}

/// Shared compilation engine and WASI linker
pub struct WasmRuntime {
    engine: Engine,
    linker: Linker<StoreState>,
    config: ExecutionConfig,
}

impl WasmRuntime {
    /// Create the engine (epoch interruption enabled) and register WASI imports
    pub fn new(config: ExecutionConfig) -> Result<Self> {
        let mut cfg = Config::new();
        cfg.epoch_interruption(true);
        let engine = Engine::new(&cfg)?;

        let mut linker = Linker::new(&engine);
        wasmtime_wasi::preview1::add_to_linker_sync(&mut linker, wasi_ctx)?;

        debug!(
            "Wasm runtime ready (deadline {:?}, memory limit {} bytes)",
            config.timeout, config.max_memory_bytes
        );

        Ok(Self {
            engine,
            linker,
            config,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn linker(&self) -> &Linker<StoreState> {
        &self.linker
    }

    /// Execution bounds applied to every store
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Start the background task that advances the engine epoch.
    ///
    /// Store deadlines are counted in ticks of this task; without it running
    /// modules are never interrupted. Must be called inside a tokio runtime.
    pub fn start_epoch_ticker(self: &Arc<Self>) -> EpochTicker {
        let runtime = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval(runtime.config.epoch_tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                runtime.engine.increment_epoch();
            }
        });

        EpochTicker { task }
    }
}

/// Handle to the epoch ticker; the ticker stops when this is dropped
pub struct EpochTicker {
    task: JoinHandle<()>,
}

impl Drop for EpochTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
