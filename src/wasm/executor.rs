//! Module executor - compile, link, instantiate and run a module
//!
//! The steps run strictly in order and the first failure ends the run.
//! Once an instance exists the captured streams are always drained, so
//! output written before a fault is returned together with the fault.

use super::error::PipelineError;
use super::runtime::{StoreState, WasmRuntime};
use super::sandbox::{CapturedOutput, Sandbox};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};
use wasmtime::{InstancePre, Module, Store, StoreLimitsBuilder, Trap, TypedFunc};
use wasmtime_wasi::preview1::WasiP1Ctx;
use wasmtime_wasi::I32Exit;

/// Name of the WASI command entry point
pub const ENTRY_POINT: &str = "_start";

/// Outcome of a run that got as far as instantiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Everything the module wrote to stdout/stderr
    pub captured: CapturedOutput,
    /// Terminal status of entry-point resolution and the call itself
    pub status: Result<(), PipelineError>,
}

/// Run `bytecode` inside `sandbox` on a blocking worker thread
pub async fn execute(
    runtime: Arc<WasmRuntime>,
    bytecode: Bytes,
    sandbox: Sandbox,
) -> Result<Execution, PipelineError> {
    tokio::task::spawn_blocking(move || run_module(&runtime, &bytecode, sandbox))
        .await
        .map_err(|e| PipelineError::Execution(format!("module worker failed: {}", e)))?
}

/// Run `bytecode` inside `sandbox` on the current thread
pub fn run_module(
    runtime: &WasmRuntime,
    bytecode: &[u8],
    sandbox: Sandbox,
) -> Result<Execution, PipelineError> {
    let module = compile(runtime, bytecode)?;
    let pre = resolve_imports(runtime, &module)?;

    let (wasi, capture) = sandbox.into_parts();
    let mut store = new_store(runtime, wasi);

    let instance = pre
        .instantiate(&mut store)
        .map_err(|e| PipelineError::Instantiation(format!("{:#}", e)))?;
    debug!("Module instantiated");

    let status = instance
        .get_typed_func::<(), ()>(&mut store, ENTRY_POINT)
        .map_err(|e| PipelineError::EntryPointNotFound(format!("{:#}", e)))
        .and_then(|start| call_entry_point(runtime, &mut store, start));

    match &status {
        Err(e) if e.is_execution() => warn!("Module faulted while running: {}", e),
        Err(e) => warn!("Module could not be started ({} failure): {}", e.stage(), e),
        Ok(()) => debug!("Module finished"),
    }

    // Drop the store first so no guest state outlives the run
    drop(store);

    Ok(Execution {
        captured: capture.drain(),
        status,
    })
}

fn compile(runtime: &WasmRuntime, bytecode: &[u8]) -> Result<Module, PipelineError> {
    let module = Module::from_binary(runtime.engine(), bytecode)
        .map_err(|e| PipelineError::Compile(format!("{:#}", e)))?;
    debug!("Compiled module ({} bytes)", bytecode.len());
    Ok(module)
}

fn resolve_imports(
    runtime: &WasmRuntime,
    module: &Module,
) -> Result<InstancePre<StoreState>, PipelineError> {
    runtime
        .linker()
        .instantiate_pre(module)
        .map_err(|e| PipelineError::ImportResolution(format!("{:#}", e)))
}

fn new_store(runtime: &WasmRuntime, wasi: WasiP1Ctx) -> Store<StoreState> {
    let config = runtime.config();
    let limits = StoreLimitsBuilder::new()
        .memory_size(config.max_memory_bytes)
        .build();

    let mut store = Store::new(runtime.engine(), StoreState { wasi, limits });
    store.limiter(|state| &mut state.limits);
    // Covers the start section too, so it is set before instantiation
    store.set_epoch_deadline(config.deadline_ticks());
    store
}

fn call_entry_point(
    runtime: &WasmRuntime,
    store: &mut Store<StoreState>,
    start: TypedFunc<(), ()>,
) -> Result<(), PipelineError> {
    match start.call(&mut *store, ()) {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(exit) = e.downcast_ref::<I32Exit>() {
                return match exit.0 {
                    0 => Ok(()),
                    code => Err(PipelineError::ExitStatus(code)),
                };
            }
            if let Some(Trap::Interrupt) = e.downcast_ref::<Trap>() {
                return Err(PipelineError::DeadlineExceeded(runtime.config().timeout));
            }
            Err(PipelineError::Execution(format!("{:#}", e)))
        }
    }
}
