//! Command handlers for the commands this agent supports

mod pipes;
mod wasm;

pub use pipes::handle_pipes;
pub use wasm::handle_wasm;

use crate::messages::Messenger;
use crate::platform::PipeCapability;
use crate::wasm::Pipeline;
use std::sync::Arc;

/// Context passed to command handlers
#[derive(Clone)]
pub struct HandlerContext {
    pub pipeline: Arc<Pipeline>,
    pub pipes: Arc<dyn PipeCapability>,
    pub messenger: Messenger,
}
