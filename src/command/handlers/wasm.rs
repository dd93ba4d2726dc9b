//! Bytecode execution command handler

use super::HandlerContext;
use crate::wasm::report;
use agent_jobs::{Command, Results};

/// Handle the `wasm` command: fetch, run and report a module
///
/// Expects `args = [_, url, program args..., trailing]`.
pub async fn handle_wasm(ctx: &HandlerContext, command: &Command) -> Results {
    ctx.messenger.debug(format!(
        "Received input parameter for handle_wasm: {:?}",
        command
    ));
    ctx.messenger.success(format!(
        "Executing command: {} {:?}",
        command.name, command.args
    ));

    let outcome = ctx.pipeline.run(&command.args).await;
    report(command, outcome, &ctx.messenger)
}
