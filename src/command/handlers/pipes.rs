//! Named-pipe listing command handler

use super::HandlerContext;
use agent_jobs::{Command, Results};

/// Handle the `pipes` command via the platform capability
pub fn handle_pipes(ctx: &HandlerContext, _command: &Command) -> Results {
    ctx.messenger.debug("entering handle_pipes()...");
    ctx.pipes.list_pipes()
}
