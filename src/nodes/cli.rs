//! `CLI` node executor (spec.md §4.F.1): runs a shell command through the
//! persistent shell, gated by the security deny-list and an optional
//! approval step.

use tokio_util::sync::CancellationToken;

use crate::collaborators::Collaborators;
use crate::config::DISALLOWED_COMMAND_HEADS;
use crate::context::{ExecutionContext, NodeOutput};
use crate::error::{Error, Result};
use crate::model::Node;
use crate::template;

pub async fn execute(
    node: &Node,
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
    cancellation: &CancellationToken,
) -> Result<NodeOutput> {
    let substituted = template::substitute_with(
        &node.data.content,
        &node.id,
        ctx,
        template::sanitize_for_shell,
    );
    let command = super::require_non_empty(&substituted, Error::EmptyCommand)?.to_string();
    let command = expand_home(&command);

    let command = if node.data.needs_user_approval {
        match collaborators.approval.request_approval(&node.id, &command).await? {
            Some(approved) => approved,
            None => return Err(Error::Aborted),
        }
    } else {
        command
    };

    let head = command.split_whitespace().next().unwrap_or("");
    if DISALLOWED_COMMAND_HEADS.contains(&head) {
        return Err(Error::DisallowedCommand(command));
    }

    let output = collaborators.terminal.run(&command, cancellation).await?;
    ctx.set_cli_exit_code(&node.id, output.exit_code);

    if node.data.should_abort && output.exit_code != 0 {
        return Err(Error::ShellFailure(format!(
            "command exited with status {}: {}",
            output.exit_code, output.stdout
        )));
    }

    Ok(NodeOutput::Single(output.stdout))
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(command: &str) -> String {
    if let Some(rest) = command.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{rest}", home.display());
        }
    }
    command.to_string()
}
