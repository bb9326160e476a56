//! `LOOP_START` node executor (spec.md §4.F.7).
//!
//! The composer is authoritative for *how many* times a loop body is
//! unrolled (spec.md §9); this executor's only job at runtime is to assign
//! the loop variable's value for the physical copy currently running, by
//! counting its own invocations.

use tokio_util::sync::CancellationToken;

use crate::collaborators::Collaborators;
use crate::context::{ExecutionContext, NodeOutput};
use crate::error::Result;
use crate::model::Node;

pub async fn execute(
    node: &Node,
    ctx: &mut ExecutionContext,
    _collaborators: &Collaborators,
    _cancellation: &CancellationToken,
) -> Result<NodeOutput> {
    let variable_name = node.data.loop_variable.clone();
    let state = ctx.loop_state_mut(&node.id);
    let index = state.iteration;
    state.variable_name = variable_name;
    state.variable_value = Some(index.to_string());
    state.iteration += 1;

    Ok(NodeOutput::Single(index.to_string()))
}
