//! `ACCUMULATOR` node executor (spec.md §4.F.9): appends each iteration's
//! substituted content to a running, newline-joined value.

use tokio_util::sync::CancellationToken;

use crate::collaborators::Collaborators;
use crate::context::{ExecutionContext, NodeOutput};
use crate::error::Result;
use crate::model::Node;
use crate::template;

pub async fn execute(
    node: &Node,
    ctx: &mut ExecutionContext,
    _collaborators: &Collaborators,
    _cancellation: &CancellationToken,
) -> Result<NodeOutput> {
    let name = node.data.variable_name.clone().unwrap_or_else(|| node.id.clone());
    let current = template::substitute(&node.data.content, &node.id, ctx);

    let prior = ctx
        .accumulator(&name)
        .map(|s| s.to_string())
        .unwrap_or_else(|| node.data.initial_value.clone().unwrap_or_default());
    let joined = format!("{prior}\n{current}");

    ctx.set_accumulator(name, joined.clone());
    Ok(NodeOutput::Single(joined))
}
