//! `VARIABLE` node executor (spec.md §4.F.10): sets a named variable,
//! replacing (not concatenating) its previous value.

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
    let value = template::substitute(&node.data.content, &node.id, ctx);
    ctx.set_variable(name, value.clone());
    Ok(NodeOutput::Single(value))
}
