//! `INPUT` node executor (spec.md §4.F.4): static or templated user-supplied
//! content, substituted like any other node.

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
    let content = template::substitute(&node.data.content, &node.id, ctx);
    Ok(NodeOutput::Single(content))
}
