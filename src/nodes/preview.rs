//! `PREVIEW` node executor (spec.md §4.F.3): a display node whose content is
//! populated by the driver, not authored — it joins its parents' outputs with
//! `\n`, substitutes named variables, and trims.

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
    let content = template::join_and_substitute_named(&node.id, ctx);
    Ok(NodeOutput::Single(content))
}
