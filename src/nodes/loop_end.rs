//! `LOOP_END` node executor (spec.md §4.F.8): marks the close of a loop
//! iteration. Behaves like `PREVIEW` — a pass-through — since the
//! per-iteration bookkeeping already happened in `LOOP_START`.

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
