//! `SEARCH_CONTEXT` node executor (spec.md §4.F.5): retrieves context items
//! for a substituted query, formatting each item as `uri\ncontent` and
//! joining them with the `\n----\n` section marker so `CODY_OUTPUT` can split
//! them back apart downstream.

use tokio_util::sync::CancellationToken;

use crate::collaborators::Collaborators;
use crate::context::{ExecutionContext, NodeOutput};
use crate::error::Result;
use crate::model::Node;
use crate::template;

pub const SECTION_MARKER: &str = "\n----\n";

pub async fn execute(
    node: &Node,
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
    _cancellation: &CancellationToken,
) -> Result<NodeOutput> {
    let query = template::substitute(&node.data.content, &node.id, ctx).trim().to_string();
    let items = collaborators.context.retrieve(&query, node.data.local_remote).await?;
    let formatted = items
        .into_iter()
        .map(|item| format!("{}\n{}", item.uri, item.content))
        .collect::<Vec<_>>()
        .join(SECTION_MARKER);
    Ok(NodeOutput::Single(formatted))
}
