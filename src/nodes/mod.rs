//! Node executors (spec.md §4.F): one async function per node kind, all
//! sharing the contract `(node, context, collaborators, cancellation) ->
//! Result<NodeOutput>`.

mod accumulator;
mod cli;
mod cody_output;
mod if_else;
mod input;
mod llm;
mod loop_end;
mod loop_start;
mod preview;
mod search_context;
mod variable;

use tokio_util::sync::CancellationToken;

use crate::collaborators::Collaborators;
use crate::context::{ExecutionContext, NodeOutput};
use crate::error::{Error, Result};
use crate::model::{Node, NodeKind};

/// Dispatch `node` to its kind-specific executor. `nodes` is the full node
/// list of the document being run; only `IF_ELSE` and `CODY_OUTPUT` need it,
/// to look up a parent's kind rather than just its id.
pub async fn execute(
    node: &Node,
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
    cancellation: &CancellationToken,
    nodes: &[Node],
) -> Result<NodeOutput> {
    match node.kind {
        NodeKind::Cli => cli::execute(node, ctx, collaborators, cancellation).await,
        NodeKind::Llm => llm::execute(node, ctx, collaborators, cancellation).await,
        NodeKind::Preview => preview::execute(node, ctx, collaborators, cancellation).await,
        NodeKind::Input => input::execute(node, ctx, collaborators, cancellation).await,
        NodeKind::SearchContext => search_context::execute(node, ctx, collaborators, cancellation).await,
        NodeKind::CodyOutput => cody_output::execute(node, ctx, collaborators, cancellation, nodes).await,
        NodeKind::LoopStart => loop_start::execute(node, ctx, collaborators, cancellation).await,
        NodeKind::LoopEnd => loop_end::execute(node, ctx, collaborators, cancellation).await,
        NodeKind::Accumulator => accumulator::execute(node, ctx, collaborators, cancellation).await,
        NodeKind::Variable => variable::execute(node, ctx, collaborators, cancellation).await,
        NodeKind::IfElse => if_else::execute(node, ctx, collaborators, cancellation, nodes).await,
    }
}

/// Common guard: reject empty-after-substitution content with `err`.
fn require_non_empty(content: &str, err: Error) -> Result<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Err(err)
    } else {
        Ok(trimmed)
    }
}
