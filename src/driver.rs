//! Execution driver (spec.md §4.G): walks the composer's linearized
//! sequence, emitting monotonic progress events and halting on the first
//! error.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::collaborators::Collaborators;
use crate::composer;
use crate::context::ExecutionContext;
use crate::elapsed;
use crate::error::{Error, Result};
use crate::model::{Node, NodeKind};
use crate::util::truncate_string;
use crate::workflow::WorkflowDocument;

/// Longest error message kept in full before being truncated for progress
/// events; long shell/LLM output shouldn't blow up a logged event.
const MAX_EVENT_MESSAGE_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeStatus {
    Running,
    PendingApproval,
    Completed,
    Error,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    ExecutionStarted { node_count: usize, edge_count: usize },
    NodeExecutionStatus { node_id: String, status: NodeStatus, message: Option<String> },
    TokenCount { node_id: String, tokens: u32 },
    ExecutionCompleted,
}

/// Run `document` to completion (or to the first error), emitting events via
/// `on_event` as it goes. Returns the final [`ExecutionContext`] so callers
/// can inspect node outputs, variable state, and CLI exit codes after the
/// run.
pub async fn run(
    document: &WorkflowDocument,
    collaborators: &Collaborators,
    cancellation: &CancellationToken,
    mut on_event: impl FnMut(ProgressEvent),
) -> Result<ExecutionContext> {
    let sequence = composer::compose(&document.nodes, &document.edges);
    let inactive = composer::inactive_closure(&document.nodes, &document.edges);

    on_event(ProgressEvent::ExecutionStarted {
        node_count: sequence.len(),
        edge_count: document.edges.len(),
    });

    let mut ctx = ExecutionContext::new(&document.edges);

    for node in &sequence {
        if inactive.contains(&node.id) || ctx.is_skipped(&node.id) {
            continue;
        }

        if let Err(err) = check_cancelled(cancellation) {
            on_event(ProgressEvent::NodeExecutionStatus {
                node_id: node.id.clone(),
                status: NodeStatus::Interrupted,
                message: Some(err.to_string()),
            });
            return Err(err);
        }

        if let Err(err) = run_one(node, &mut ctx, collaborators, cancellation, &mut on_event, &document.nodes).await {
            let status = if err.is_aborted() {
                NodeStatus::Interrupted
            } else {
                NodeStatus::Error
            };
            on_event(ProgressEvent::NodeExecutionStatus {
                node_id: node.id.clone(),
                status,
                message: Some(truncate_string(&err.to_string(), MAX_EVENT_MESSAGE_LEN)),
            });
            return Err(err);
        }
    }

    on_event(ProgressEvent::ExecutionCompleted);
    Ok(ctx)
}

async fn run_one(
    node: &Node,
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
    cancellation: &CancellationToken,
    on_event: &mut impl FnMut(ProgressEvent),
    nodes: &[Node],
) -> Result<()> {
    if node.kind == NodeKind::Cli && node.data.needs_user_approval {
        on_event(ProgressEvent::NodeExecutionStatus {
            node_id: node.id.clone(),
            status: NodeStatus::PendingApproval,
            message: None,
        });
    }

    on_event(ProgressEvent::NodeExecutionStatus {
        node_id: node.id.clone(),
        status: NodeStatus::Running,
        message: None,
    });

    let started = Instant::now();
    let output = crate::nodes::execute(node, ctx, collaborators, cancellation, nodes).await?;
    debug!(node_id = %node.id, elapsed = %elapsed::format_elapsed(started), "node finished");

    if matches!(node.kind, NodeKind::Preview | NodeKind::LoopEnd) {
        if let crate::context::NodeOutput::Single(ref text) = output {
            let tokens = collaborators.tokens.count(text).await.unwrap_or(0);
            on_event(ProgressEvent::TokenCount { node_id: node.id.clone(), tokens });
        }
    }

    ctx.set_output(node.id.clone(), output);

    on_event(ProgressEvent::NodeExecutionStatus {
        node_id: node.id.clone(),
        status: NodeStatus::Completed,
        message: Some(elapsed::format_elapsed(started)),
    });

    Ok(())
}

/// Whether cancellation was requested; the driver checks this at each node
/// boundary as a cooperative abort path in addition to node executors
/// racing the token internally.
pub fn check_cancelled(cancellation: &CancellationToken) -> Result<()> {
    if cancellation.is_cancelled() {
        Err(Error::Aborted)
    } else {
        Ok(())
    }
}
