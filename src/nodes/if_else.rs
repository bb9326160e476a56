//! `IF_ELSE` node executor (spec.md §4.F.11): evaluates a condition — either
//! by reading the exit code of a parent `CLI` node, or by substituting and
//! parsing a `LHS === RHS` / `LHS !== RHS` expression — then marks every node
//! transitively downstream of the branch not taken as skipped. `IF_ELSE`
//! never runs a command itself.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use crate::collaborators::Collaborators;
use crate::context::{ExecutionContext, NodeOutput};
use crate::error::Result;
use crate::model::{self, Node, NodeKind};
use crate::template;

pub async fn execute(
    node: &Node,
    ctx: &mut ExecutionContext,
    _collaborators: &Collaborators,
    _cancellation: &CancellationToken,
    nodes: &[Node],
) -> Result<NodeOutput> {
    let cli_parent = ctx
        .edge_index()
        .incoming(&node.id)
        .iter()
        .find(|edge| matches!(model::find_by_id(nodes, &edge.source).map(|n| n.kind), Some(NodeKind::Cli)))
        .map(|edge| edge.source.clone());

    let (condition, result) = if let Some(parent_id) = cli_parent {
        let exit_code = ctx.cli_exit_code(&parent_id).unwrap_or(-1);
        let parent_output = ctx
            .output(&parent_id)
            .map(|output| match output {
                NodeOutput::Single(s) => s.clone(),
                NodeOutput::Many(items) => items.join("\n"),
            })
            .unwrap_or_default();
        (exit_code == 0, parent_output)
    } else {
        let expression = template::substitute(&node.data.content, &node.id, ctx);
        let condition = evaluate_expression(&expression);
        (condition, condition.to_string())
    };

    let skipped_handle = if condition { "false" } else { "true" };
    let to_skip: Vec<String> = ctx
        .edge_index()
        .outgoing(&node.id)
        .iter()
        .filter(|e| e.source_handle.as_deref() == Some(skipped_handle))
        .map(|e| e.target.clone())
        .collect();

    mark_downstream_skipped(ctx, to_skip);

    Ok(NodeOutput::Single(result))
}

/// Parses exactly `LHS <op> RHS` with `op` one of `===`/`!==`; anything else
/// (wrong token count, unknown operator) evaluates to `false`.
fn evaluate_expression(expression: &str) -> bool {
    let tokens: Vec<&str> = expression.split_whitespace().collect();
    let [lhs, op, rhs] = tokens[..] else {
        return false;
    };
    match op {
        "===" => lhs == rhs,
        "!==" => lhs != rhs,
        _ => false,
    }
}

fn mark_downstream_skipped(ctx: &mut ExecutionContext, roots: Vec<String>) {
    let mut visited: HashSet<String> = HashSet::new();
    let mut stack = roots;
    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        ctx.mark_skipped(&id);
        for edge in ctx.edge_index().outgoing(&id) {
            if !visited.contains(&edge.target) {
                stack.push(edge.target.clone());
            }
        }
    }
}
