//! Topological scheduler (spec.md §4.C): Kahn's algorithm tie-broken by
//! connection order, with a cycle-tolerant fallback so the schedule always
//! terminates even on malformed (cyclic) input.

use std::collections::HashMap;

use crate::edge_index::EdgeIndex;
use crate::model::Node;

/// A node's priority is the minimum target-connection-order among its
/// outgoing edges, or `+∞` (`usize::MAX`) if it has none.
fn priority(node_id: &str, index: &EdgeIndex) -> usize {
    index
        .outgoing(node_id)
        .iter()
        .filter_map(|e| index.connection_order(&e.id))
        .min()
        .unwrap_or(usize::MAX)
}

/// Produce a deterministic topological order over `nodes` using the edges in
/// `index`. `index` may reference edges outside of `nodes` (e.g. when
/// scheduling a subset of the graph); only edges whose endpoints are both in
/// `nodes` are considered.
pub fn topological_order(nodes: &[Node], index: &EdgeIndex) -> Vec<Node> {
    let ids: std::collections::HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

    let mut in_degree: HashMap<String, usize> = nodes.iter().map(|n| (n.id.clone(), 0)).collect();
    let mut children: HashMap<String, Vec<String>> =
        nodes.iter().map(|n| (n.id.clone(), Vec::new())).collect();

    for node in nodes {
        for edge in index.outgoing(&node.id) {
            if !ids.contains(edge.target.as_str()) {
                continue;
            }
            *in_degree.get_mut(&edge.target).unwrap() += 1;
            children.get_mut(&node.id).unwrap().push(edge.target.clone());
        }
    }

    let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let mut queue: Vec<String> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(id, _)| id.clone())
        .collect();
    sort_by_priority(&mut queue, index);

    let mut processed: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut result = Vec::with_capacity(nodes.len());

    while result.len() < nodes.len() {
        if queue.is_empty() {
            // Cycle tolerance: promote the unprocessed node with the lowest
            // current in-degree so the schedule still terminates.
            let Some(promoted) = in_degree
                .iter()
                .filter(|(id, _)| !processed.contains(id.as_str()))
                .min_by_key(|(id, &deg)| (deg, id.to_string()))
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            tracing::warn!(node = %promoted, "cycle detected, promoting lowest in-degree node");
            queue.push(promoted);
        }

        queue.sort_by_key(|id| priority(id, index));
        let next = queue.remove(0);
        if processed.contains(&next) {
            continue;
        }
        processed.insert(next.clone());

        if let Some(&node) = by_id.get(next.as_str()) {
            result.push(node.clone());
        }

        for child in children.get(&next).cloned().unwrap_or_default() {
            if processed.contains(&child) {
                continue;
            }
            let deg = in_degree.get_mut(&child).unwrap();
            *deg = deg.saturating_sub(1);
            if *deg == 0 && !queue.contains(&child) {
                queue.push(child);
            }
        }
    }

    result
}

fn sort_by_priority(queue: &mut [String], index: &EdgeIndex) {
    queue.sort_by_key(|id| priority(id, index));
}
