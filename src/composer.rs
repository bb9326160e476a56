//! Graph composer (spec.md §4.B): turns `(nodes, edges)` into a linearized,
//! loop-unrolled execution sequence.
//!
//! Strongly-connected components are detected with `petgraph::algo::tarjan_scc`
//! rather than a hand-rolled pass (the teacher's workspace already depends on
//! `petgraph` for graph data structures elsewhere in the stack). Control
//! nodes (`LOOP_START`/`LOOP_END`/`IF_ELSE`) have their outgoing edges hidden
//! from the SCC graph so they can never serve as the return path that closes
//! a cycle between two otherwise-unrelated branches ("control nodes cannot
//! merge cycles", spec.md §4.B.1).

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::edge_index::EdgeIndex;
use crate::model::{Edge, Node, NodeKind};

/// Every node reachable (forward, through edges) from a node whose
/// `data.active` is `false`, plus those roots themselves — i.e. the
/// complement of spec.md §3's "active" invariant.
pub fn inactive_closure(nodes: &[Node], edges: &[Edge]) -> HashSet<String> {
    let index = EdgeIndex::build(edges);
    let mut inactive: HashSet<String> = nodes
        .iter()
        .filter(|n| !n.data.active)
        .map(|n| n.id.clone())
        .collect();
    let mut stack: Vec<String> = inactive.iter().cloned().collect();
    while let Some(cur) = stack.pop() {
        for edge in index.outgoing(&cur) {
            if inactive.insert(edge.target.clone()) {
                stack.push(edge.target.clone());
            }
        }
    }
    inactive
}

/// Filter `nodes`/`edges` down to the active subgraph (§4.B step 1): active
/// nodes, and edges whose endpoints are both active.
fn active_subgraph(nodes: &[Node], edges: &[Edge]) -> (Vec<Node>, Vec<Edge>) {
    let inactive = inactive_closure(nodes, edges);
    let active_nodes: Vec<Node> = nodes
        .iter()
        .filter(|n| !inactive.contains(&n.id))
        .cloned()
        .collect();
    let active_ids: HashSet<&str> = active_nodes.iter().map(|n| n.id.as_str()).collect();
    let active_edges: Vec<Edge> = edges
        .iter()
        .filter(|e| active_ids.contains(e.source.as_str()) && active_ids.contains(e.target.as_str()))
        .cloned()
        .collect();
    (active_nodes, active_edges)
}

/// Compose the execution sequence for `(nodes, edges)` (spec.md §4.B).
pub fn compose(nodes: &[Node], edges: &[Edge]) -> Vec<Node> {
    let (active_nodes, active_edges) = active_subgraph(nodes, edges);

    if active_nodes.iter().any(|n| n.kind == NodeKind::LoopStart) {
        loop_composition(&active_nodes, &active_edges)
    } else {
        acyclic_composition(&active_nodes, &active_edges)
    }
}

/// §4.B.1 — SCC detection (to collapse accidental cycles among non-control
/// nodes) followed by the topological scheduler.
fn acyclic_composition(nodes: &[Node], edges: &[Edge]) -> Vec<Node> {
    let index = EdgeIndex::build(edges);

    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut id_to_ix: HashMap<String, NodeIndex> = HashMap::new();
    for node in nodes {
        let ix = graph.add_node(node.id.clone());
        id_to_ix.insert(node.id.clone(), ix);
    }
    for node in nodes {
        // Control nodes cannot merge cycles: hide their outgoing edges from
        // the SCC graph so they're never the return path closing a loop.
        if node.kind.is_control() {
            continue;
        }
        for edge in index.outgoing(&node.id) {
            if let (Some(&from), Some(&to)) = (id_to_ix.get(&node.id), id_to_ix.get(&edge.target)) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let sccs = tarjan_scc(&graph);

    let mut flattened: Vec<Node> = Vec::with_capacity(nodes.len());
    for component in sccs {
        if component.len() > 1 {
            let has_non_control = component.iter().any(|&ix| {
                by_id
                    .get(graph[ix].as_str())
                    .is_some_and(|n| !n.kind.is_control())
            });
            if !has_non_control {
                // Discard components containing no non-control node.
                continue;
            }
        }
        for ix in component {
            if let Some(&node) = by_id.get(graph[ix].as_str()) {
                flattened.push(node.clone());
            }
        }
    }

    crate::scheduler::topological_order(&flattened, &index)
}

/// §4.B.2 — partition into pre-/in-/post-loop sets per `LOOP_START`, unroll
/// by iteration count, and stitch the pieces together.
fn loop_composition(nodes: &[Node], edges: &[Edge]) -> Vec<Node> {
    let index = EdgeIndex::build(edges);
    let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let loop_starts: Vec<&Node> = nodes
        .iter()
        .filter(|n| n.kind == NodeKind::LoopStart)
        .collect();

    let mut emitted: HashSet<String> = HashSet::new();
    let mut out: Vec<Node> = Vec::new();

    for start in loop_starts {
        let end_id = resolve_loop_end(&start.id, &index, &by_id);

        let pre = pre_loop_nodes(&start.id, &index, &by_id);
        let pre_sorted = crate::scheduler::topological_order(&pre, &index);
        let pre_ids: HashSet<String> = pre_sorted.iter().map(|n| n.id.clone()).collect();

        let boundary_ids: HashSet<&str> = {
            let mut s = HashSet::new();
            s.insert(start.id.as_str());
            if let Some(ref e) = end_id {
                s.insert(e.as_str());
            }
            s
        };

        let in_loop = in_loop_nodes(&start.id, &index, &by_id, &pre_ids, &boundary_ids);
        let in_loop_sorted = crate::scheduler::topological_order(&in_loop, &index);
        let in_loop_ids: HashSet<&str> = in_loop_sorted.iter().map(|n| n.id.as_str()).collect();

        // The post-loop walk must also stop at the loop body's own nodes, or
        // it re-claims them by walking backward from LOOP_END through them.
        let mut stop_ids = boundary_ids.clone();
        stop_ids.extend(in_loop_ids.iter().copied());

        let post = end_id
            .as_ref()
            .map(|e| post_loop_nodes(e, &index, &by_id, &stop_ids))
            .unwrap_or_default();
        let post_sorted = crate::scheduler::topological_order(&post, &index);

        let iterations = resolve_iterations(start, &index, &by_id);

        for node in &pre_sorted {
            if emitted.insert(node.id.clone()) {
                out.push(node.clone());
            }
        }
        for i in 0..iterations {
            tracing::debug!(loop_start = %start.id, iteration = i, "unrolling loop iteration");
            out.push((*start).clone());
            for node in &in_loop_sorted {
                out.push(node.clone());
            }
            if let Some(ref e) = end_id {
                if let Some(&end_node) = by_id.get(e.as_str()) {
                    out.push(end_node.clone());
                }
            }
        }
        for node in &post_sorted {
            // De-duplicate: a node in both pre- and post-loop sets (diamond
            // shapes) is emitted only once, at its pre-loop position.
            if !pre_ids.contains(&node.id) && emitted.insert(node.id.clone()) {
                out.push(node.clone());
            }
        }
    }

    out
}

/// DFS from `start` following source→target edges, stopping at the first
/// `LOOP_END`. Encountering a different `LOOP_START` prunes that path
/// (nested loops are not crossed).
fn resolve_loop_end(
    start: &str,
    index: &EdgeIndex,
    by_id: &HashMap<&str, &Node>,
) -> Option<String> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(start.to_string());
    let mut stack = vec![start.to_string()];

    while let Some(cur) = stack.pop() {
        for edge in index.outgoing(&cur) {
            if visited.contains(&edge.target) {
                continue;
            }
            let Some(&node) = by_id.get(edge.target.as_str()) else {
                continue;
            };
            if node.kind == NodeKind::LoopEnd {
                return Some(edge.target.clone());
            }
            visited.insert(edge.target.clone());
            if node.kind == NodeKind::LoopStart {
                // Pruning signal: don't cross into a nested loop.
                continue;
            }
            stack.push(edge.target.clone());
        }
    }
    None
}

/// Nodes conceptually "before" the loop: explore transitively in both
/// directions from `start`'s parents, never crossing a loop boundary.
fn pre_loop_nodes(start: &str, index: &EdgeIndex, by_id: &HashMap<&str, &Node>) -> Vec<Node> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    for edge in index.incoming(start) {
        if visited.insert(edge.source.clone()) {
            queue.push_back(edge.source.clone());
        }
    }

    let mut result = Vec::new();
    while let Some(cur) = queue.pop_front() {
        let Some(&node) = by_id.get(cur.as_str()) else {
            continue;
        };
        if node.kind == NodeKind::LoopStart || node.kind == NodeKind::LoopEnd {
            continue;
        }
        result.push(node.clone());

        for edge in index.incoming(&cur).iter().chain(index.outgoing(&cur)) {
            let neighbor = if edge.target == cur {
                &edge.source
            } else {
                &edge.target
            };
            if let Some(&nb) = by_id.get(neighbor.as_str()) {
                if (nb.kind == NodeKind::LoopStart || nb.kind == NodeKind::LoopEnd)
                    && neighbor != cur.as_str()
                {
                    continue;
                }
            }
            if visited.insert(neighbor.clone()) {
                queue.push_back(neighbor.clone());
            }
        }
    }
    result
}

/// Nodes belonging to the loop body: queue-walk from `start` in both
/// directions, excluding pre-loop nodes and both loop boundary kinds.
fn in_loop_nodes(
    start: &str,
    index: &EdgeIndex,
    by_id: &HashMap<&str, &Node>,
    pre_ids: &HashSet<String>,
    boundary_ids: &HashSet<&str>,
) -> Vec<Node> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(start.to_string());
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(start.to_string());

    let mut result = Vec::new();
    while let Some(cur) = queue.pop_front() {
        for edge in index.outgoing(&cur).iter().chain(index.incoming(&cur)) {
            let neighbor = if edge.source == cur {
                &edge.target
            } else {
                &edge.source
            };
            if visited.contains(neighbor) || pre_ids.contains(neighbor) {
                continue;
            }
            if boundary_ids.contains(neighbor.as_str()) {
                visited.insert(neighbor.clone());
                continue;
            }
            visited.insert(neighbor.clone());
            if let Some(&node) = by_id.get(neighbor.as_str()) {
                result.push(node.clone());
            }
            queue.push_back(neighbor.clone());
        }
    }
    result
}

/// Nodes belonging conceptually after the loop: queue-walk from `end` in both
/// directions, excluding both loop boundary kinds.
fn post_loop_nodes(
    end: &str,
    index: &EdgeIndex,
    by_id: &HashMap<&str, &Node>,
    boundary_ids: &HashSet<&str>,
) -> Vec<Node> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(end.to_string());
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(end.to_string());

    let mut result = Vec::new();
    while let Some(cur) = queue.pop_front() {
        for edge in index.outgoing(&cur).iter().chain(index.incoming(&cur)) {
            let neighbor = if edge.source == cur {
                &edge.target
            } else {
                &edge.source
            };
            if visited.contains(neighbor) {
                continue;
            }
            if boundary_ids.contains(neighbor.as_str()) {
                visited.insert(neighbor.clone());
                continue;
            }
            visited.insert(neighbor.clone());
            if let Some(&node) = by_id.get(neighbor.as_str()) {
                result.push(node.clone());
            }
            queue.push_back(neighbor.clone());
        }
    }
    result
}

/// Resolve the unroll count: `LOOP_START.data.iterations`, unless a parent
/// edge targeting `"iterations-override"` carries a statically-known
/// integer literal. Composition happens before any node executes, so the
/// override can only be honored when its source is a literal value (an
/// `INPUT`'s content or a `VARIABLE`'s initial value with no `${...}`
/// substitution pending) — see DESIGN.md for this Open Question's resolution.
fn resolve_iterations(start: &Node, index: &EdgeIndex, by_id: &HashMap<&str, &Node>) -> u32 {
    let default = start.data.iterations.unwrap_or(0);

    let override_edge = index
        .incoming(&start.id)
        .iter()
        .find(|e| e.target_handle.as_deref() == Some("iterations-override"));

    let Some(edge) = override_edge else {
        return default;
    };
    let Some(&source) = by_id.get(edge.source.as_str()) else {
        return default;
    };

    let literal = match source.kind {
        NodeKind::Input => Some(source.data.content.trim().to_string()),
        NodeKind::Variable => source
            .data
            .initial_value
            .as_ref()
            .map(|v| v.trim().to_string()),
        _ => None,
    };

    literal
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(default)
}
