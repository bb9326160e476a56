//! Precomputed edge lookups (spec.md §4.A).
//!
//! `byTarget`'s insertion order is load-bearing: it defines "connection
//! order", the tie-breaker for the topological scheduler (§4.C) and the
//! indexing for `${N}` template substitution (§4.E).

use std::collections::HashMap;

use crate::model::Edge;

/// Maps from node/edge id to the edges touching it, preserving authoring
/// order.
#[derive(Debug, Clone, Default)]
pub struct EdgeIndex {
    by_source: HashMap<String, Vec<Edge>>,
    by_target: HashMap<String, Vec<Edge>>,
    by_id: HashMap<String, Edge>,
}

impl EdgeIndex {
    pub fn build(edges: &[Edge]) -> Self {
        let mut by_source: HashMap<String, Vec<Edge>> = HashMap::new();
        let mut by_target: HashMap<String, Vec<Edge>> = HashMap::new();
        let mut by_id = HashMap::new();

        for edge in edges {
            by_source
                .entry(edge.source.clone())
                .or_default()
                .push(edge.clone());
            by_target
                .entry(edge.target.clone())
                .or_default()
                .push(edge.clone());
            by_id.insert(edge.id.clone(), edge.clone());
        }

        Self {
            by_source,
            by_target,
            by_id,
        }
    }

    /// Edges leaving `node_id`, in authoring order.
    pub fn outgoing(&self, node_id: &str) -> &[Edge] {
        self.by_source.get(node_id).map_or(&[], |v| v.as_slice())
    }

    /// Edges arriving at `node_id`, in authoring (connection) order.
    pub fn incoming(&self, node_id: &str) -> &[Edge] {
        self.by_target.get(node_id).map_or(&[], |v| v.as_slice())
    }

    pub fn get(&self, edge_id: &str) -> Option<&Edge> {
        self.by_id.get(edge_id)
    }

    /// The connection order (0-indexed) of `edge_id` among edges sharing its
    /// target, or `None` if the edge id is unknown.
    pub fn connection_order(&self, edge_id: &str) -> Option<usize> {
        let edge = self.get(edge_id)?;
        self.incoming(&edge.target)
            .iter()
            .position(|e| e.id == edge_id)
    }
}
