//! Graph data model: nodes, edges, and their kind-specific payloads.
//!
//! Mirrors the shape of the workflow document (§6): a node carries a stable
//! string id, a kind tag, and a `data` payload. Edges connect nodes by id and
//! optionally carry a handle (`"true"`, `"false"`, `"main"`,
//! `"iterations-override"`) used to disambiguate multiple outgoing/incoming
//! ports on control-flow nodes.

use serde::{Deserialize, Serialize};

/// The eleven node kinds the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Cli,
    Llm,
    Preview,
    Input,
    SearchContext,
    CodyOutput,
    LoopStart,
    LoopEnd,
    Accumulator,
    Variable,
    IfElse,
}

impl NodeKind {
    /// Control-flow node kinds participate in loop/if-else structure but are
    /// never merged into a strongly-connected component with non-control
    /// nodes (spec.md §4.B.1).
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            NodeKind::LoopStart | NodeKind::LoopEnd | NodeKind::IfElse
        )
    }
}

/// Kind-specific payload. Fields not relevant to a given kind are simply
/// unused; this flat shape matches the workflow document's `data` object,
/// which carries every field regardless of kind (unknown/absent fields
/// default away via `serde(default)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_true")]
    pub active: bool,

    // CLI
    #[serde(default)]
    pub needs_user_approval: bool,
    #[serde(default)]
    pub should_abort: bool,

    // LLM
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub has_google_search: bool,

    // SEARCH_CONTEXT
    #[serde(default)]
    pub local_remote: bool,

    // LOOP_START
    #[serde(default)]
    pub iterations: Option<u32>,
    #[serde(default)]
    pub loop_variable: Option<String>,

    // ACCUMULATOR / VARIABLE
    #[serde(default)]
    pub variable_name: Option<String>,
    #[serde(default)]
    pub initial_value: Option<String>,
}

fn default_true() -> bool {
    true
}

impl NodeData {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            active: true,
            ..Default::default()
        }
    }
}

/// A single node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, data: NodeData) -> Self {
        Self {
            id: id.into(),
            kind,
            data,
        }
    }

    pub fn is_active(&self) -> bool {
        self.data.active
    }
}

/// Look up a node by id in the full node list. Used by executors that need a
/// parent's *kind* rather than just its id — `IF_ELSE`'s CLI-driven
/// detection and `CODY_OUTPUT`'s `SEARCH_CONTEXT` routing both key off this.
pub fn find_by_id<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Node> {
    nodes.iter().find(|n| n.id == id)
}

/// A directed, ordered data-flow edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }
}
