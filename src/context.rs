//! Execution context (spec.md §4.D): the single mutable container threaded
//! through every node executor during a run.

use std::collections::HashMap;

use crate::edge_index::EdgeIndex;
use crate::model::Edge;

/// One node's output(s): most nodes produce a single string, but a node can
/// fan out multiple values (e.g. `SEARCH_CONTEXT` hits) for `parentOutputs`
/// to join.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    Single(String),
    Many(Vec<String>),
}

impl NodeOutput {
    fn normalized_lines(&self) -> Vec<String> {
        match self {
            NodeOutput::Single(s) => vec![normalize_newlines(s)],
            NodeOutput::Many(items) => items.iter().map(|s| normalize_newlines(s)).collect(),
        }
    }
}

fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n")
}

/// Per-loop runtime state: current iteration counter and the loop variable's
/// current value, keyed by `LOOP_START` node id.
#[derive(Debug, Clone, Default)]
pub struct LoopState {
    pub iteration: u32,
    pub variable_name: Option<String>,
    pub variable_value: Option<String>,
}

/// Mutable state carried across an entire execution run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    node_outputs: HashMap<String, NodeOutput>,
    loop_states: HashMap<String, LoopState>,
    accumulator_values: HashMap<String, String>,
    variable_values: HashMap<String, String>,
    cli_exit_codes: HashMap<String, i32>,
    ifelse_skip_paths: std::collections::HashSet<String>,
    edge_index: EdgeIndex,
}

impl ExecutionContext {
    pub fn new(edges: &[Edge]) -> Self {
        Self {
            node_outputs: HashMap::new(),
            loop_states: HashMap::new(),
            accumulator_values: HashMap::new(),
            variable_values: HashMap::new(),
            cli_exit_codes: HashMap::new(),
            ifelse_skip_paths: std::collections::HashSet::new(),
            edge_index: EdgeIndex::build(edges),
        }
    }

    pub fn edge_index(&self) -> &EdgeIndex {
        &self.edge_index
    }

    pub fn set_output(&mut self, node_id: impl Into<String>, output: NodeOutput) {
        self.node_outputs.insert(node_id.into(), output);
    }

    pub fn output(&self, node_id: &str) -> Option<&NodeOutput> {
        self.node_outputs.get(node_id)
    }

    pub fn loop_state(&self, loop_start_id: &str) -> Option<&LoopState> {
        self.loop_states.get(loop_start_id)
    }

    pub fn loop_state_mut(&mut self, loop_start_id: &str) -> &mut LoopState {
        self.loop_states.entry(loop_start_id.to_string()).or_default()
    }

    pub fn set_accumulator(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.accumulator_values.insert(name.into(), value.into());
    }

    pub fn accumulator(&self, name: &str) -> Option<&str> {
        self.accumulator_values.get(name).map(|s| s.as_str())
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variable_values.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variable_values.get(name).map(|s| s.as_str())
    }

    pub fn set_cli_exit_code(&mut self, node_id: impl Into<String>, code: i32) {
        self.cli_exit_codes.insert(node_id.into(), code);
    }

    pub fn cli_exit_code(&self, node_id: &str) -> Option<i32> {
        self.cli_exit_codes.get(node_id).copied()
    }

    pub fn mark_skipped(&mut self, node_id: impl Into<String>) {
        self.ifelse_skip_paths.insert(node_id.into());
    }

    pub fn is_skipped(&self, node_id: &str) -> bool {
        self.ifelse_skip_paths.contains(node_id)
    }

    /// The joined, normalized output of every node feeding `node_id`, in
    /// connection order (spec.md §4.D): CRLF is normalized to LF, multi-value
    /// outputs are joined with `\n`, the result is trimmed, and a missing
    /// upstream output is substituted with an empty string.
    pub fn parent_outputs(&self, node_id: &str) -> Vec<String> {
        self.edge_index
            .incoming(node_id)
            .iter()
            .map(|edge| match self.node_outputs.get(&edge.source) {
                Some(output) => output.normalized_lines().join("\n").trim().to_string(),
                None => String::new(),
            })
            .collect()
    }

    /// Resolve a `${name}` reference by scope precedence (spec.md §4.E):
    /// variable overrides accumulator overrides loop variable.
    pub fn resolve_named(&self, name: &str) -> Option<String> {
        if let Some(v) = self.variable(name) {
            return Some(v.to_string());
        }
        if let Some(v) = self.accumulator(name) {
            return Some(v.to_string());
        }
        self.loop_states
            .values()
            .find(|s| s.variable_name.as_deref() == Some(name))
            .and_then(|s| s.variable_value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edge;
    use pretty_assertions::assert_eq;

    #[test]
    fn parent_outputs_normalizes_and_trims() {
        let edges = vec![Edge::new("e1", "a", "m")];
        let mut ctx = ExecutionContext::new(&edges);
        ctx.set_output("a", NodeOutput::Single("line one\r\nline two\n  ".to_string()));
        let parents = ctx.parent_outputs("m");
        assert_eq!(parents, vec!["line one\nline two".to_string()]);
    }

    #[test]
    fn parent_outputs_joins_many_with_newline() {
        let edges = vec![Edge::new("e1", "a", "m")];
        let mut ctx = ExecutionContext::new(&edges);
        ctx.set_output(
            "a",
            NodeOutput::Many(vec!["first".to_string(), "second".to_string()]),
        );
        let parents = ctx.parent_outputs("m");
        assert_eq!(parents, vec!["first\nsecond".to_string()]);
    }

    #[test]
    fn missing_upstream_output_is_empty_string() {
        let edges = vec![Edge::new("e1", "a", "m")];
        let ctx = ExecutionContext::new(&edges);
        let parents = ctx.parent_outputs("m");
        assert_eq!(parents, vec!["".to_string()]);
    }

    #[test]
    fn parent_outputs_preserves_connection_order() {
        let edges = vec![Edge::new("e2", "b", "m"), Edge::new("e1", "a", "m")];
        let mut ctx = ExecutionContext::new(&edges);
        ctx.set_output("a", NodeOutput::Single("A".to_string()));
        ctx.set_output("b", NodeOutput::Single("B".to_string()));
        let parents = ctx.parent_outputs("m");
        assert_eq!(parents, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn skip_paths_track_membership() {
        let edges = vec![];
        let mut ctx = ExecutionContext::new(&edges);
        assert!(!ctx.is_skipped("x"));
        ctx.mark_skipped("x");
        assert!(ctx.is_skipped("x"));
    }
}
