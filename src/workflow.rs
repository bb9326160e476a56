//! Workflow document model and version migration (spec.md §6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::model::{Edge, Node};

/// The version this engine authors new documents as.
pub const CURRENT_VERSION: &str = "1.1.0";

/// The serialized shape of a workflow: a document version plus the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default = "default_version")]
    pub version: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Inbound control messages a host sends the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    ExecuteWorkflow { workflow: WorkflowDocument },
    AbortWorkflow,
    NodeApproved {
        #[serde(rename = "nodeId")]
        node_id: String,
        #[serde(rename = "modifiedCommand", default)]
        modified_command: Option<String>,
    },
}

/// Parse a workflow document from JSON, migrating legacy (≤1.0.0) field
/// names forward before deserializing into [`Node`]/[`Edge`].
pub fn parse_workflow(raw: &str) -> Result<WorkflowDocument> {
    let mut value: Value = serde_json::from_str(raw)?;
    migrate_in_place(&mut value);
    let doc: WorkflowDocument = serde_json::from_value(value)?;
    Ok(doc)
}

fn version_is_legacy(value: &Value) -> bool {
    let version = value
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or("1.0.0");
    is_legacy_version(version)
}

fn is_legacy_version(version: &str) -> bool {
    parse_semver(version).map(|v| v <= (1, 0, 0)).unwrap_or(true)
}

fn parse_semver(version: &str) -> Option<(u32, u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    let patch = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor, patch))
}

/// Migrate a raw document's legacy field names in place:
/// `CLI.data.command` → `content`, `LLM.data.prompt` → `content` (carrying
/// `temperature`/`fast`/`maxTokens` along unchanged).
fn migrate_in_place(value: &mut Value) {
    if !version_is_legacy(value) {
        return;
    }

    if let Some(nodes) = value.get_mut("nodes").and_then(Value::as_array_mut) {
        for node in nodes {
            let Some(data) = node.get_mut("data").and_then(Value::as_object_mut) else {
                continue;
            };
            if let Some(command) = data.remove("command") {
                data.entry("content").or_insert(command);
            }
            if let Some(prompt) = data.remove("prompt") {
                data.entry("content").or_insert(prompt);
            }
            // `fast` legacy flag maps to a concrete model name; leave
            // temperature/maxTokens untouched, they already deserialize as-is.
            if let Some(Value::Bool(true)) = data.remove("fast") {
                data.entry("model").or_insert(Value::String("fast".to_string()));
            }
        }
    }

    value["version"] = Value::String(CURRENT_VERSION.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_cli_command_field_migrates_to_content() {
        let raw = r#"{
            "version": "1.0.0",
            "nodes": [{"id": "n1", "type": "CLI", "data": {"command": "echo hi"}}],
            "edges": []
        }"#;
        let doc = parse_workflow(raw).unwrap();
        assert_eq!(doc.version, CURRENT_VERSION);
        assert_eq!(doc.nodes[0].data.content, "echo hi");
    }

    #[test]
    fn legacy_llm_prompt_field_migrates_to_content() {
        let raw = r#"{
            "version": "1.0.0",
            "nodes": [{"id": "n1", "type": "LLM", "data": {"prompt": "summarize", "temperature": 0.2, "maxTokens": 256}}],
            "edges": []
        }"#;
        let doc = parse_workflow(raw).unwrap();
        assert_eq!(doc.nodes[0].data.content, "summarize");
        assert_eq!(doc.nodes[0].data.temperature, Some(0.2));
        assert_eq!(doc.nodes[0].data.max_tokens, Some(256));
    }

    #[test]
    fn current_version_document_is_left_untouched() {
        let raw = r#"{
            "version": "1.1.0",
            "nodes": [{"id": "n1", "type": "CLI", "data": {"content": "echo hi"}}],
            "edges": []
        }"#;
        let doc = parse_workflow(raw).unwrap();
        assert_eq!(doc.version, "1.1.0");
        assert_eq!(doc.nodes[0].data.content, "echo hi");
    }

    #[test]
    fn missing_version_is_treated_as_legacy() {
        let raw = r#"{
            "nodes": [{"id": "n1", "type": "CLI", "data": {"command": "echo hi"}}],
            "edges": []
        }"#;
        let doc = parse_workflow(raw).unwrap();
        assert_eq!(doc.nodes[0].data.content, "echo hi");
    }

    #[test]
    fn control_message_node_approved_round_trips() {
        let msg = ControlMessage::NodeApproved {
            node_id: "n1".to_string(),
            modified_command: Some("echo modified".to_string()),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ControlMessage = serde_json::from_str(&json).unwrap();
        match back {
            ControlMessage::NodeApproved { node_id, modified_command } => {
                assert_eq!(node_id, "n1");
                assert_eq!(modified_command.as_deref(), Some("echo modified"));
            }
            _ => panic!("wrong variant"),
        }
    }
}
