//! `CODY_OUTPUT` node executor (spec.md §4.F.6): hands its parents' text off
//! to an ongoing chat session as a continuation, routing any `SEARCH_CONTEXT`
//! parent's output into retrieved context items rather than the chat text
//! itself, and resolves with the session's identifier.

use tokio_util::sync::CancellationToken;

use crate::collaborators::{Collaborators, ContextItem};
use crate::context::{ExecutionContext, NodeOutput};
use crate::error::Result;
use crate::model::{self, Node, NodeKind};

pub async fn execute(
    node: &Node,
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
    cancellation: &CancellationToken,
    nodes: &[Node],
) -> Result<NodeOutput> {
    let incoming = ctx.edge_index().incoming(&node.id).to_vec();
    let parent_outputs = ctx.parent_outputs(&node.id);

    let mut text_parts = Vec::new();
    let mut context_items = Vec::new();

    for (edge, output) in incoming.iter().zip(parent_outputs.iter()) {
        let is_search_context = matches!(
            model::find_by_id(nodes, &edge.source).map(|n| n.kind),
            Some(NodeKind::SearchContext)
        );
        if is_search_context {
            context_items.extend(parse_context_items(output));
        } else {
            text_parts.push(output.clone());
        }
    }

    let text = text_parts.join("\n");
    let session_id = collaborators
        .chat_session
        .continue_session(&text, &context_items, cancellation)
        .await?;

    Ok(NodeOutput::Single(session_id))
}

/// Splits a `SEARCH_CONTEXT` parent's joined output back into individual
/// items, each formatted `uri\ncontent` and separated by
/// [`super::search_context::SECTION_MARKER`].
fn parse_context_items(joined: &str) -> Vec<ContextItem> {
    joined
        .split(super::search_context::SECTION_MARKER)
        .filter(|s| !s.is_empty())
        .map(|section| match section.split_once('\n') {
            Some((uri, content)) => ContextItem { uri: uri.to_string(), content: content.to_string() },
            None => ContextItem { uri: section.to_string(), content: String::new() },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{
        AutoApprove, EchoChatClient, EmptyContextRetriever, FixedTerminal, StubChatSession, WordCountTokenCounter,
    };
    use crate::collaborators::{ChatSession, TerminalOutput};
    use crate::model::{Edge, NodeData, NodeKind};
    use std::sync::{Arc, Mutex};

    /// Records the text and context items it was handed, for assertions.
    struct RecordingChatSession {
        session_id: String,
        seen: Mutex<Option<(String, Vec<ContextItem>)>>,
    }

    #[async_trait::async_trait]
    impl ChatSession for RecordingChatSession {
        async fn continue_session(
            &self,
            text: &str,
            context_items: &[ContextItem],
            _cancellation: &tokio_util::sync::CancellationToken,
        ) -> Result<String> {
            *self.seen.lock().unwrap() = Some((text.to_string(), context_items.to_vec()));
            Ok(self.session_id.clone())
        }
    }

    fn collaborators_with_session(session: Arc<dyn ChatSession>) -> Collaborators {
        Collaborators {
            chat: Arc::new(EchoChatClient),
            context: Arc::new(EmptyContextRetriever),
            approval: Arc::new(AutoApprove),
            tokens: Arc::new(WordCountTokenCounter),
            terminal: Arc::new(FixedTerminal {
                output: TerminalOutput { stdout: String::new(), stderr: String::new(), exit_code: 0 },
            }),
            chat_session: session,
        }
    }

    #[tokio::test]
    async fn resolves_with_the_session_identifier() {
        let node = Node::new("n1", NodeKind::CodyOutput, NodeData::new("ignored"));
        let prompt = Node::new("p", NodeKind::Input, NodeData::new("draft this"));
        let nodes = vec![prompt.clone(), node.clone()];
        let edges = vec![Edge::new("e1", "p", "n1")];
        let mut ctx = ExecutionContext::new(&edges);
        ctx.set_output("p", NodeOutput::Single("draft this".to_string()));
        let collab = collaborators_with_session(Arc::new(StubChatSession::new("sess-42")));
        let token = CancellationToken::new();

        let out = execute(&node, &mut ctx, &collab, &token, &nodes).await.unwrap();
        assert_eq!(out, NodeOutput::Single("sess-42".to_string()));
    }

    #[tokio::test]
    async fn search_context_parent_routes_to_context_items_not_text() {
        let node = Node::new("n1", NodeKind::CodyOutput, NodeData::new("ignored"));
        let prompt = Node::new("p", NodeKind::Input, NodeData::new("explain this"));
        let search = Node::new("s", NodeKind::SearchContext, NodeData::new("query"));
        let nodes = vec![prompt.clone(), search.clone(), node.clone()];
        // p's edge is authored second so its text lands after s's in parent_outputs,
        // but s is still routed to context_items rather than the chat text.
        let edges = vec![Edge::new("e2", "s", "n1"), Edge::new("e1", "p", "n1")];
        let mut ctx = ExecutionContext::new(&edges);
        ctx.set_output("p", NodeOutput::Single("explain this".to_string()));
        ctx.set_output(
            "s",
            NodeOutput::Single(format!(
                "file:///a.rs\nfn main() {{}}{}file:///b.rs\nfn lib() {{}}",
                super::super::search_context::SECTION_MARKER
            )),
        );
        let seen = Arc::new(RecordingChatSession { session_id: "sess-1".to_string(), seen: Mutex::new(None) });
        let collab = collaborators_with_session(seen.clone());
        let token = CancellationToken::new();

        let out = execute(&node, &mut ctx, &collab, &token, &nodes).await.unwrap();
        assert_eq!(out, NodeOutput::Single("sess-1".to_string()));

        let (text, items) = seen.seen.lock().unwrap().clone().unwrap();
        assert_eq!(text, "explain this");
        assert_eq!(
            items,
            vec![
                ContextItem { uri: "file:///a.rs".to_string(), content: "fn main() {}".to_string() },
                ContextItem { uri: "file:///b.rs".to_string(), content: "fn lib() {}".to_string() },
            ]
        );
    }
}
