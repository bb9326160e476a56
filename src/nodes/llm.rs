//! `LLM` node executor (spec.md §4.F.2): completes a prompt against the
//! configured chat client, consuming its `change`/`complete`/`error` event
//! stream and racing a hard timeout and cancellation across the whole
//! exchange. `ResponseTooLarge` is checked against each `Change`'s cumulative
//! length as it arrives, not only once the full response is buffered.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::collaborators::{ChatEvent, Collaborators};
use crate::config::{LLM_TIMEOUT, MAX_LLM_RESPONSE_CHARS};
use crate::context::{ExecutionContext, NodeOutput};
use crate::error::{Error, Result};
use crate::model::Node;
use crate::template;

pub async fn execute(
    node: &Node,
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
    cancellation: &CancellationToken,
) -> Result<NodeOutput> {
    let substituted =
        template::substitute_with(&node.data.content, &node.id, ctx, template::sanitize_for_prompt);
    let prompt = super::require_non_empty(&substituted, Error::EmptyPrompt)?.to_string();

    let mut rx = collaborators
        .chat
        .complete(&prompt, node.data.model.as_deref(), node.data.temperature, node.data.max_tokens)
        .await
        .map_err(|e| Error::LlmError(e.to_string()))?;

    let response = tokio::select! {
        biased;
        _ = cancellation.cancelled() => return Err(Error::Aborted),
        result = tokio::time::timeout(LLM_TIMEOUT, drain_to_completion(&mut rx)) => {
            result.map_err(|_| Error::LlmTimeout)??
        }
    };

    Ok(NodeOutput::Single(response))
}

/// Reads `rx` until `Complete` or `Error`, rejecting as soon as any
/// cumulative `Change` (or the final `Complete`) exceeds the response size
/// limit.
async fn drain_to_completion(rx: &mut mpsc::Receiver<ChatEvent>) -> Result<String> {
    loop {
        match rx.recv().await {
            Some(ChatEvent::Change(text)) => {
                if text.len() > MAX_LLM_RESPONSE_CHARS {
                    return Err(Error::ResponseTooLarge(text.len()));
                }
            }
            Some(ChatEvent::Complete(text)) => {
                if text.len() > MAX_LLM_RESPONSE_CHARS {
                    return Err(Error::ResponseTooLarge(text.len()));
                }
                return Ok(text);
            }
            Some(ChatEvent::Error(message)) => return Err(Error::LlmError(message)),
            None => return Err(Error::LlmError("chat stream ended without completing".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{AutoApprove, EchoChatClient, EmptyContextRetriever, StubChatSession, WordCountTokenCounter};
    use crate::collaborators::ChatClient;
    use crate::model::{Edge, NodeData, NodeKind};
    use std::sync::Arc;

    struct NullTerminal;

    #[async_trait::async_trait]
    impl crate::collaborators::Terminal for NullTerminal {
        async fn run(&self, _command: &str, _cancellation: &CancellationToken) -> Result<crate::collaborators::TerminalOutput> {
            unreachable!("LLM nodes never touch the terminal")
        }
    }

    /// Streams a fixed sequence of `ChatEvent`s, ignoring the prompt.
    struct ScriptedChatClient {
        events: Vec<ChatEvent>,
    }

    #[async_trait::async_trait]
    impl ChatClient for ScriptedChatClient {
        async fn complete(
            &self,
            _prompt: &str,
            _model: Option<&str>,
            _temperature: Option<f32>,
            _max_tokens: Option<u32>,
        ) -> Result<mpsc::Receiver<ChatEvent>> {
            let (tx, rx) = mpsc::channel(self.events.len().max(1));
            for event in &self.events {
                let _ = tx.send(event.clone()).await;
            }
            Ok(rx)
        }
    }

    fn collaborators() -> Collaborators {
        Collaborators {
            chat: Arc::new(EchoChatClient),
            context: Arc::new(EmptyContextRetriever),
            approval: Arc::new(AutoApprove),
            tokens: Arc::new(WordCountTokenCounter),
            terminal: Arc::new(NullTerminal),
            chat_session: Arc::new(StubChatSession::new("sess-stub")),
        }
    }

    fn collaborators_with_chat(chat: Arc<dyn ChatClient>) -> Collaborators {
        Collaborators { chat, ..collaborators() }
    }

    #[tokio::test]
    async fn completes_substituted_prompt() {
        let node = Node::new("n1", NodeKind::Llm, NodeData::new("summarize this"));
        let edges: Vec<Edge> = vec![];
        let mut ctx = ExecutionContext::new(&edges);
        let collab = collaborators();
        let token = CancellationToken::new();
        let out = execute(&node, &mut ctx, &collab, &token).await.unwrap();
        assert_eq!(out, NodeOutput::Single("echo: summarize this".to_string()));
    }

    #[tokio::test]
    async fn empty_prompt_after_substitution_errors() {
        let node = Node::new("n1", NodeKind::Llm, NodeData::new("  "));
        let edges: Vec<Edge> = vec![];
        let mut ctx = ExecutionContext::new(&edges);
        let collab = collaborators();
        let token = CancellationToken::new();
        let err = execute(&node, &mut ctx, &collab, &token).await.unwrap_err();
        assert!(matches!(err, Error::EmptyPrompt));
    }

    #[tokio::test]
    async fn cancellation_surfaces_as_aborted() {
        let node = Node::new("n1", NodeKind::Llm, NodeData::new("hang on"));
        let edges: Vec<Edge> = vec![];
        let mut ctx = ExecutionContext::new(&edges);
        let collab = collaborators();
        let token = CancellationToken::new();
        token.cancel();
        let err = execute(&node, &mut ctx, &collab, &token).await.unwrap_err();
        assert!(err.is_aborted());
    }

    #[tokio::test]
    async fn change_events_are_ignored_until_complete() {
        let node = Node::new("n1", NodeKind::Llm, NodeData::new("summarize this"));
        let edges: Vec<Edge> = vec![];
        let mut ctx = ExecutionContext::new(&edges);
        let collab = collaborators_with_chat(Arc::new(ScriptedChatClient {
            events: vec![
                ChatEvent::Change("partial".to_string()),
                ChatEvent::Change("partial answer".to_string()),
                ChatEvent::Complete("partial answer.".to_string()),
            ],
        }));
        let token = CancellationToken::new();
        let out = execute(&node, &mut ctx, &collab, &token).await.unwrap();
        assert_eq!(out, NodeOutput::Single("partial answer.".to_string()));
    }

    #[tokio::test]
    async fn oversized_change_rejects_before_buffering_the_full_response() {
        let node = Node::new("n1", NodeKind::Llm, NodeData::new("summarize this"));
        let edges: Vec<Edge> = vec![];
        let mut ctx = ExecutionContext::new(&edges);
        let huge = "x".repeat(crate::config::MAX_LLM_RESPONSE_CHARS + 1);
        let collab = collaborators_with_chat(Arc::new(ScriptedChatClient {
            events: vec![ChatEvent::Change(huge), ChatEvent::Complete("short".to_string())],
        }));
        let token = CancellationToken::new();
        let err = execute(&node, &mut ctx, &collab, &token).await.unwrap_err();
        assert!(matches!(err, Error::ResponseTooLarge(_)));
    }

    #[tokio::test]
    async fn backend_error_event_surfaces_as_llm_error() {
        let node = Node::new("n1", NodeKind::Llm, NodeData::new("summarize this"));
        let edges: Vec<Edge> = vec![];
        let mut ctx = ExecutionContext::new(&edges);
        let collab = collaborators_with_chat(Arc::new(ScriptedChatClient {
            events: vec![ChatEvent::Error("backend rejected the prompt".to_string())],
        }));
        let token = CancellationToken::new();
        let err = execute(&node, &mut ctx, &collab, &token).await.unwrap_err();
        assert!(matches!(err, Error::LlmError(_)));
    }

    #[tokio::test]
    async fn stream_closing_without_completion_is_an_llm_error() {
        let node = Node::new("n1", NodeKind::Llm, NodeData::new("summarize this"));
        let edges: Vec<Edge> = vec![];
        let mut ctx = ExecutionContext::new(&edges);
        let collab = collaborators_with_chat(Arc::new(ScriptedChatClient { events: vec![] }));
        let token = CancellationToken::new();
        let err = execute(&node, &mut ctx, &collab, &token).await.unwrap_err();
        assert!(matches!(err, Error::LlmError(_)));
    }
}
