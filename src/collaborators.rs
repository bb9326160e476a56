//! Collaborator interfaces (spec.md §6): the engine depends on these traits,
//! never on a concrete chat client, retriever, or terminal, so embedders can
//! supply their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// One retrieved context item, as returned by a [`ContextRetriever`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub uri: String,
    pub content: String,
}

/// A streamed chat event (spec.md §4.F.2): `Change` carries the cumulative
/// text observed so far (not a delta), `Complete` the final text, `Error` a
/// terminal failure reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Change(String),
    Complete(String),
    Error(String),
}

/// Chat completion backend used by `LLM` nodes. Streams `ChatEvent`s back to
/// the caller over a channel as the response is generated, mirroring the
/// teacher's `StreamCallback` pattern, rather than blocking until the whole
/// response is buffered.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        model: Option<&str>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<mpsc::Receiver<ChatEvent>>;
}

/// Context retrieval backend used by `SEARCH_CONTEXT` nodes.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, local_remote: bool) -> Result<Vec<ContextItem>>;
}

/// Human-in-the-loop approval gate used by `CLI` nodes whose
/// `needsUserApproval` is set.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    /// Returns the (possibly user-modified) command to run, or `None` if the
    /// user rejected it.
    async fn request_approval(&self, node_id: &str, command: &str) -> Result<Option<String>>;
}

/// Token counting backend used to emit `token_count` progress events.
#[async_trait]
pub trait TokenCounter: Send + Sync {
    async fn count(&self, text: &str) -> Result<u32>;
}

/// Interactive shell backend: the engine's only outward-facing process I/O
/// surface. A production [`Terminal`] wraps [`crate::persistent_shell::PersistentShell`];
/// tests substitute a fake.
#[async_trait]
pub trait Terminal: Send + Sync {
    async fn run(&self, command: &str, cancellation: &CancellationToken) -> Result<TerminalOutput>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerminalOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// An ongoing chat conversation used by `CODY_OUTPUT` nodes to hand text and
/// retrieved context off to a chat UI, as distinct from the one-shot
/// completions `ChatClient` serves to `LLM` nodes.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Sends `text` plus `context_items` into the session, resolving with the
    /// session's identifier once its first new assistant message is
    /// observed. Cancellation aborts the chat.
    async fn continue_session(
        &self,
        text: &str,
        context_items: &[ContextItem],
        cancellation: &CancellationToken,
    ) -> Result<String>;
}

/// Bundles every collaborator a node executor might need. Node executors
/// take `&Collaborators` rather than each trait individually so adding a new
/// dependency doesn't ripple through every executor's signature.
pub struct Collaborators {
    pub chat: std::sync::Arc<dyn ChatClient>,
    pub context: std::sync::Arc<dyn ContextRetriever>,
    pub approval: std::sync::Arc<dyn ApprovalHandler>,
    pub tokens: std::sync::Arc<dyn TokenCounter>,
    pub terminal: std::sync::Arc<dyn Terminal>,
    pub chat_session: std::sync::Arc<dyn ChatSession>,
}
