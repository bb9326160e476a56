//! CLI entry point: run a workflow document from a JSON file on disk.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tokio::sync::mpsc;

use flowgraph_core::collaborators::{
    ApprovalHandler, ChatClient, ChatEvent, ChatSession, Collaborators, ContextItem, ContextRetriever, TokenCounter,
};
use flowgraph_core::driver::{self, ProgressEvent};
use flowgraph_core::error::Result;
use flowgraph_core::persistent_shell::PersistentShell;
use flowgraph_core::shell;
use flowgraph_core::workflow;

struct UnimplementedChatClient;

#[async_trait::async_trait]
impl ChatClient for UnimplementedChatClient {
    async fn complete(
        &self,
        _prompt: &str,
        _model: Option<&str>,
        _temperature: Option<f32>,
        _max_tokens: Option<u32>,
    ) -> Result<mpsc::Receiver<ChatEvent>> {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(ChatEvent::Error("no chat client configured for this run".to_string()))
            .await;
        Ok(rx)
    }
}

struct UnimplementedChatSession;

#[async_trait::async_trait]
impl ChatSession for UnimplementedChatSession {
    async fn continue_session(
        &self,
        _text: &str,
        _context_items: &[ContextItem],
        _cancellation: &tokio_util::sync::CancellationToken,
    ) -> Result<String> {
        Err(flowgraph_core::error::Error::LlmError(
            "no chat session configured for this run".to_string(),
        ))
    }
}

struct NoContextRetriever;

#[async_trait::async_trait]
impl ContextRetriever for NoContextRetriever {
    async fn retrieve(&self, _query: &str, _local_remote: bool) -> Result<Vec<ContextItem>> {
        Ok(vec![])
    }
}

struct AutoApproveHandler;

#[async_trait::async_trait]
impl ApprovalHandler for AutoApproveHandler {
    async fn request_approval(&self, node_id: &str, command: &str) -> Result<Option<String>> {
        tracing::info!(node_id, command, "auto-approving CLI node (no interactive approval handler wired)");
        Ok(Some(command.to_string()))
    }
}

struct WhitespaceTokenCounter;

#[async_trait::async_trait]
impl TokenCounter for WhitespaceTokenCounter {
    async fn count(&self, text: &str) -> Result<u32> {
        Ok(text.split_whitespace().count() as u32)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("usage: workflow-run <workflow.json>"))?;

    let raw = std::fs::read_to_string(&path)?;
    let document = workflow::parse_workflow(&raw)?;

    let shell = shell::default_user_shell();
    let collaborators = Collaborators {
        chat: Arc::new(UnimplementedChatClient),
        context: Arc::new(NoContextRetriever),
        approval: Arc::new(AutoApproveHandler),
        tokens: Arc::new(WhitespaceTokenCounter),
        terminal: Arc::new(PersistentShell::new(shell)),
        chat_session: Arc::new(UnimplementedChatSession),
    };

    let cancellation = CancellationToken::new();
    {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancellation.cancel();
            }
        });
    }

    let result = driver::run(&document, &collaborators, &cancellation, |event| match event {
        ProgressEvent::ExecutionStarted { node_count, edge_count } => {
            tracing::info!(node_count, edge_count, "execution_started");
        }
        ProgressEvent::NodeExecutionStatus { node_id, status, message } => {
            tracing::info!(node_id, ?status, ?message, "node_execution_status");
        }
        ProgressEvent::TokenCount { node_id, tokens } => {
            tracing::info!(node_id, tokens, "token_count");
        }
        ProgressEvent::ExecutionCompleted => {
            tracing::info!("execution_completed");
        }
    })
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) => Err(anyhow::anyhow!(err)),
    }
}
