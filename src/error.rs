//! Error taxonomy for the workflow engine.
//!
//! Mirrors the teacher's `Error`/`Result` split: one flat `thiserror` enum,
//! `#[from]` conversions for the handful of upstream error types we actually
//! propagate, and a crate-wide `Result` alias. See spec.md §7 for the
//! authoritative list of error kinds and their fatality.

use thiserror::Error;

/// Errors surfaced by graph composition, scheduling, substitution, node
/// execution, and the persistent shell.
#[derive(Error, Debug)]
pub enum Error {
    /// A CLI/LLM template substituted down to nothing.
    #[error("command is empty after substitution")]
    EmptyCommand,

    #[error("prompt is empty after substitution")]
    EmptyPrompt,

    /// The resolved command's first token is on the security deny-list.
    #[error("Cody cannot execute this command: {0}")]
    DisallowedCommand(String),

    #[error("shell command timed out after {0:?}")]
    ShellTimeout(std::time::Duration),

    #[error("shell failure: {0}")]
    ShellFailure(String),

    #[error("LLM call timed out")]
    LlmTimeout,

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("LLM response exceeded maximum size ({0} characters)")]
    ResponseTooLarge(usize),

    /// Derived from the shared cancellation signal; the driver reports this
    /// as `interrupted` rather than `error` (spec.md §7).
    #[error("aborted")]
    Aborted,

    #[error("unknown node kind for node {0}")]
    UnknownNodeKind(String),

    #[error("graph composition error: {0}")]
    Composition(String),

    #[error("node {0} references a missing upstream node")]
    MissingNode(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the driver should frame this as `interrupted` instead of
    /// `error` (spec.md §7: "or `interrupted` if the message contains
    /// `\"aborted\"`").
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted) || self.to_string().contains("aborted")
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
