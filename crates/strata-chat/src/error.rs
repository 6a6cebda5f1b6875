//! Error types for the turn engine.

use std::time::Duration;

use strata_core::error::StrataError;

/// Errors surfaced to the turn driver.
///
/// Every collaborator failure is caught at the orchestrator boundary and
/// mapped here; a failed turn leaves the chat history untouched.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("collaborator call exceeded {0:?}")]
    Timeout(Duration),
}

impl From<StrataError> for ChatError {
    fn from(err: StrataError) -> Self {
        match err {
            StrataError::Generation(msg) => ChatError::Generation(msg),
            StrataError::Embedding(msg) | StrataError::Index(msg) => ChatError::Retrieval(msg),
            other => ChatError::Generation(other.to_string()),
        }
    }
}
