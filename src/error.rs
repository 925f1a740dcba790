//! Error taxonomy shared by the session, conversation and library layers.

use thiserror::Error;

/// Errors surfaced by client operations.
///
/// A forced sign-out after a failed identity check never shows up here; the
/// session manager performs it as a state transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Rejected locally before any request was issued
    #[error("{0}")]
    Validation(String),

    /// The service answered with a structured `detail` message
    #[error("{detail}")]
    Remote { status: u16, detail: String },

    /// No response, or a response we could not understand
    #[error("Transport error: {0}")]
    Transport(String),

    /// Local file access failed (credential file, upload source)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn remote(status: u16, detail: impl Into<String>) -> Self {
        Self::Remote {
            status,
            detail: detail.into(),
        }
    }

    pub fn transport(message: impl ToString) -> Self {
        Self::Transport(message.to_string())
    }

    pub fn storage(message: impl ToString) -> Self {
        Self::Storage(message.to_string())
    }

    /// Text to show the user. Validation and remote messages are shown verbatim;
    /// everything else collapses to `fallback` so transport details never leak.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Validation(message) => message.clone(),
            ClientError::Remote { detail, .. } => detail.clone(),
            ClientError::Transport(_) | ClientError::Storage(_) => fallback.to_string(),
        }
    }
}
