use thiserror::Error;

/// Failure talking to the chat backend or managing a sync session
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("Chat transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("Chat backend error: {0}")]
    Backend(String),

    #[error("Failed to decode chat response: {0}")]
    Decode(String),

    /// A session for this file is still syncing and the loop refuses a second one
    #[error("A chat session is already active for {0}")]
    SessionActive(String),

    #[error("Chat session cancelled")]
    Cancelled,
}

impl ChatError {
    /// Whether the failure is worth retrying under a retry policy
    pub fn is_transient(&self) -> bool {
        matches!(self, ChatError::Transport(_) | ChatError::Backend(_))
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChatError::Decode(err.to_string())
        } else {
            ChatError::Transport(err.to_string())
        }
    }
}
