use thiserror::Error;

use crate::build::BuildError;
use crate::chat::{ChatError, ChatId};

/// An error surfaced to the host's error-reporting channel
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("{error}")]
    Chat {
        /// Session the failure belongs to, if one was created
        chat_id: Option<ChatId>,
        error: ChatError,
    },
}

impl HostError {
    pub fn chat(chat_id: Option<ChatId>, error: ChatError) -> Self {
        HostError::Chat { chat_id, error }
    }
}

/// Host hook receiving every user-visible failure
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: HostError);
}

/// Reporter that only writes the failure to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: HostError) {
        match &error {
            HostError::Build(e) => tracing::error!(error = %e, "Build failed"),
            HostError::Chat { chat_id, error } => match chat_id {
                Some(id) => tracing::error!(chat_id = %id, error = %error, "Chat sync failed"),
                None => tracing::error!(error = %error, "Chat sync failed"),
            },
        }
    }
}
