use async_trait::async_trait;

use super::action::{ChatAction, ChatId, NewChatRequest};
use super::error::ChatError;

/// Backend hosting AI chat sessions.
///
/// A session is opened once per `call_ai` and then polled until it emits a
/// terminal action.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Open a session about one file
    async fn create_session(&self, request: &NewChatRequest) -> Result<ChatId, ChatError>;

    /// Fetch the actions emitted since the previous poll, in order
    async fn poll_session(&self, chat_id: &ChatId) -> Result<Vec<ChatAction>, ChatError>;
}
