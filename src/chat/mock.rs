//! Mock chat service for deterministic testing
//!
//! Sessions get sequential ids (`chat-1`, `chat-2`, ...). Poll responses are
//! served from one shared script in order; once it runs out every poll
//! answers with no actions.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::action::{ChatAction, ChatId, NewChatRequest};
use super::error::ChatError;
use super::service::ChatService;

/// A captured poll call
#[derive(Debug, Clone)]
pub struct PollRecord {
    pub chat_id: ChatId,
    pub at: Instant,
}

#[derive(Default)]
struct MockState {
    create_failures: VecDeque<ChatError>,
    polls: VecDeque<Result<Vec<ChatAction>, ChatError>>,
    next_session: u64,
    created: Vec<NewChatRequest>,
    polled: Vec<PollRecord>,
}

#[derive(Clone, Default)]
pub struct MockChatService {
    state: Arc<Mutex<MockState>>,
}

impl MockChatService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue actions for the next unanswered poll
    pub fn with_poll(self, actions: Vec<ChatAction>) -> Self {
        self.state.lock().polls.push_back(Ok(actions));
        self
    }

    /// Queue a failure for the next unanswered poll
    pub fn with_poll_failure(self, error: ChatError) -> Self {
        self.state.lock().polls.push_back(Err(error));
        self
    }

    /// Fail the next session creation
    pub fn with_create_failure(self, error: ChatError) -> Self {
        self.state.lock().create_failures.push_back(error);
        self
    }

    pub fn created(&self) -> Vec<NewChatRequest> {
        self.state.lock().created.clone()
    }

    pub fn polls(&self) -> Vec<PollRecord> {
        self.state.lock().polled.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.state.lock().polled.len()
    }
}

#[async_trait]
impl ChatService for MockChatService {
    async fn create_session(&self, request: &NewChatRequest) -> Result<ChatId, ChatError> {
        let mut state = self.state.lock();
        state.created.push(request.clone());
        if let Some(error) = state.create_failures.pop_front() {
            return Err(error);
        }
        state.next_session += 1;
        Ok(ChatId::new(format!("chat-{}", state.next_session)))
    }

    async fn poll_session(&self, chat_id: &ChatId) -> Result<Vec<ChatAction>, ChatError> {
        let mut state = self.state.lock();
        state.polled.push(PollRecord {
            chat_id: chat_id.clone(),
            at: Instant::now(),
        });
        state.polls.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}
