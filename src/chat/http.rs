//! HTTP chat backend
//!
//! - `POST {base_url}/chat/new` with `{name, content}` answers `{"chatId": "..."}`
//! - `POST {base_url}/chat/sync` with `{"chatId": "..."}` answers an array of actions

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::action::{ChatAction, ChatId, NewChatRequest};
use super::error::ChatError;
use super::service::ChatService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewChatResponse {
    chat_id: ChatId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest<'a> {
    chat_id: &'a ChatId,
}

/// Client for the chat HTTP API
#[derive(Debug, Clone)]
pub struct HttpChatService {
    base_url: String,
    client: Client,
}

impl HttpChatService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ChatError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Backend(format!("{status} - {text}")));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn create_session(&self, request: &NewChatRequest) -> Result<ChatId, ChatError> {
        let response: NewChatResponse = self.post("/chat/new", request).await?;
        Ok(response.chat_id)
    }

    async fn poll_session(&self, chat_id: &ChatId) -> Result<Vec<ChatAction>, ChatError> {
        self.post("/chat/sync", &SyncRequest { chat_id }).await
    }
}
