//! Remote tracer backend
//!
//! `POST {base_url}/tracers/{language}` with `{"code": "..."}` answers with
//! the recorded command list as a JSON array.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::trace::Command;

use super::error::BuildError;
use super::producer::TraceProducer;

#[derive(Debug, Serialize)]
struct TraceRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpTraceProducer {
    language: String,
    url: String,
    client: Client,
}

impl HttpTraceProducer {
    pub fn new(
        base_url: &str,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BuildError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BuildError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(base_url, language, client))
    }

    pub fn with_client(base_url: &str, language: impl Into<String>, client: Client) -> Self {
        let language = language.into();
        let url = format!("{}/tracers/{}", base_url.trim_end_matches('/'), language);
        Self {
            language,
            url,
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, code: &str) -> Result<Vec<Command>, BuildError> {
        let response = self
            .client
            .post(&self.url)
            .json(&TraceRequest { code })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BuildError::Backend(format!("{status} - {text}")));
        }

        Ok(response.json::<Vec<Command>>().await?)
    }
}

#[async_trait]
impl TraceProducer for HttpTraceProducer {
    fn language(&self) -> &str {
        &self.language
    }

    async fn produce(
        &self,
        code: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<Command>, BuildError> {
        tracing::debug!(language = %self.language, url = %self.url, "Requesting trace");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BuildError::Cancelled),
            result = self.request(code) => result,
        }
    }
}
