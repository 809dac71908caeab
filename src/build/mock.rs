//! Mock trace producer for deterministic testing
//!
//! Implements [`TraceProducer`] with scripted responses instead of a real
//! tracer backend, and captures every request for later assertions.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use algoviz::build::mock::{MockTraceProducer, MockTraceResponse};
//! use algoviz::trace::Command;
//!
//! let producer = MockTraceProducer::new("js")
//!     .with_response(MockTraceResponse::commands(vec![Command::delay(1)]).delayed(Duration::from_secs(1)));
//! let _producer = Arc::new(producer);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::trace::Command;

use super::error::BuildError;
use super::producer::TraceProducer;

/// One scripted answer
#[derive(Debug, Clone)]
pub struct MockTraceResponse {
    pub result: Result<Vec<Command>, BuildError>,
    /// Simulated backend latency
    pub delay: Duration,
}

impl MockTraceResponse {
    pub fn commands(commands: Vec<Command>) -> Self {
        Self {
            result: Ok(commands),
            delay: Duration::ZERO,
        }
    }

    pub fn failure(error: BuildError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for MockTraceResponse {
    fn default() -> Self {
        Self::commands(Vec::new())
    }
}

/// Mock producer for testing
///
/// Responses are consumed in order; once the script runs out the fallback
/// response is used for every further call.
pub struct MockTraceProducer {
    language: String,
    script: Mutex<VecDeque<MockTraceResponse>>,
    fallback: MockTraceResponse,
    /// Code of every produce() call
    captured_code: Arc<Mutex<Vec<String>>>,
    /// Number of calls that observed cancellation
    cancelled: Arc<Mutex<usize>>,
}

impl MockTraceProducer {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: MockTraceResponse::default(),
            captured_code: Arc::new(Mutex::new(Vec::new())),
            cancelled: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a response for the next unanswered call
    pub fn with_response(self, response: MockTraceResponse) -> Self {
        self.script.lock().push_back(response);
        self
    }

    /// Response used once the script is exhausted
    pub fn with_fallback(mut self, response: MockTraceResponse) -> Self {
        self.fallback = response;
        self
    }

    pub fn captured_code(&self) -> Vec<String> {
        self.captured_code.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_code.lock().len()
    }

    pub fn cancelled_count(&self) -> usize {
        *self.cancelled.lock()
    }
}

#[async_trait]
impl TraceProducer for MockTraceProducer {
    fn language(&self) -> &str {
        &self.language
    }

    async fn produce(
        &self,
        code: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<Command>, BuildError> {
        self.captured_code.lock().push(code.to_string());
        let response = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                *self.cancelled.lock() += 1;
                Err(BuildError::Cancelled)
            }
            _ = tokio::time::sleep(response.delay) => response.result,
        }
    }
}
