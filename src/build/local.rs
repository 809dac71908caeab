//! Producers that trace a file without a backend round-trip.
//!
//! - `md`: renders the document as a single markdown tracer
//! - `json`: the file already contains a recorded command list

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::trace::Command;

use super::error::BuildError;
use super::producer::TraceProducer;

const MARKDOWN_KEY: &str = "markdown";

/// Shows a markdown document as a one-step trace
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownProducer;

#[async_trait]
impl TraceProducer for MarkdownProducer {
    fn language(&self) -> &str {
        "md"
    }

    async fn produce(
        &self,
        code: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<Command>, BuildError> {
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }
        Ok(vec![
            Command::new(
                Some(MARKDOWN_KEY),
                "MarkdownTracer",
                vec![Value::from("Markdown")],
            ),
            Command::new(Some(MARKDOWN_KEY), "set", vec![Value::from(code)]),
            Command::new(None, "setRoot", vec![Value::from(MARKDOWN_KEY)]),
        ])
    }
}

/// Replays a trace stored as JSON in the file itself
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTraceProducer;

#[async_trait]
impl TraceProducer for JsonTraceProducer {
    fn language(&self) -> &str {
        "json"
    }

    async fn produce(
        &self,
        code: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<Command>, BuildError> {
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }
        Ok(serde_json::from_str(code)?)
    }
}
