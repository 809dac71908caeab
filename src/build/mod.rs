//! Turning source files into traces.

pub mod error;
pub mod http;
pub mod local;
pub mod mock;
pub mod orchestrator;
pub mod producer;

use std::sync::Arc;

pub use error::BuildError;
pub use http::HttpTraceProducer;
pub use local::{JsonTraceProducer, MarkdownProducer};
pub use mock::{MockTraceProducer, MockTraceResponse};
pub use orchestrator::{BuildHandle, BuildOrchestrator};
pub use producer::{TraceProducer, TracerRegistry};

use crate::config::TracerConfig;

/// Registry with the built-in local producers plus one remote producer per
/// configured language.
pub fn registry_from_config(config: &TracerConfig) -> Result<TracerRegistry, BuildError> {
    let mut registry = TracerRegistry::new()
        .with("md", Arc::new(MarkdownProducer))
        .with("json", Arc::new(JsonTraceProducer));

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| BuildError::Transport(format!("failed to build HTTP client: {e}")))?;

    for language in &config.remote_languages {
        if registry.supports(language) {
            tracing::warn!(language = %language, "Remote tracer shadows built-in producer");
        }
        let producer = HttpTraceProducer::with_client(&config.base_url, language.as_str(), client.clone());
        registry.register(language.as_str(), Arc::new(producer));
    }

    tracing::debug!(extensions = ?registry.extensions(), "Tracer registry ready");
    Ok(registry)
}
