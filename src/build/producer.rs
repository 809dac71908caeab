use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::trace::Command;

use super::error::BuildError;

/// A backend that turns source code into a trace.
///
/// Implementations must return [`BuildError::Cancelled`] once `cancel`
/// fires, and must not block the caller.
#[async_trait]
pub trait TraceProducer: Send + Sync {
    /// Language identifier, used in logs
    fn language(&self) -> &str;

    async fn produce(
        &self,
        code: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<Command>, BuildError>;
}

/// Lookup table from file extension to trace producer
#[derive(Clone, Default)]
pub struct TracerRegistry {
    producers: HashMap<String, Arc<dyn TraceProducer>>,
}

impl TracerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `producer` for `extension`, replacing any previous entry
    pub fn register(&mut self, extension: impl Into<String>, producer: Arc<dyn TraceProducer>) {
        self.producers.insert(extension.into(), producer);
    }

    pub fn with(mut self, extension: impl Into<String>, producer: Arc<dyn TraceProducer>) -> Self {
        self.register(extension, producer);
        self
    }

    pub fn get(&self, extension: &str) -> Option<Arc<dyn TraceProducer>> {
        self.producers.get(extension).cloned()
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.producers.contains_key(extension)
    }

    /// Registered extensions, sorted
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.producers.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

impl std::fmt::Debug for TracerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}
