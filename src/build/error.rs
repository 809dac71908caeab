use thiserror::Error;

/// Failure of a build (source file -> trace)
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// The request was superseded by a newer build. Never surfaced to the host.
    #[error("Build cancelled")]
    Cancelled,

    #[error("Language Not Supported: .{0}")]
    UnsupportedLanguage(String),

    /// The tracer backend rejected the code or failed while tracing it
    #[error("Tracer backend error: {0}")]
    Backend(String),

    #[error("Tracer transport error: {0}")]
    Transport(String),

    /// The produced trace could not be decoded into commands
    #[error("Invalid trace: {0}")]
    InvalidTrace(String),
}

impl BuildError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}

impl From<reqwest::Error> for BuildError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BuildError::InvalidTrace(err.to_string())
        } else {
            BuildError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(err: serde_json::Error) -> Self {
        BuildError::InvalidTrace(err.to_string())
    }
}
