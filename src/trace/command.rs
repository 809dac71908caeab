use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method name of the control marker that separates playback steps.
pub const DELAY_METHOD: &str = "delay";

/// A single recorded tracer operation.
///
/// Mirrors the wire shape produced by tracer backends:
/// `{"key": "array" | null, "method": "patch", "args": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Tracer the command targets (`None` for global commands)
    #[serde(default)]
    pub key: Option<String>,
    /// Operation name
    pub method: String,
    /// Positional arguments
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Command {
    pub fn new(key: Option<&str>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            key: key.map(String::from),
            method: method.into(),
            args,
        }
    }

    /// Build a delay marker for the given source line
    pub fn delay(line_number: u32) -> Self {
        Self::new(None, DELAY_METHOD, vec![Value::from(line_number)])
    }

    /// True for the `{key: null, method: "delay"}` control marker.
    pub fn is_delay_marker(&self) -> bool {
        self.key.is_none() && self.method == DELAY_METHOD
    }

    /// Source line carried by a delay marker.
    ///
    /// Returns `None` for ordinary commands and for markers whose first
    /// argument is missing or not a non-negative integer.
    pub fn delay_line(&self) -> Option<u32> {
        if !self.is_delay_marker() {
            return None;
        }
        self.args
            .first()
            .and_then(Value::as_u64)
            .and_then(|line| u32::try_from(line).ok())
    }
}
