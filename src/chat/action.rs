//! Chat wire types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned chat session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload that opens a chat session about one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewChatRequest {
    pub name: String,
    pub content: String,
}

/// One workspace-mutating instruction emitted by a chat session.
///
/// Tagged on the wire by `type`. Unrecognized types decode as
/// [`ChatAction::Unknown`] so a newer server cannot break older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatAction {
    #[serde(rename_all = "camelCase")]
    FileCreate {
        file_name: String,
        #[serde(default)]
        select: bool,
    },
    #[serde(rename_all = "camelCase")]
    FileAppend { file_name: String, appends: String },
    ChatGenEnd,
    Log {
        #[serde(default)]
        msg: String,
    },
    Error {
        #[serde(default)]
        msg: String,
    },
    #[serde(other)]
    Unknown,
}

impl ChatAction {
    /// Whether applying this action ends the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ChatGenEnd | Self::Error { .. })
    }
}
