//! AI chat sessions that edit the workspace

pub mod action;
pub mod error;
pub mod http;
pub mod mock;
pub mod service;
pub mod sync_loop;

pub use action::{ChatAction, ChatId, NewChatRequest};
pub use error::ChatError;
pub use http::HttpChatService;
pub use mock::MockChatService;
pub use service::ChatService;
pub use sync_loop::{
    AiSyncLoop, ChatSyncConfig, ChatSyncHandle, SingleFlightPolicy, SyncOutcome, SyncReport,
    TransportFailurePolicy,
};
