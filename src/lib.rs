pub mod build;
pub mod chat;
pub mod config;
pub mod player;
pub mod trace;
pub mod util;
pub mod workspace;

pub use build::{BuildError, BuildHandle, BuildOrchestrator, TraceProducer, TracerRegistry};
pub use chat::{AiSyncLoop, ChatAction, ChatError, ChatId, ChatService, ChatSyncConfig};
pub use config::Config;
pub use player::{PlaybackController, PlaybackSpeed, PlaybackStatus};
pub use trace::{chunk_commands, Chunk, Command};
pub use workspace::{ErrorReporter, File, FileStore, HostError, MemoryWorkspace, TraceStore};
