//! Mutation interfaces the core requires from the host's workspace store.
//!
//! The store is owned by the host; the player, build orchestrator and AI
//! sync loop only push updates through these verbs. Implementations use
//! interior mutability because updates arrive from spawned tasks.
//!
//! [`TraceStore`] verbs are called while the player's state lock is held
//! (and, when a build lands, the orchestrator's lock too). An implementation
//! must not call back into the [`PlaybackController`] or
//! [`BuildOrchestrator`] that feeds it: the locks are not re-entrant and the
//! call would deadlock. Derive the line indicator from the published chunks
//! and cursor instead, or hand the work off to another task.
//!
//! [`PlaybackController`]: crate::player::PlaybackController
//! [`BuildOrchestrator`]: crate::build::BuildOrchestrator

use crate::trace::Chunk;

use super::file::File;

/// Playback state published by the player.
///
/// Called under the player lock; see the module docs.
pub trait TraceStore: Send + Sync {
    /// Replace the whole trace
    fn set_chunks(&self, chunks: Vec<Chunk>);

    /// Move the displayed step (`0` = nothing displayed yet)
    fn set_cursor(&self, cursor: usize);

    /// Highlight a source line, or clear the highlight
    fn set_line_indicator(&self, line: Option<u32>);
}

/// Workspace file mutations driven by the AI sync loop
pub trait FileStore: Send + Sync {
    fn add_file(&self, file: File);

    /// Append `text` to the file named `file_name`. Unknown names are ignored.
    fn append_file(&self, file_name: &str, text: &str);

    /// Make `file` the active editing file
    fn set_editing_file(&self, file: File);
}
