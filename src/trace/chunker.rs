//! Trace chunking
//!
//! Groups a flat command trace into playback steps. Delay markers are the
//! step boundaries: each marker closes the current chunk (recording its
//! source line) and opens a new one. A trace with `n` markers always yields
//! `n + 1` chunks, so even an empty trace produces one empty chunk.

use serde::{Deserialize, Serialize};

use super::command::Command;

/// A group of commands displayed as one playback step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Playable commands (delay markers excluded)
    pub commands: Vec<Command>,
    /// Line of the delay marker that closed this chunk
    pub line_number: Option<u32>,
}

impl Chunk {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Split a trace into chunks, consuming it in order.
pub fn chunk_commands(commands: Vec<Command>) -> Vec<Chunk> {
    let mut chunks = vec![Chunk::default()];
    for command in commands {
        if command.is_delay_marker() {
            if let Some(current) = chunks.last_mut() {
                current.line_number = command.delay_line();
            }
            chunks.push(Chunk::default());
        } else if let Some(current) = chunks.last_mut() {
            current.commands.push(command);
        }
    }
    chunks
}
