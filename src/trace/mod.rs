//! Trace model: recorded tracer commands and their grouping into playback steps.

pub mod chunker;
pub mod command;

pub use chunker::{chunk_commands, Chunk};
pub use command::{Command, DELAY_METHOD};
