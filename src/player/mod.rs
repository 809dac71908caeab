//! Trace playback: cursor navigation and timed auto-advance.

pub mod controller;
pub mod speed;

pub use controller::{PlaybackController, PlaybackStatus};
pub use speed::PlaybackSpeed;
