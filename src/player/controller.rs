//! Step-by-step trace playback
//!
//! The controller owns the chunk list, the cursor and the auto-advance
//! timer, and mirrors every change into the host's [`TraceStore`].
//!
//! Cursor `0` is the pre-start position (nothing displayed); playable
//! positions are `1..=len`. Every navigation call cancels the armed timer
//! first, so a manual step never races an automatic one. A timer that was
//! cancelled after it had already woken up is recognised by its id and
//! ignored.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::trace::{chunk_commands, Chunk, Command};
use crate::workspace::TraceStore;

use super::speed::PlaybackSpeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// No timer armed
    Paused,
    /// Auto-advance timer armed
    Playing,
}

struct ArmedTimer {
    id: u64,
    task: JoinHandle<()>,
}

struct PlayerState {
    chunks: Vec<Chunk>,
    cursor: usize,
    speed: PlaybackSpeed,
    timer: Option<ArmedTimer>,
    next_timer_id: u64,
}

impl PlayerState {
    fn is_valid_cursor(&self, cursor: usize) -> bool {
        (1..=self.chunks.len()).contains(&cursor)
    }

    /// Returns true if a timer was armed
    fn cancel_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.task.abort();
                tracing::trace!(timer_id = timer.id, "Playback timer cancelled");
                true
            }
            None => false,
        }
    }
}

struct Inner {
    state: Mutex<PlayerState>,
    store: Arc<dyn TraceStore>,
}

/// Cursor state machine over a chunked trace, with timed auto-advance.
///
/// Cloning yields another handle to the same player.
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<Inner>,
}

impl PlaybackController {
    /// Create a player in the "no trace loaded" state
    pub fn new(store: Arc<dyn TraceStore>) -> Self {
        Self::with_speed(store, PlaybackSpeed::default())
    }

    pub fn with_speed(store: Arc<dyn TraceStore>, speed: PlaybackSpeed) -> Self {
        let controller = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(PlayerState {
                    chunks: Vec::new(),
                    cursor: 0,
                    speed,
                    timer: None,
                    next_timer_id: 0,
                }),
                store,
            }),
        };
        controller.reset(Vec::new());
        controller
    }

    /// Install a new trace, replacing the previous one.
    ///
    /// Chunks `commands`, rewinds to the pre-start cursor, stops playback
    /// and clears the line indicator. Returns the number of chunks.
    pub fn reset(&self, commands: Vec<Command>) -> usize {
        let mut state = self.inner.state.lock();
        self.reset_locked(&mut state, commands)
    }

    fn reset_locked(&self, state: &mut PlayerState, commands: Vec<Command>) -> usize {
        let chunks = chunk_commands(commands);
        let len = chunks.len();
        state.chunks = chunks.clone();
        state.cursor = 0;
        state.cancel_timer();

        let store = &self.inner.store;
        store.set_chunks(chunks);
        store.set_cursor(0);
        store.set_line_indicator(None);

        tracing::debug!(chunks = len, "Trace installed");
        len
    }

    /// Step back one chunk. Returns false (and changes nothing) at the first chunk.
    pub fn prev(&self) -> bool {
        let mut state = self.inner.state.lock();
        state.cancel_timer();
        match state.cursor.checked_sub(1) {
            Some(cursor) if state.is_valid_cursor(cursor) => {
                self.move_to(&mut state, cursor);
                true
            }
            _ => false,
        }
    }

    /// Step forward one chunk. Returns false (and changes nothing) at the last chunk.
    pub fn next(&self) -> bool {
        let mut state = self.inner.state.lock();
        self.next_locked(&mut state)
    }

    fn next_locked(&self, state: &mut PlayerState) -> bool {
        state.cancel_timer();
        let cursor = state.cursor + 1;
        if !state.is_valid_cursor(cursor) {
            return false;
        }
        self.move_to(state, cursor);
        true
    }

    /// Start (or continue) auto-advancing.
    ///
    /// Steps forward; at the end, `wrap` restarts from the first chunk.
    /// On success a one-shot timer is armed that resumes again without
    /// wrapping. Returns whether the cursor moved; without a Tokio runtime
    /// no timer can be armed and the player stays paused.
    pub fn resume(&self, wrap: bool) -> bool {
        let mut state = self.inner.state.lock();
        self.resume_locked(&mut state, wrap)
    }

    fn resume_locked(&self, state: &mut PlayerState, wrap: bool) -> bool {
        state.cancel_timer();
        let stepped = self.next_locked(state) || (wrap && self.rewind_locked(state));
        if stepped {
            self.arm_timer(state);
        }
        stepped
    }

    fn rewind_locked(&self, state: &mut PlayerState) -> bool {
        if state.chunks.is_empty() {
            return false;
        }
        self.move_to(state, 1);
        true
    }

    fn arm_timer(&self, state: &mut PlayerState) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime available, playback stays paused");
                return;
            }
        };

        let id = state.next_timer_id;
        state.next_timer_id += 1;
        let delay = state.speed.interval();
        let controller = self.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            controller.on_timer(id);
        });

        tracing::trace!(timer_id = id, delay_ms = delay.as_millis() as u64, "Playback timer armed");
        state.timer = Some(ArmedTimer { id, task });
    }

    fn on_timer(&self, id: u64) {
        let mut state = self.inner.state.lock();
        if !state.timer.as_ref().is_some_and(|timer| timer.id == id) {
            tracing::trace!(timer_id = id, "Ignoring stale playback timer");
            return;
        }
        state.timer = None;
        self.resume_locked(&mut state, false);
    }

    /// Stop auto-advancing. Idempotent.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        if state.cancel_timer() {
            tracing::debug!(cursor = state.cursor, "Playback paused");
        }
    }

    /// Jump to a fraction of the trace (`0.0..=1.0`), clamped to a playable chunk.
    pub fn seek(&self, progress: f64) {
        let mut state = self.inner.state.lock();
        state.cancel_timer();

        let len = state.chunks.len();
        if len == 0 {
            return;
        }
        let target = (progress * len as f64).round();
        let cursor = if target.is_nan() {
            1
        } else {
            target.clamp(1.0, len as f64) as usize
        };
        self.move_to(&mut state, cursor);
    }

    /// Change the speed used by the next `resume`. An armed timer keeps its delay.
    pub fn set_speed(&self, value: f64) {
        self.inner.state.lock().speed = PlaybackSpeed::new(value);
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.inner.state.lock().speed
    }

    pub fn status(&self) -> PlaybackStatus {
        if self.inner.state.lock().timer.is_some() {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Paused
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    pub fn cursor(&self) -> usize {
        self.inner.state.lock().cursor
    }

    /// Number of chunks in the installed trace
    pub fn len(&self) -> usize {
        self.inner.state.lock().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn can_prev(&self) -> bool {
        let state = self.inner.state.lock();
        state
            .cursor
            .checked_sub(1)
            .is_some_and(|c| state.is_valid_cursor(c))
    }

    pub fn can_next(&self) -> bool {
        let state = self.inner.state.lock();
        state.is_valid_cursor(state.cursor + 1)
    }

    /// Chunk at the cursor (`None` before the first step)
    pub fn current_chunk(&self) -> Option<Chunk> {
        let state = self.inner.state.lock();
        state
            .cursor
            .checked_sub(1)
            .and_then(|idx| state.chunks.get(idx))
            .cloned()
    }

    /// Cursor as a fraction of the trace length
    pub fn progress(&self) -> f64 {
        let state = self.inner.state.lock();
        if state.chunks.is_empty() {
            0.0
        } else {
            state.cursor as f64 / state.chunks.len() as f64
        }
    }

    fn move_to(&self, state: &mut PlayerState, cursor: usize) {
        state.cursor = cursor;
        self.inner.store.set_cursor(cursor);
    }
}
