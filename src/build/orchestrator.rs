//! Build orchestration: source file -> trace -> player.
//!
//! At most one build is live per orchestrator. Starting a build cancels the
//! previous one before the new request is issued, and a finished build only
//! installs its trace if it is still the live one, so a superseded request
//! can never overwrite newer output even if its producer ignored the
//! cancellation signal.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::player::PlaybackController;
use crate::trace::Command;
use crate::workspace::{ErrorReporter, File, HostError};

use super::error::BuildError;
use super::producer::TracerRegistry;

struct PendingBuild {
    id: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct BuildState {
    pending: Option<PendingBuild>,
    building: bool,
    next_id: u64,
    /// Last editing file seen by `on_editing_file_changed`
    last_editing: Option<File>,
}

struct Inner {
    player: PlaybackController,
    registry: TracerRegistry,
    reporter: Arc<dyn ErrorReporter>,
    state: Mutex<BuildState>,
}

/// Handle to an in-flight build
pub struct BuildHandle {
    id: u64,
    task: JoinHandle<()>,
}

impl BuildHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait until the build has finished (or was discarded as superseded)
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::error!(build_id = self.id, error = %e, "Build task failed");
        }
    }
}

/// Owned by a build task; releases the build slot on exit, unwinding included
struct BuildSlot {
    orchestrator: BuildOrchestrator,
    id: u64,
}

impl Drop for BuildSlot {
    fn drop(&mut self) {
        self.orchestrator.release(self.id);
    }
}

/// Turns files into traces and loads them into the player.
///
/// Cloning yields another handle to the same orchestrator.
#[derive(Clone)]
pub struct BuildOrchestrator {
    inner: Arc<Inner>,
}

impl BuildOrchestrator {
    pub fn new(
        player: PlaybackController,
        registry: TracerRegistry,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                player,
                registry,
                reporter,
                state: Mutex::new(BuildState::default()),
            }),
        }
    }

    pub fn player(&self) -> &PlaybackController {
        &self.inner.player
    }

    pub fn registry(&self) -> &TracerRegistry {
        &self.inner.registry
    }

    /// Whether a build request is in flight
    pub fn is_building(&self) -> bool {
        self.inner.state.lock().building
    }

    pub fn pending_build_id(&self) -> Option<u64> {
        self.inner.state.lock().pending.as_ref().map(|p| p.id)
    }

    /// Build `file` and load the resulting trace.
    ///
    /// Always clears the current trace first. Returns `None` when nothing
    /// was started: no file, or no producer for its extension (reported
    /// through the error hook). Failures of the started build are reported
    /// the same way once it finishes.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(&self, file: Option<&File>) -> Option<BuildHandle> {
        let mut state = self.inner.state.lock();
        self.inner.player.reset(Vec::new());

        let file = file?;

        if let Some(previous) = state.pending.take() {
            previous.cancel.cancel();
            tracing::debug!(build_id = previous.id, "Superseded pending build");
        }

        let id = state.next_id;
        state.next_id += 1;
        let cancel = CancellationToken::new();
        state.pending = Some(PendingBuild {
            id,
            cancel: cancel.clone(),
        });
        state.building = true;

        let extension = file.extension().unwrap_or_default();
        let Some(producer) = self.inner.registry.get(extension) else {
            state.pending = None;
            state.building = false;
            drop(state);

            tracing::warn!(file = %file.name, extension, "No tracer registered for extension");
            self.inner
                .reporter
                .report(BuildError::UnsupportedLanguage(extension.to_string()).into());
            return None;
        };

        tracing::info!(
            build_id = id,
            file = %file.name,
            language = producer.language(),
            "Build started"
        );

        let code = file.content.clone();
        let orchestrator = self.clone();
        let task = tokio::spawn(async move {
            let slot = BuildSlot { orchestrator, id };
            let result = producer.produce(&code, cancel).await;
            slot.orchestrator.finish(id, result);
        });

        Some(BuildHandle { id, task })
    }

    fn finish(&self, id: u64, result: Result<Vec<Command>, BuildError>) {
        let mut state = self.inner.state.lock();
        let is_live = state
            .pending
            .as_ref()
            .is_some_and(|p| p.id == id && !p.cancel.is_cancelled());
        if !is_live {
            tracing::debug!(build_id = id, "Discarding result of superseded build");
            return;
        }

        match result {
            Err(e) if e.is_cancelled() => {
                // Slot is freed when the task's `BuildSlot` drops.
                tracing::debug!(build_id = id, "Build cancelled");
            }
            Ok(commands) => {
                state.pending = None;
                state.building = false;
                // Still under the build lock so a newer build() cannot interleave.
                let chunks = self.inner.player.reset(commands);
                self.inner.player.next();
                tracing::info!(build_id = id, chunks, "Build finished");
            }
            Err(e) => {
                state.pending = None;
                state.building = false;
                drop(state);

                tracing::warn!(build_id = id, error = %e, "Build failed");
                self.inner.reporter.report(HostError::Build(e));
            }
        }
    }

    /// Free the slot of build `id` if it is still pending. Runs after
    /// `finish`, or instead of it when the producer panicked.
    fn release(&self, id: u64) {
        let mut state = self.inner.state.lock();
        if state.pending.as_ref().is_some_and(|p| p.id == id) {
            state.pending = None;
            state.building = false;
            tracing::warn!(build_id = id, "Build ended without a result");
        }
    }

    /// Cancel the in-flight build, if any, leaving the player untouched
    pub fn cancel_pending(&self) {
        let mut state = self.inner.state.lock();
        if let Some(pending) = state.pending.take() {
            pending.cancel.cancel();
            tracing::debug!(build_id = pending.id, "Pending build cancelled");
        }
        state.building = false;
    }

    /// Rebuild when the host's active file changes and its rebuild flag is set.
    pub fn on_editing_file_changed(
        &self,
        file: Option<&File>,
        should_build: bool,
    ) -> Option<BuildHandle> {
        {
            let mut state = self.inner.state.lock();
            if state.last_editing.as_ref() == file {
                return None;
            }
            state.last_editing = file.cloned();
        }

        if should_build {
            self.build(file)
        } else {
            None
        }
    }
}
