//! AI sync loop
//!
//! `call_ai` opens a chat session about a file and keeps polling it on a
//! fixed cadence, applying every returned action to the workspace in order,
//! until the session emits `ChatGenEnd` or `Error`. Polls of one session are
//! strictly sequential: the next poll is only scheduled once every action of
//! the previous response has been applied.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::workspace::{ErrorReporter, File, FileStore, HostError};

use super::action::{ChatAction, ChatId, NewChatRequest};
use super::error::ChatError;
use super::service::ChatService;

/// What to do when a create or poll request fails in transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportFailurePolicy {
    /// Stop the session, log, and report through the error hook
    #[default]
    Surface,
    /// Retry with doubling backoff, then surface once attempts run out
    Retry {
        max_attempts: u32,
        initial_backoff: Duration,
    },
}

/// How a second `call_ai` for a file with a live session is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SingleFlightPolicy {
    /// Start another independent session
    #[default]
    Unguarded,
    /// Reject with [`ChatError::SessionActive`]
    Refuse,
    /// Cancel the live session and start a new one
    Replace,
}

#[derive(Debug, Clone)]
pub struct ChatSyncConfig {
    /// Wait between session creation and the first poll
    pub initial_delay: Duration,
    /// Wait between the end of one poll and the next
    pub poll_interval: Duration,
    pub on_transport_failure: TransportFailurePolicy,
    pub single_flight: SingleFlightPolicy,
}

impl Default for ChatSyncConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            poll_interval: Duration::from_millis(500),
            on_transport_failure: TransportFailurePolicy::default(),
            single_flight: SingleFlightPolicy::default(),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// The session emitted `ChatGenEnd`
    Finished,
    /// The session emitted an `Error` action
    Errored(String),
    /// A request failed and the failure was surfaced
    Failed(ChatError),
    /// Stopped through its handle, a replacing session, or shutdown
    Cancelled,
}

impl SyncOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Summary of one sync session
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub session_id: Uuid,
    pub file_name: String,
    /// Server session id, once creation succeeded
    pub chat_id: Option<ChatId>,
    pub polls: usize,
    pub actions_applied: usize,
    pub outcome: SyncOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    fn new(session_id: Uuid, file_name: String) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            file_name,
            chat_id: None,
            polls: 0,
            actions_applied: 0,
            outcome: SyncOutcome::Cancelled,
            started_at: now,
            finished_at: now,
        }
    }
}

/// Handle to a running sync session.
///
/// Dropping the handle does not stop the session.
pub struct ChatSyncHandle {
    session_id: Uuid,
    file_name: String,
    cancel: CancellationToken,
    task: JoinHandle<SyncReport>,
}

impl ChatSyncHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Stop the session at its next suspension point
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> SyncReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(session_id = %self.session_id, error = %e, "Chat sync task failed");
                SyncReport::new(self.session_id, self.file_name)
            }
        }
    }
}

struct ActiveSession {
    file_name: String,
    cancel: CancellationToken,
    /// Cancelled once the session task has exited
    done: CancellationToken,
}

struct Inner {
    service: Arc<dyn ChatService>,
    files: Arc<dyn FileStore>,
    reporter: Arc<dyn ErrorReporter>,
    config: ChatSyncConfig,
    sessions: Mutex<HashMap<Uuid, ActiveSession>>,
}

/// Removes a session from the live set when its task exits, unwinding included
struct Registration {
    inner: Arc<Inner>,
    session_id: Uuid,
    done: CancellationToken,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.inner.sessions.lock().remove(&self.session_id);
        self.done.cancel();
    }
}

/// Drives chat sessions and applies their actions to the workspace
#[derive(Clone)]
pub struct AiSyncLoop {
    inner: Arc<Inner>,
}

impl AiSyncLoop {
    pub fn new(
        service: Arc<dyn ChatService>,
        files: Arc<dyn FileStore>,
        reporter: Arc<dyn ErrorReporter>,
        config: ChatSyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                files,
                reporter,
                config,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &ChatSyncConfig {
        &self.inner.config
    }

    /// Number of sessions still syncing
    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    pub fn is_active(&self, file_name: &str) -> bool {
        self.inner
            .sessions
            .lock()
            .values()
            .any(|s| s.file_name == file_name)
    }

    /// Start a sync session for `file` and return immediately.
    ///
    /// Fails only when the single-flight policy refuses the session.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn call_ai(&self, file: &File) -> Result<ChatSyncHandle, ChatError> {
        let session_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();

        {
            let mut sessions = self.inner.sessions.lock();
            let mut live = sessions.values().filter(|s| s.file_name == file.name);
            match self.inner.config.single_flight {
                SingleFlightPolicy::Unguarded => {}
                SingleFlightPolicy::Refuse => {
                    if live.next().is_some() {
                        tracing::warn!(file = %file.name, "Chat session already active, refusing");
                        return Err(ChatError::SessionActive(file.name.clone()));
                    }
                }
                SingleFlightPolicy::Replace => {
                    for session in live {
                        session.cancel.cancel();
                        tracing::info!(file = %file.name, "Replacing active chat session");
                    }
                }
            }
            sessions.insert(
                session_id,
                ActiveSession {
                    file_name: file.name.clone(),
                    cancel: cancel.clone(),
                    done: done.clone(),
                },
            );
        }

        let request = NewChatRequest {
            name: file.name.clone(),
            content: file.content.clone(),
        };
        let this = self.clone();
        let session_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let _registration = Registration {
                inner: this.inner.clone(),
                session_id,
                done,
            };
            this.run_session(session_id, request, session_cancel).await
        });

        Ok(ChatSyncHandle {
            session_id,
            file_name: file.name.clone(),
            cancel,
            task,
        })
    }

    /// Cancel every live session and wait for all of them to exit
    pub async fn shutdown(&self) {
        let done: Vec<CancellationToken> = {
            let sessions = self.inner.sessions.lock();
            sessions
                .values()
                .map(|s| {
                    s.cancel.cancel();
                    s.done.clone()
                })
                .collect()
        };
        tracing::debug!(sessions = done.len(), "Shutting down chat sync");
        futures::future::join_all(done.iter().map(|d| d.cancelled())).await;
    }

    async fn run_session(
        &self,
        session_id: Uuid,
        request: NewChatRequest,
        cancel: CancellationToken,
    ) -> SyncReport {
        let mut report = SyncReport::new(session_id, request.name.clone());
        tracing::info!(%session_id, file = %request.name, "Chat start");

        report.outcome = self.drive(&request, &cancel, &mut report).await;
        report.finished_at = Utc::now();

        match &report.outcome {
            SyncOutcome::Failed(error) => {
                tracing::warn!(%session_id, error = %error, "Chat sync stopped on failure");
                self.inner
                    .reporter
                    .report(HostError::chat(report.chat_id.clone(), error.clone()));
            }
            SyncOutcome::Cancelled => {
                tracing::info!(%session_id, polls = report.polls, "Chat sync cancelled");
            }
            SyncOutcome::Finished | SyncOutcome::Errored(_) => {}
        }
        report
    }

    async fn drive(
        &self,
        request: &NewChatRequest,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> SyncOutcome {
        let service = self.inner.service.as_ref();

        let chat_id = match self
            .call_with_policy("create", cancel, || service.create_session(request))
            .await
        {
            Ok(id) => id,
            Err(ChatError::Cancelled) => return SyncOutcome::Cancelled,
            Err(e) => return SyncOutcome::Failed(e),
        };
        tracing::info!(chat_id = %chat_id, "Chat started");
        report.chat_id = Some(chat_id.clone());

        let mut delay = self.inner.config.initial_delay;
        loop {
            if sleep_or_cancel(delay, cancel).await {
                return SyncOutcome::Cancelled;
            }

            report.polls += 1;
            tracing::debug!(chat_id = %chat_id, poll = report.polls, "Polling chat");
            let actions = match self
                .call_with_policy("poll", cancel, || service.poll_session(&chat_id))
                .await
            {
                Ok(actions) => actions,
                Err(ChatError::Cancelled) => return SyncOutcome::Cancelled,
                Err(e) => return SyncOutcome::Failed(e),
            };
            if cancel.is_cancelled() {
                return SyncOutcome::Cancelled;
            }

            let mut end = None;
            for action in &actions {
                self.apply(&chat_id, action);
                report.actions_applied += 1;
                match action {
                    ChatAction::ChatGenEnd => {
                        end.get_or_insert(SyncOutcome::Finished);
                    }
                    ChatAction::Error { msg } => {
                        end.get_or_insert_with(|| SyncOutcome::Errored(msg.clone()));
                    }
                    _ => {}
                }
            }

            if let Some(outcome) = end {
                tracing::info!(
                    chat_id = %chat_id,
                    polls = report.polls,
                    actions = report.actions_applied,
                    "Chat ended"
                );
                return outcome;
            }
            delay = self.inner.config.poll_interval;
        }
    }

    fn apply(&self, chat_id: &ChatId, action: &ChatAction) {
        let files = &self.inner.files;
        match action {
            ChatAction::FileCreate { file_name, select } => {
                tracing::debug!(chat_id = %chat_id, file = %file_name, select, "Creating file");
                let file = File::user(file_name.clone(), "");
                files.add_file(file.clone());
                if *select {
                    files.set_editing_file(file);
                }
            }
            ChatAction::FileAppend { file_name, appends } => {
                tracing::debug!(chat_id = %chat_id, file = %file_name, len = appends.len(), "Appending to file");
                files.append_file(file_name, appends);
            }
            ChatAction::ChatGenEnd => {
                tracing::debug!(chat_id = %chat_id, "Chat generation ended");
            }
            ChatAction::Log { msg } => {
                tracing::info!(chat_id = %chat_id, msg = %msg, "Chat log");
            }
            ChatAction::Error { msg } => {
                tracing::warn!(chat_id = %chat_id, msg = %msg, "Chat error");
            }
            ChatAction::Unknown => {
                tracing::debug!(chat_id = %chat_id, "Ignoring unknown chat action");
            }
        }
    }

    /// Run `op` under the transport failure policy, racing cancellation
    async fn call_with_policy<T, F, Fut>(
        &self,
        what: &'static str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, ChatError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChatError>>,
    {
        let policy = self.inner.config.on_transport_failure;
        let mut attempt: u32 = 1;
        let mut backoff = match policy {
            TransportFailurePolicy::Retry {
                initial_backoff, ..
            } => initial_backoff,
            TransportFailurePolicy::Surface => Duration::ZERO,
        };

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ChatError::Cancelled),
                result = op() => result,
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            let retry = match policy {
                TransportFailurePolicy::Retry { max_attempts, .. } => {
                    error.is_transient() && attempt < max_attempts
                }
                TransportFailurePolicy::Surface => false,
            };
            if !retry {
                return Err(error);
            }

            tracing::warn!(
                request = what,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Chat request failed, retrying"
            );
            if sleep_or_cancel(backoff, cancel).await {
                return Err(ChatError::Cancelled);
            }
            attempt += 1;
            backoff = backoff.saturating_mul(2);
        }
    }
}

/// Sleep for `delay`; returns true if cancelled first
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
