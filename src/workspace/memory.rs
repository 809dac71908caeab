//! In-memory workspace store
//!
//! Reference implementation of the store verbs, used by the headless host
//! and by tests. File mutations follow the editor's semantics: every
//! mutation raises `should_build`, and appending to the editing file keeps
//! the editing selection pointed at the rewritten file.

use parking_lot::Mutex;

use crate::trace::Chunk;

use super::file::File;
use super::reporter::{ErrorReporter, HostError};
use super::store::{FileStore, TraceStore};

/// Snapshot of everything the store holds
#[derive(Debug, Clone, Default)]
pub struct WorkspaceState {
    pub files: Vec<File>,
    pub editing_file: Option<File>,
    /// Whether a change to the editing file should trigger a rebuild
    pub should_build: bool,
    pub chunks: Vec<Chunk>,
    pub cursor: usize,
    pub line_indicator: Option<u32>,
    /// Failures reported through the error hook, oldest first
    pub errors: Vec<HostError>,
}

#[derive(Debug, Default)]
pub struct MemoryWorkspace {
    state: Mutex<WorkspaceState>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: Vec<File>) -> Self {
        Self {
            state: Mutex::new(WorkspaceState {
                files,
                should_build: true,
                ..WorkspaceState::default()
            }),
        }
    }

    pub fn snapshot(&self) -> WorkspaceState {
        self.state.lock().clone()
    }

    pub fn files(&self) -> Vec<File> {
        self.state.lock().files.clone()
    }

    pub fn file(&self, name: &str) -> Option<File> {
        self.state.lock().files.iter().find(|f| f.name == name).cloned()
    }

    pub fn editing_file(&self) -> Option<File> {
        self.state.lock().editing_file.clone()
    }

    pub fn should_build(&self) -> bool {
        self.state.lock().should_build
    }

    pub fn cursor(&self) -> usize {
        self.state.lock().cursor
    }

    pub fn chunks(&self) -> Vec<Chunk> {
        self.state.lock().chunks.clone()
    }

    pub fn line_indicator(&self) -> Option<u32> {
        self.state.lock().line_indicator
    }

    pub fn errors(&self) -> Vec<HostError> {
        self.state.lock().errors.clone()
    }
}

impl TraceStore for MemoryWorkspace {
    fn set_chunks(&self, chunks: Vec<Chunk>) {
        self.state.lock().chunks = chunks;
    }

    fn set_cursor(&self, cursor: usize) {
        self.state.lock().cursor = cursor;
    }

    fn set_line_indicator(&self, line: Option<u32>) {
        self.state.lock().line_indicator = line;
    }
}

impl FileStore for MemoryWorkspace {
    fn add_file(&self, file: File) {
        let mut state = self.state.lock();
        state.files.push(file);
        state.should_build = true;
    }

    fn append_file(&self, file_name: &str, text: &str) {
        let mut state = self.state.lock();
        let WorkspaceState {
            files,
            editing_file,
            ..
        } = &mut *state;

        for file in files.iter_mut().filter(|f| f.name == file_name) {
            let updated = file.appended(text);
            if editing_file.as_ref() == Some(&*file) {
                *editing_file = Some(updated.clone());
            }
            *file = updated;
        }
        state.should_build = true;
    }

    fn set_editing_file(&self, file: File) {
        let mut state = self.state.lock();
        state.editing_file = Some(file);
        state.should_build = true;
    }
}

impl ErrorReporter for MemoryWorkspace {
    fn report(&self, error: HostError) {
        tracing::debug!(error = %error, "Recording reported error");
        self.state.lock().errors.push(error);
    }
}
