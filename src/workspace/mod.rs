//! Host-owned workspace: files, the store verbs the core mutates through,
//! and the error-reporting hook.

pub mod file;
pub mod memory;
pub mod reporter;
pub mod store;

pub use file::{extension, File};
pub use memory::{MemoryWorkspace, WorkspaceState};
pub use reporter::{ErrorReporter, HostError, TracingReporter};
pub use store::{FileStore, TraceStore};
