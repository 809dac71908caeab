//! Integration tests for AI sync sessions editing the workspace

use super::common::fixtures::player_with_workspace;
use algoviz::build::{MarkdownProducer, MockTraceProducer};
use algoviz::chat::{MockChatService, SingleFlightPolicy, SyncOutcome};
use algoviz::workspace::FileStore;
use algoviz::{
    AiSyncLoop, BuildOrchestrator, ChatAction, ChatSyncConfig, File, MemoryWorkspace,
    TracerRegistry,
};
use std::sync::Arc;
use std::time::Duration;

fn create(name: &str, select: bool) -> ChatAction {
    ChatAction::FileCreate {
        file_name: name.into(),
        select,
    }
}

fn append(name: &str, text: &str) -> ChatAction {
    ChatAction::FileAppend {
        file_name: name.into(),
        appends: text.into(),
    }
}

fn sync_loop(service: &MockChatService, workspace: &Arc<MemoryWorkspace>) -> AiSyncLoop {
    AiSyncLoop::new(
        Arc::new(service.clone()),
        workspace.clone(),
        workspace.clone(),
        ChatSyncConfig::default(),
    )
}

/// Test that streamed appends across polls assemble a file in order
#[tokio::test(start_paused = true)]
async fn test_streamed_file_generation() {
    let service = MockChatService::new()
        .with_poll(vec![create("explain.md", true), append("explain.md", "# Bubble")])
        .with_poll(vec![])
        .with_poll(vec![append("explain.md", " sort\n"), append("explain.md", "Swap pairs.")])
        .with_poll(vec![ChatAction::Log { msg: "done".into() }, ChatAction::ChatGenEnd]);
    let workspace = Arc::new(MemoryWorkspace::with_files(vec![File::user("sort.js", "code")]));
    let sync = sync_loop(&service, &workspace);

    let report = sync
        .call_ai(&File::user("sort.js", "code"))
        .unwrap()
        .wait()
        .await;

    assert!(report.outcome.is_finished());
    assert_eq!(report.polls, 4);
    assert_eq!(report.actions_applied, 6);
    assert_eq!(
        workspace.file("explain.md").unwrap().content,
        "# Bubble sort\nSwap pairs."
    );
    assert_eq!(workspace.editing_file().unwrap().name, "explain.md");
    assert_eq!(
        workspace.editing_file().unwrap().content,
        "# Bubble sort\nSwap pairs."
    );
    assert_eq!(workspace.file("sort.js").unwrap().content, "code");

    let created = service.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].name, "sort.js");
    assert_eq!(created[0].content, "code");
}

/// Test that a file produced by the AI can be built and played
#[tokio::test(start_paused = true)]
async fn test_ai_output_feeds_build() {
    let service = MockChatService::new()
        .with_poll(vec![create("walkthrough.md", true)])
        .with_poll(vec![append("walkthrough.md", "## Step 1"), ChatAction::ChatGenEnd]);
    let (player, workspace) = player_with_workspace();
    let registry = TracerRegistry::new()
        .with("md", Arc::new(MarkdownProducer))
        .with("js", Arc::new(MockTraceProducer::new("js")));
    let orchestrator = BuildOrchestrator::new(player, registry, workspace.clone());
    let sync = sync_loop(&service, &workspace);

    sync.call_ai(&File::user("sort.js", "code"))
        .unwrap()
        .wait()
        .await;

    let editing = workspace.editing_file();
    orchestrator
        .on_editing_file_changed(editing.as_ref(), workspace.should_build())
        .expect("AI-selected file builds")
        .wait()
        .await;

    let chunks = workspace.chunks();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].commands[1].args[0], "## Step 1");
    assert_eq!(orchestrator.player().cursor(), 1);
}

/// Test that user edits interleave with AI appends last-write-wins
#[tokio::test(start_paused = true)]
async fn test_user_edit_between_polls() {
    let service = MockChatService::new()
        .with_poll(vec![append("notes.md", "A")])
        .with_poll(vec![append("notes.md", "B"), ChatAction::ChatGenEnd]);
    let workspace = Arc::new(MemoryWorkspace::with_files(vec![File::user("notes.md", "")]));
    let sync = sync_loop(&service, &workspace);

    let handle = sync.call_ai(&File::user("notes.md", "")).unwrap();
    // First poll lands at 200ms, the second at 700ms
    tokio::time::sleep(Duration::from_millis(400)).await;
    workspace.append_file("notes.md", "-user-");
    handle.wait().await;

    assert_eq!(workspace.file("notes.md").unwrap().content, "A-user-B");
}

/// Test that two unguarded sessions for the same file both apply their actions
#[tokio::test(start_paused = true)]
async fn test_concurrent_unguarded_sessions() {
    let service = MockChatService::new()
        .with_poll(vec![create("one.md", false), ChatAction::ChatGenEnd])
        .with_poll(vec![create("two.md", false), ChatAction::ChatGenEnd]);
    let (_player, workspace) = player_with_workspace();
    let sync = sync_loop(&service, &workspace);
    assert_eq!(sync.config().single_flight, SingleFlightPolicy::Unguarded);

    let file = File::user("sort.js", "");
    let first = sync.call_ai(&file).unwrap();
    let second = sync.call_ai(&file).unwrap();
    let (a, b) = (first.wait().await, second.wait().await);

    assert!(a.outcome.is_finished() && b.outcome.is_finished());
    assert_ne!(a.chat_id, b.chat_id);
    let mut names: Vec<String> = workspace.files().into_iter().map(|f| f.name).collect();
    names.sort();
    assert_eq!(names, vec!["one.md", "two.md"]);
    assert!(workspace.editing_file().is_none());
}

/// Test that an `Error` action ends the session cleanly after earlier actions applied
#[tokio::test(start_paused = true)]
async fn test_error_action_after_partial_output() {
    let service = MockChatService::new().with_poll(vec![
        create("partial.md", true),
        append("partial.md", "half"),
        ChatAction::Error {
            msg: "context length exceeded".into(),
        },
    ]);
    let (_player, workspace) = player_with_workspace();
    let sync = sync_loop(&service, &workspace);

    let report = sync
        .call_ai(&File::user("big.js", "..."))
        .unwrap()
        .wait()
        .await;

    assert!(matches!(report.outcome, SyncOutcome::Errored(_)));
    assert_eq!(workspace.file("partial.md").unwrap().content, "half");
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(service.poll_count(), 1);
}
