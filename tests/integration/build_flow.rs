//! Integration tests for the build flow
//!
//! File -> trace producer -> chunker -> player -> workspace store.

use super::common::fixtures::{bubble_sort_trace, json_trace_file, two_step_trace};
use algoviz::build::{
    registry_from_config, JsonTraceProducer, MarkdownProducer, MockTraceProducer,
    MockTraceResponse,
};
use algoviz::config::TracerConfig;
use algoviz::workspace::FileStore;
use algoviz::{
    BuildError, BuildOrchestrator, File, HostError, MemoryWorkspace, PlaybackController,
    TracerRegistry,
};
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(registry: TracerRegistry) -> (BuildOrchestrator, Arc<MemoryWorkspace>) {
    let workspace = Arc::new(MemoryWorkspace::new());
    let player = PlaybackController::new(workspace.clone());
    let orchestrator = BuildOrchestrator::new(player, registry, workspace.clone());
    (orchestrator, workspace)
}

fn local_registry() -> TracerRegistry {
    TracerRegistry::new()
        .with("md", Arc::new(MarkdownProducer))
        .with("json", Arc::new(JsonTraceProducer))
}

/// Test that a recorded trace lands in the store as chunks with the cursor on step 1
#[tokio::test]
async fn test_json_trace_builds_into_chunks() {
    let (orchestrator, workspace) = orchestrator(local_registry());
    let file = json_trace_file("trace.json", &two_step_trace());

    orchestrator.build(Some(&file)).unwrap().wait().await;

    let chunks = workspace.chunks();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].commands.len(), 1);
    assert_eq!(chunks[0].commands[0].method, "m1");
    assert_eq!(chunks[0].line_number, Some(10));
    assert_eq!(chunks[1].commands[0].method, "m2");
    assert_eq!(chunks[1].line_number, None);
    assert_eq!(workspace.cursor(), 1);
    assert!(workspace.errors().is_empty());
}

/// Test that a markdown document becomes a single-step trace
#[tokio::test]
async fn test_markdown_builds_single_step() {
    let (orchestrator, workspace) = orchestrator(local_registry());

    orchestrator
        .build(Some(&File::user("README.md", "# Sorting")))
        .unwrap()
        .wait()
        .await;

    assert_eq!(workspace.chunks().len(), 1);
    assert_eq!(workspace.chunks()[0].commands.len(), 3);
    assert_eq!(orchestrator.player().cursor(), 1);
    assert!(!orchestrator.player().can_next());
}

/// Test that an unknown extension fails immediately without calling any producer
#[tokio::test]
async fn test_unregistered_extension_reports_unsupported_language() {
    let producer = Arc::new(MockTraceProducer::new("js"));
    let (orchestrator, workspace) = orchestrator(local_registry().with("js", producer.clone()));

    let handle = orchestrator.build(Some(&File::user("main.xyz", "???")));

    assert!(handle.is_none(), "No build should start for .xyz");
    assert!(!orchestrator.is_building());
    assert_eq!(producer.call_count(), 0);
    let errors = workspace.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Language Not Supported"));
}

/// Test that a file without any extension is treated as unsupported
#[tokio::test]
async fn test_file_without_extension_is_unsupported() {
    let (orchestrator, workspace) = orchestrator(local_registry());

    assert!(orchestrator.build(Some(&File::user("Makefile", ""))).is_none());
    assert!(matches!(
        workspace.errors().as_slice(),
        [HostError::Build(BuildError::UnsupportedLanguage(ext))] if ext.is_empty()
    ));
}

/// Test that rapid rebuilds only ever show the newest trace
#[tokio::test(start_paused = true)]
async fn test_rapid_rebuilds_keep_only_newest_trace() {
    let producer = Arc::new(
        MockTraceProducer::new("js")
            .with_response(
                MockTraceResponse::commands(bubble_sort_trace(5)).delayed(Duration::from_secs(3)),
            )
            .with_response(
                MockTraceResponse::commands(bubble_sort_trace(4)).delayed(Duration::from_secs(2)),
            )
            .with_response(
                MockTraceResponse::commands(bubble_sort_trace(2)).delayed(Duration::from_secs(1)),
            ),
    );
    let (orchestrator, workspace) = orchestrator(TracerRegistry::new().with("js", producer.clone()));

    let mut handles = Vec::new();
    for version in 1..=3 {
        let file = File::user("sort.js", format!("// v{version}"));
        handles.push(orchestrator.build(Some(&file)).unwrap());
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    for handle in handles {
        handle.wait().await;
    }

    assert_eq!(producer.cancelled_count(), 2);
    assert_eq!(workspace.chunks().len(), 3, "Only the v3 trace should be installed");
    assert_eq!(workspace.cursor(), 1);
    assert!(workspace.errors().is_empty());
}

/// Test that a failed build clears the in-flight flag and reports once
#[tokio::test]
async fn test_failed_build_recovers() {
    let producer = Arc::new(
        MockTraceProducer::new("py")
            .with_response(MockTraceResponse::failure(BuildError::Backend(
                "400 Bad Request - SyntaxError".into(),
            )))
            .with_response(MockTraceResponse::commands(two_step_trace())),
    );
    let (orchestrator, workspace) = orchestrator(TracerRegistry::new().with("py", producer));
    let file = File::user("main.py", "def f(:");

    orchestrator.build(Some(&file)).unwrap().wait().await;
    assert!(!orchestrator.is_building());
    assert_eq!(workspace.errors().len(), 1);
    assert_eq!(workspace.cursor(), 0);

    orchestrator.build(Some(&file)).unwrap().wait().await;
    assert_eq!(workspace.errors().len(), 1);
    assert_eq!(workspace.cursor(), 1);
}

/// Test the host wiring: editing-file changes from the store drive rebuilds
#[tokio::test]
async fn test_editing_file_changes_drive_rebuilds() {
    let (orchestrator, workspace) = orchestrator(local_registry());

    let notes = File::user("notes.md", "# One");
    workspace.add_file(notes.clone());
    workspace.set_editing_file(notes);
    let handle = orchestrator
        .on_editing_file_changed(workspace.editing_file().as_ref(), workspace.should_build());
    handle.expect("first selection builds").wait().await;
    assert_eq!(workspace.cursor(), 1);

    // Same file again: nothing to do
    assert!(orchestrator
        .on_editing_file_changed(workspace.editing_file().as_ref(), workspace.should_build())
        .is_none());

    // Appending rewrites the editing file and triggers another build
    workspace.append_file("notes.md", "\n\nmore");
    let editing = workspace.editing_file().unwrap();
    assert_eq!(editing.content, "# One\n\nmore");
    orchestrator
        .on_editing_file_changed(Some(&editing), workspace.should_build())
        .expect("edited file rebuilds")
        .wait()
        .await;
    let set_call = &workspace.chunks()[0].commands[1];
    assert_eq!(set_call.args[0], "# One\n\nmore");
}

/// Test that the config-driven registry routes remote languages to HTTP producers
#[test]
fn test_registry_from_config_routes_languages() {
    let config = TracerConfig {
        remote_languages: vec!["rs".into(), "go".into()],
        ..TracerConfig::default()
    };
    let registry = registry_from_config(&config).unwrap();

    assert_eq!(registry.extensions(), vec!["go", "json", "md", "rs"]);
    assert_eq!(registry.get("rs").unwrap().language(), "rs");
}
