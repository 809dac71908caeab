//! Integration tests for trace playback
//!
//! Timer-driven tests run on paused tokio time, so the `4000 / e^speed`
//! delays are exact.

use super::common::fixtures::{bubble_sort_trace, player_with_workspace, two_step_trace};
use algoviz::{PlaybackSpeed, PlaybackStatus};
use std::time::Duration;

/// Test a full wrap-around playback of a trace, observed through the store
#[tokio::test(start_paused = true)]
async fn test_full_playback_with_wrap() {
    let (player, workspace) = player_with_workspace();
    player.reset(bubble_sort_trace(3));
    player.set_speed(2.0);
    let tick = PlaybackSpeed::new(2.0).interval();

    assert!(player.resume(true));
    assert_eq!(workspace.cursor(), 1);

    let mut seen = vec![workspace.cursor()];
    while player.is_playing() {
        tokio::time::sleep(tick + Duration::from_millis(1)).await;
        seen.push(workspace.cursor());
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 4]);
    assert_eq!(player.status(), PlaybackStatus::Paused);

    // At the end, resume without wrap is a no-op and resume with wrap restarts
    assert!(!player.resume(false));
    assert_eq!(workspace.cursor(), 4);
    assert!(player.resume(true));
    assert_eq!(workspace.cursor(), 1);
    assert!(player.is_playing());
    player.pause();
}

/// Test that pausing mid-playback freezes the cursor
#[tokio::test(start_paused = true)]
async fn test_pause_freezes_cursor() {
    let (player, workspace) = player_with_workspace();
    player.reset(bubble_sort_trace(6));
    let tick = player.speed().interval();

    player.resume(false);
    tokio::time::sleep(tick * 2 + Duration::from_millis(1)).await;
    assert_eq!(workspace.cursor(), 3);

    player.pause();
    tokio::time::sleep(tick * 10).await;
    assert_eq!(workspace.cursor(), 3);
    assert!(!player.is_playing());
}

/// Test seeking while playing stops playback and clamps to a playable step
#[tokio::test(start_paused = true)]
async fn test_seek_during_playback() {
    let (player, workspace) = player_with_workspace();
    player.reset(bubble_sort_trace(9));

    player.resume(false);
    player.seek(0.5);
    assert!(!player.is_playing());
    assert_eq!(workspace.cursor(), 5);

    player.seek(-1.0);
    assert_eq!(workspace.cursor(), 1);
    player.seek(2.0);
    assert_eq!(workspace.cursor(), 10);
    assert!((player.progress() - 1.0).abs() < f64::EPSILON);
}

/// Test that slower speeds wait longer between steps
#[tokio::test(start_paused = true)]
async fn test_slowest_speed_waits_four_seconds() {
    let (player, workspace) = player_with_workspace();
    player.reset(two_step_trace());
    player.set_speed(0.0);

    player.resume(false);
    tokio::time::sleep(Duration::from_millis(3999)).await;
    assert_eq!(workspace.cursor(), 1);
    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(workspace.cursor(), 2);
}

/// Test that installing a new trace mid-playback stops the old timer
#[tokio::test(start_paused = true)]
async fn test_reset_during_playback() {
    let (player, workspace) = player_with_workspace();
    player.reset(bubble_sort_trace(5));
    player.resume(false);

    player.reset(two_step_trace());
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(workspace.cursor(), 0);
    assert_eq!(workspace.chunks().len(), 2);
    assert_eq!(workspace.line_indicator(), None);
    assert!(!player.is_playing());
}
