//! End-to-end session scenarios driven against the mock engine.

use std::time::Duration;

use tokio_test::assert_ok;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::watch;
use tokio::time::timeout;

use super::{BUFFERING_COMPLETE, BUFFERING_EMPTY, SessionError, spawn_player_session};
use crate::config::SlipstreamConfig;
use crate::player::test_mocks::MockPlayerBuilder;
use crate::player::{ClipDefinition, PlaybackState, PlayerError, PlayerEvent};
use crate::tracks::{ContentKind, StreamDescriptor, StreamFormat, StreamGroup, StreamSelector};

const CLIP_URL: &str = "https://cdn.example.com/sintel.mpd";
const WAIT: Duration = Duration::from_secs(1);

fn clip() -> ClipDefinition {
    ClipDefinition::new(CLIP_URL)
}

fn video_audio_layout() -> Vec<StreamGroup> {
    let video = |id: &str, width, height| StreamFormat {
        width: Some(width),
        height: Some(height),
        ..StreamFormat::new(id)
    };
    vec![
        StreamGroup {
            kind: ContentKind::Video,
            streams: vec![video("v1", 1920, 1080), video("v2", 1280, 720)],
        },
        StreamGroup {
            kind: ContentKind::Audio,
            streams: vec![StreamFormat {
                language: Some("en".to_string()),
                channel_count: Some(2),
                main_role: true,
                ..StreamFormat::new("a1")
            }],
        },
    ]
}

async fn next_state(receiver: &mut watch::Receiver<PlaybackState>) -> PlaybackState {
    timeout(WAIT, receiver.changed())
        .await
        .expect("state change timed out")
        .expect("state channel completed unexpectedly");
    *receiver.borrow()
}

async fn expect_state_completed(receiver: &mut watch::Receiver<PlaybackState>) {
    let result = timeout(WAIT, receiver.changed())
        .await
        .expect("state completion timed out");
    assert!(result.is_err(), "state channel should be completed");
}

fn is_subsequence(observed: &[PlaybackState], order: &[PlaybackState]) -> bool {
    let mut position = 0;
    for state in observed {
        match order[position..].iter().position(|s| s == state) {
            Some(offset) => position += offset + 1,
            None => return false,
        }
    }
    true
}

#[tokio::test]
async fn test_set_source_then_start_publishes_ready_then_playing() {
    let builder = MockPlayerBuilder::new();
    let record = builder.record();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder);

    let mut states = handle.state_changed();
    assert_eq!(*states.borrow(), PlaybackState::None);

    handle.set_source(clip()).await.unwrap();
    assert_eq!(next_state(&mut states).await, PlaybackState::Ready);

    handle.start().await.unwrap();
    assert_eq!(next_state(&mut states).await, PlaybackState::Playing);
    assert_eq!(record.play_calls(), 1);

    // Start toggles: a second call pauses.
    handle.start().await.unwrap();
    assert_eq!(next_state(&mut states).await, PlaybackState::Paused);
    assert_eq!(record.pause_calls(), 1);

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_suspend_then_resume_restores_position() {
    let builder = MockPlayerBuilder::new();
    let record = builder.record();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder);

    handle.set_source(clip()).await.unwrap();
    handle.start().await.unwrap();
    handle.seek_to(Duration::from_secs(42)).await.unwrap();
    assert_eq!(handle.position(), Duration::from_secs(42));

    handle.suspend().await.unwrap();
    assert_eq!(record.dispose_count(), 1);
    // Detached: projections fall back to zero.
    assert_eq!(handle.position(), Duration::ZERO);

    handle.resume().await.unwrap();
    let requests = record.build_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].start_position, Some(Duration::from_secs(42)));
    assert_eq!(handle.state(), PlaybackState::Playing);
    assert_eq!(handle.position(), Duration::from_secs(42));
    // Exactly one engine left attached: only the first was disposed.
    assert_eq!(record.dispose_count(), 1);

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_build_failure_emits_error_and_never_ready() {
    let builder = MockPlayerBuilder::new_with_build_failure();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder);

    let mut errors = handle.playback_errors();
    let states = handle.state_changed();

    let result = handle.set_source(clip()).await;
    assert!(matches!(
        result,
        Err(SessionError::Player(PlayerError::BuildFailed { .. }))
    ));

    let message = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert!(message.starts_with("BuildFailed"));
    assert_eq!(*states.borrow(), PlaybackState::None);
    assert!(!states.has_changed().unwrap());

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_prepare_failure_disposes_partial_engine() {
    let builder = MockPlayerBuilder::new_with_prepare_failure();
    let record = builder.record();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder);

    let result = handle.set_source(clip()).await;
    assert!(matches!(
        result,
        Err(SessionError::Player(PlayerError::PrepareFailed { .. }))
    ));
    assert_eq!(record.dispose_count(), 1);
    assert_eq!(handle.state(), PlaybackState::None);

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_unknown_stream_descriptor_is_fail_soft() {
    let builder = MockPlayerBuilder::new().with_stream_groups(video_audio_layout());
    let record = builder.record();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder);

    let mut errors = handle.playback_errors();
    handle.set_source(clip()).await.unwrap();

    let ghost = StreamDescriptor {
        kind: ContentKind::Video,
        id: "missing".to_string(),
        description: "ghost".to_string(),
        default: false,
        group_index: Some(0),
    };
    handle.change_active_stream(ghost).await.unwrap();

    // No engine mutation, no error emission; only a warning is logged.
    assert!(record.selections().is_empty());
    assert!(matches!(errors.try_recv(), Err(TryRecvError::Empty)));

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_descriptor_round_trip_selects_described_stream() {
    let builder = MockPlayerBuilder::new().with_stream_groups(video_audio_layout());
    let record = builder.record();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder);

    handle.set_source(clip()).await.unwrap();

    let descriptors = handle
        .streams_description(ContentKind::Video)
        .await
        .unwrap();
    assert_eq!(descriptors.len(), 3);
    assert!(descriptors[2].is_auto());
    // Mock engines start video groups on the adaptive selector.
    assert!(descriptors[2].default);

    handle
        .change_active_stream(descriptors[1].clone())
        .await
        .unwrap();
    let (_, selectors) = record.selections().last().unwrap().clone();
    assert_eq!(selectors[0], StreamSelector::Fixed(1));

    handle
        .change_active_stream(descriptors[2].clone())
        .await
        .unwrap();
    let (_, selectors) = record.selections().last().unwrap().clone();
    assert_eq!(selectors[0], StreamSelector::Adaptive);

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_stop_completes_state_channel_exactly_once() {
    let builder = MockPlayerBuilder::new();
    let record = builder.record();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder);

    handle.set_source(clip()).await.unwrap();

    let mut states = handle.state_changed();
    states.borrow_and_update();

    handle.stop().await.unwrap();
    assert_eq!(next_state(&mut states).await, PlaybackState::Terminal);
    expect_state_completed(&mut states).await;
    assert_eq!(record.dispose_count(), 1);

    // Terminal is absorbing: further commands are no-ops, nothing rebuilds.
    handle.set_source(clip()).await.unwrap();
    handle.start().await.unwrap();
    handle.stop().await.unwrap();
    assert_eq!(record.build_requests().len(), 1);
    assert_eq!(handle.state(), PlaybackState::Terminal);

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_end_of_stream_event_reaches_terminal() {
    let builder = MockPlayerBuilder::new();
    let record = builder.record();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder.clone());

    handle.set_source(clip()).await.unwrap();
    let mut states = handle.state_changed();
    states.borrow_and_update();

    assert!(builder.push_event(PlayerEvent::EndOfStream));
    assert_eq!(next_state(&mut states).await, PlaybackState::Terminal);
    expect_state_completed(&mut states).await;
    assert_eq!(record.dispose_count(), 1);

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_buffering_markers_do_not_rewrite_state() {
    let builder = MockPlayerBuilder::new();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder.clone());

    handle.set_source(clip()).await.unwrap();
    let mut buffering = handle.buffering_progress();

    assert!(builder.push_event(PlayerEvent::Buffering(true)));
    assert!(builder.push_event(PlayerEvent::Buffering(false)));

    let first = timeout(WAIT, buffering.recv()).await.unwrap().unwrap();
    let second = timeout(WAIT, buffering.recv()).await.unwrap().unwrap();
    assert_eq!(first, BUFFERING_EMPTY);
    assert_eq!(second, BUFFERING_COMPLETE);

    // Buffering is a progress signal, not a state transition.
    assert_eq!(handle.state(), PlaybackState::Ready);

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_engine_error_event_does_not_force_terminal() {
    let builder = MockPlayerBuilder::new();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder.clone());

    handle.set_source(clip()).await.unwrap();
    let mut errors = handle.playback_errors();

    assert!(builder.push_event(PlayerEvent::Error(PlayerError::Playback {
        reason: "decoder hiccup".to_string(),
    })));

    let message = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert!(message.starts_with("Playback"));
    assert_eq!(handle.state(), PlaybackState::Ready);
    assert!(handle.is_running());

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_pause_failure_reports_on_channel_and_to_caller() {
    let builder = MockPlayerBuilder::new();
    builder.fail_pause(true);
    let handle = spawn_player_session(SlipstreamConfig::default(), builder);

    handle.set_source(clip()).await.unwrap();
    handle.start().await.unwrap();

    let mut errors = handle.playback_errors();
    let result = handle.pause().await;
    assert!(matches!(
        result,
        Err(SessionError::Player(PlayerError::OperationFailed {
            operation: "pause",
            ..
        }))
    ));

    let message = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert!(message.starts_with("OperationFailed"));
    // State machine left in last-known-valid state.
    assert_eq!(handle.state(), PlaybackState::Playing);

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_resume_while_attached_fails_loudly() {
    let builder = MockPlayerBuilder::new();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder);

    handle.set_source(clip()).await.unwrap();
    let mut errors = handle.playback_errors();

    let result = handle.resume().await;
    assert!(matches!(result, Err(SessionError::PlayerAttached)));
    let message = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert!(message.starts_with("PlayerAttached"));

    let result = handle.set_source(clip()).await;
    assert!(matches!(result, Err(SessionError::PlayerAttached)));

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_idle_suspend_is_noop_and_resume_needs_a_clip() {
    let handle = spawn_player_session(SlipstreamConfig::default(), MockPlayerBuilder::new());

    assert_ok!(handle.suspend().await);

    let result = handle.resume().await;
    assert!(matches!(result, Err(SessionError::NothingToResume)));

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_dispose_failure_during_suspend_is_swallowed() {
    let builder = MockPlayerBuilder::new();
    let record = builder.record();
    builder.fail_dispose(true);
    let handle = spawn_player_session(SlipstreamConfig::default(), builder.clone());

    handle.set_source(clip()).await.unwrap();
    let mut errors = handle.playback_errors();

    // Teardown must always complete; the dispose failure is logged only.
    handle.suspend().await.unwrap();
    assert!(matches!(errors.try_recv(), Err(TryRecvError::Empty)));

    builder.fail_dispose(false);
    handle.resume().await.unwrap();
    assert_eq!(record.build_requests().len(), 2);

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_subscribers_observe_one_global_state_order() {
    let handle = spawn_player_session(SlipstreamConfig::default(), MockPlayerBuilder::new());

    let collect = |mut receiver: watch::Receiver<PlaybackState>| {
        tokio::spawn(async move {
            let mut observed = Vec::new();
            while receiver.changed().await.is_ok() {
                observed.push(*receiver.borrow());
            }
            observed
        })
    };
    let first = collect(handle.state_changed());
    let second = collect(handle.state_changed());

    handle.set_source(clip()).await.unwrap();
    handle.start().await.unwrap();
    handle.start().await.unwrap();
    handle.stop().await.unwrap();

    let order = [
        PlaybackState::Ready,
        PlaybackState::Playing,
        PlaybackState::Paused,
        PlaybackState::Terminal,
    ];
    for observed in [first.await.unwrap(), second.await.unwrap()] {
        assert!(
            is_subsequence(&observed, &order),
            "observed {observed:?} is not a subsequence of {order:?}"
        );
        assert_eq!(observed.last(), Some(&PlaybackState::Terminal));
    }

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_queries_require_attached_player() {
    let handle = spawn_player_session(SlipstreamConfig::default(), MockPlayerBuilder::new());

    assert!(matches!(
        handle.seek_to(Duration::from_secs(1)).await,
        Err(SessionError::PlayerDetached)
    ));
    assert!(matches!(
        handle.pause().await,
        Err(SessionError::PlayerDetached)
    ));
    assert!(matches!(
        handle.streams_description(ContentKind::Audio).await,
        Err(SessionError::PlayerDetached)
    ));

    handle.dispose().await.unwrap();
}

#[tokio::test]
async fn test_projections_follow_attachment() {
    let builder = MockPlayerBuilder::new();
    let handle = spawn_player_session(SlipstreamConfig::default(), builder);

    assert_eq!(handle.duration(), Duration::ZERO);
    assert!(handle.is_seeking_supported());

    handle.set_source(clip()).await.unwrap();
    assert_eq!(handle.duration(), Duration::from_secs(120));

    handle.stop().await.unwrap();
    assert_eq!(handle.duration(), Duration::ZERO);

    handle.dispose().await.unwrap();
}
