//! Mock engine implementations for testing the session actor.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{
    BuildRequest, PlaybackScalars, PlaybackState, Player, PlayerBuilder, PlayerError, PlayerEvent,
};
use crate::tracks::{ContentKind, StreamGroup, StreamSelector};

const MOCK_CONTENT_DURATION: Duration = Duration::from_secs(120);

#[derive(Debug, Default)]
struct MockScript {
    fail_build: bool,
    fail_prepare: bool,
    fail_pause: bool,
    fail_seek: bool,
    fail_dispose: bool,
    groups: Vec<StreamGroup>,
}

/// Observation record shared between a builder and the engines it builds.
#[derive(Debug, Default)]
pub struct MockPlayerRecord {
    build_requests: Mutex<Vec<BuildRequest>>,
    play_calls: AtomicUsize,
    pause_calls: AtomicUsize,
    seeks: Mutex<Vec<Duration>>,
    selections: Mutex<Vec<(Vec<StreamGroup>, Vec<StreamSelector>)>>,
    dispose_count: AtomicUsize,
    event_feed: Mutex<Option<mpsc::UnboundedSender<PlayerEvent>>>,
}

impl MockPlayerRecord {
    /// Requests received by the builder, in build order.
    pub fn build_requests(&self) -> Vec<BuildRequest> {
        self.build_requests.lock().clone()
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::Relaxed)
    }

    pub fn pause_calls(&self) -> usize {
        self.pause_calls.load(Ordering::Relaxed)
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.seeks.lock().clone()
    }

    /// Arguments of every `set_stream_groups` call across built engines.
    pub fn selections(&self) -> Vec<(Vec<StreamGroup>, Vec<StreamSelector>)> {
        self.selections.lock().clone()
    }

    pub fn dispose_count(&self) -> usize {
        self.dispose_count.load(Ordering::Relaxed)
    }
}

/// Mock engine builder for testing.
#[derive(Debug, Clone)]
pub struct MockPlayerBuilder {
    script: Arc<Mutex<MockScript>>,
    record: Arc<MockPlayerRecord>,
}

impl MockPlayerBuilder {
    /// Creates a builder whose engines prepare and play successfully.
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(MockScript::default())),
            record: Arc::new(MockPlayerRecord::default()),
        }
    }

    /// Creates a builder that fails every build attempt.
    pub fn new_with_build_failure() -> Self {
        let builder = Self::new();
        builder.script.lock().fail_build = true;
        builder
    }

    /// Creates a builder whose engines fail `prepare`.
    pub fn new_with_prepare_failure() -> Self {
        let builder = Self::new();
        builder.script.lock().fail_prepare = true;
        builder
    }

    /// Sets the stream layout reported by subsequently built engines.
    pub fn with_stream_groups(self, groups: Vec<StreamGroup>) -> Self {
        self.script.lock().groups = groups;
        self
    }

    pub fn fail_pause(&self, fail: bool) {
        self.script.lock().fail_pause = fail;
    }

    pub fn fail_seek(&self, fail: bool) {
        self.script.lock().fail_seek = fail;
    }

    pub fn fail_dispose(&self, fail: bool) {
        self.script.lock().fail_dispose = fail;
    }

    /// Shared observation record for assertions.
    pub fn record(&self) -> Arc<MockPlayerRecord> {
        Arc::clone(&self.record)
    }

    /// Pushes an event into the most recently built engine's feed.
    ///
    /// Returns false when no engine is attached or the feed was dropped.
    pub fn push_event(&self, event: PlayerEvent) -> bool {
        match &*self.record.event_feed.lock() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }
}

impl Default for MockPlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlayerBuilder for MockPlayerBuilder {
    type Player = MockPlayer;

    async fn build(&self, request: &BuildRequest) -> Result<MockPlayer, PlayerError> {
        self.record.build_requests.lock().push(request.clone());

        let script = self.script.lock();
        if script.fail_build {
            return Err(PlayerError::BuildFailed {
                reason: "mock build failure".to_string(),
            });
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        *self.record.event_feed.lock() = Some(sender);

        let scalars = Arc::new(PlaybackScalars::new());
        if let Some(position) = request.start_position {
            scalars.set_position(position);
        }

        let selectors = script
            .groups
            .iter()
            .map(|group| match group.kind {
                ContentKind::Video => StreamSelector::Adaptive,
                _ => StreamSelector::Fixed(0),
            })
            .collect();

        Ok(MockPlayer {
            scalars,
            events: Some(receiver),
            script: Arc::clone(&self.script),
            record: Arc::clone(&self.record),
            groups: script.groups.clone(),
            selectors,
        })
    }
}

/// Mock engine handle for testing.
#[derive(Debug)]
pub struct MockPlayer {
    scalars: Arc<PlaybackScalars>,
    events: Option<mpsc::UnboundedReceiver<PlayerEvent>>,
    script: Arc<Mutex<MockScript>>,
    record: Arc<MockPlayerRecord>,
    groups: Vec<StreamGroup>,
    selectors: Vec<StreamSelector>,
}

#[async_trait]
impl Player for MockPlayer {
    async fn prepare(&mut self) -> Result<(), PlayerError> {
        if self.script.lock().fail_prepare {
            return Err(PlayerError::PrepareFailed {
                reason: "mock prepare failure".to_string(),
            });
        }
        self.scalars.set_duration(MOCK_CONTENT_DURATION);
        self.scalars.set_state(PlaybackState::Ready);
        Ok(())
    }

    fn play(&mut self) {
        self.record.play_calls.fetch_add(1, Ordering::Relaxed);
        self.scalars.set_state(PlaybackState::Playing);
    }

    async fn pause(&mut self) -> Result<(), PlayerError> {
        if self.script.lock().fail_pause {
            return Err(PlayerError::OperationFailed {
                operation: "pause",
                reason: "mock pause failure".to_string(),
            });
        }
        self.record.pause_calls.fetch_add(1, Ordering::Relaxed);
        self.scalars.set_state(PlaybackState::Paused);
        Ok(())
    }

    async fn seek(&mut self, position: Duration) -> Result<(), PlayerError> {
        if self.script.lock().fail_seek {
            return Err(PlayerError::OperationFailed {
                operation: "seek",
                reason: "mock seek failure".to_string(),
            });
        }
        self.record.seeks.lock().push(position);
        self.scalars.set_position(position);
        Ok(())
    }

    fn stream_groups(&self) -> Vec<StreamGroup> {
        self.groups.clone()
    }

    fn selected_stream_groups(&self) -> (Vec<StreamGroup>, Vec<StreamSelector>) {
        (self.groups.clone(), self.selectors.clone())
    }

    async fn set_stream_groups(
        &mut self,
        groups: Vec<StreamGroup>,
        selectors: Vec<StreamSelector>,
    ) -> Result<(), PlayerError> {
        self.record
            .selections
            .lock()
            .push((groups.clone(), selectors.clone()));
        self.groups = groups;
        self.selectors = selectors;
        Ok(())
    }

    async fn dispose(&mut self) -> Result<(), PlayerError> {
        self.record.dispose_count.fetch_add(1, Ordering::Relaxed);
        self.record.event_feed.lock().take();
        self.scalars.set_state(PlaybackState::None);

        if self.script.lock().fail_dispose {
            return Err(PlayerError::OperationFailed {
                operation: "dispose",
                reason: "mock dispose failure".to_string(),
            });
        }
        Ok(())
    }

    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<PlayerEvent>> {
        self.events.take()
    }

    fn scalars(&self) -> Arc<PlaybackScalars> {
        Arc::clone(&self.scalars)
    }
}
