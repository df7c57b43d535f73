//! Core session state owned by the actor.
//!
//! All fields are mutated exclusively from actor jobs; caller threads only
//! ever see published snapshots. The underlying engine handle is never
//! shared outside this struct.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::commands::TaggedEvent;
use super::projections::SharedProjections;
use super::{BUFFERING_COMPLETE, BUFFERING_EMPTY, SessionError};
use crate::config::SlipstreamConfig;
use crate::player::{
    BuildRequest, ClipDefinition, PlaybackState, Player, PlayerBuilder, PlayerError, PlayerEvent,
};
use crate::tracks::{self, ContentKind, StreamDescriptor};

/// Core session implementation.
///
/// Runs inside the actor; processes one command at a time. Holds at most one
/// live engine, identified by a generation counter so events from disposed
/// engines can be recognized and dropped.
pub struct PlayerSession<B: PlayerBuilder> {
    config: SlipstreamConfig,
    builder: B,
    player: Option<B::Player>,
    current_clip: Option<ClipDefinition>,
    /// Position captured by the last suspend, replayed on resume
    suspend_position: Duration,
    suspended: bool,
    generation: u64,
    event_sender: mpsc::UnboundedSender<TaggedEvent>,
    forward_task: Option<JoinHandle<()>>,
    /// Present until Terminal; dropping it completes the state channel
    state_sender: Option<watch::Sender<PlaybackState>>,
    error_sender: broadcast::Sender<String>,
    buffering_sender: broadcast::Sender<u8>,
    projections: SharedProjections,
    terminal: bool,
}

impl<B: PlayerBuilder> PlayerSession<B> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: SlipstreamConfig,
        builder: B,
        event_sender: mpsc::UnboundedSender<TaggedEvent>,
        state_sender: watch::Sender<PlaybackState>,
        error_sender: broadcast::Sender<String>,
        buffering_sender: broadcast::Sender<u8>,
        projections: SharedProjections,
    ) -> Self {
        Self {
            config,
            builder,
            player: None,
            current_clip: None,
            suspend_position: Duration::ZERO,
            suspended: false,
            generation: 0,
            event_sender,
            forward_task: None,
            state_sender: Some(state_sender),
            error_sender,
            buffering_sender,
            projections,
            terminal: false,
        }
    }

    /// Builds and prepares an engine for `clip`, then publishes `Ready`.
    ///
    /// Valid only while no engine is attached. On prepare failure the
    /// partially built engine is disposed and no state is published.
    pub(crate) async fn set_source(&mut self, clip: ClipDefinition) -> Result<(), SessionError> {
        if self.terminal {
            warn!("set_source ignored on terminal session");
            return Ok(());
        }
        if self.player.is_some() {
            return Err(SessionError::PlayerAttached);
        }

        Url::parse(&clip.url).map_err(|e| PlayerError::InvalidSource {
            url: clip.url.clone(),
            reason: e.to_string(),
        })?;

        let request = BuildRequest::for_clip(&clip, None, self.config.session.window);
        let player = self.bring_up(&request).await?;

        self.attach(player);
        self.current_clip = Some(clip);
        self.publish_state(PlaybackState::Ready);
        Ok(())
    }

    /// Toggles play/pause based on the engine-reported state.
    ///
    /// Any state other than Playing/Ready/Paused is an invalid transition:
    /// warn-logged, no engine call, no channel emission.
    pub(crate) async fn start(&mut self) -> Result<(), SessionError> {
        let current = self
            .player
            .as_ref()
            .map(|player| player.scalars().state())
            .unwrap_or(PlaybackState::None);

        match current {
            PlaybackState::Playing => {
                if let Some(player) = self.player.as_mut() {
                    player.pause().await?;
                }
                self.publish_state(PlaybackState::Paused);
            }
            PlaybackState::Ready | PlaybackState::Paused => {
                if let Some(player) = self.player.as_mut() {
                    player.play();
                }
                self.publish_state(PlaybackState::Playing);
            }
            other => warn!("cannot play/pause in state: {other}"),
        }
        Ok(())
    }

    pub(crate) async fn pause(&mut self) -> Result<(), SessionError> {
        if self.terminal {
            warn!("pause ignored on terminal session");
            return Ok(());
        }
        let player = self.player.as_mut().ok_or(SessionError::PlayerDetached)?;
        player.pause().await?;
        self.publish_state(PlaybackState::Paused);
        Ok(())
    }

    pub(crate) async fn seek_to(&mut self, position: Duration) -> Result<(), SessionError> {
        if self.terminal {
            warn!("seek ignored on terminal session");
            return Ok(());
        }
        let player = self.player.as_mut().ok_or(SessionError::PlayerDetached)?;
        player.seek(position).await?;
        Ok(())
    }

    /// Captures the playback position and disposes the engine; the clip and
    /// position are retained for [`PlayerSession::resume`]. Idle suspend is
    /// a no-op.
    pub(crate) async fn suspend(&mut self) -> Result<(), SessionError> {
        if self.terminal {
            warn!("suspend ignored on terminal session");
            return Ok(());
        }
        let Some(player) = self.player.as_ref() else {
            debug!("suspend with no player attached is a no-op");
            return Ok(());
        };

        self.suspend_position = player.scalars().position();
        self.suspended = true;
        self.terminate_player().await;

        let url = self
            .current_clip
            .as_ref()
            .map(|clip| clip.url.as_str())
            .unwrap_or("<none>");
        info!("suspended {:?}@{url}", self.suspend_position);
        Ok(())
    }

    /// Rebuilds the engine at the captured position and starts playback.
    ///
    /// Calling resume while an engine is attached is a precondition
    /// violation and fails loudly. On rebuild failure the session stays
    /// detached; resume may be retried.
    pub(crate) async fn resume(&mut self) -> Result<(), SessionError> {
        if self.terminal {
            warn!("resume ignored on terminal session");
            return Ok(());
        }
        if self.player.is_some() {
            return Err(SessionError::PlayerAttached);
        }
        let clip = self
            .current_clip
            .clone()
            .ok_or(SessionError::NothingToResume)?;
        if !self.suspended {
            debug!(
                "resume without prior suspend; starting from {:?}",
                self.suspend_position
            );
        }

        let request = BuildRequest::for_clip(
            &clip,
            Some(self.suspend_position),
            self.config.session.window,
        );
        let mut player = self.bring_up(&request).await?;
        player.play();

        self.attach(player);
        self.suspended = false;
        self.publish_state(PlaybackState::Playing);
        info!("resumed {:?}@{}", self.suspend_position, clip.url);
        Ok(())
    }

    /// Unconditional transition to Terminal: disposes any attached engine,
    /// publishes `Terminal` and completes the state channel. Idempotent.
    pub(crate) async fn stop(&mut self) -> Result<(), SessionError> {
        if self.terminal {
            debug!("stop on terminal session is a no-op");
            return Ok(());
        }
        self.terminate_player().await;
        self.publish_state(PlaybackState::Terminal);
        // Completes the state channel; subscribers see no further values.
        self.state_sender = None;
        self.terminal = true;
        Ok(())
    }

    /// Switches the active stream for the descriptor's content kind.
    ///
    /// An unknown descriptor id is fail-soft: warn-logged, no engine call.
    pub(crate) async fn change_active_stream(
        &mut self,
        descriptor: StreamDescriptor,
    ) -> Result<(), SessionError> {
        if self.terminal {
            warn!("change_active_stream ignored on terminal session");
            return Ok(());
        }
        let player = self.player.as_mut().ok_or(SessionError::PlayerDetached)?;

        let groups = player.stream_groups();
        let Some((group_index, selector)) = tracks::resolve_selector(&groups, &descriptor) else {
            warn!(
                "stream index not found: {:?} {}",
                descriptor.kind, descriptor.description
            );
            return Ok(());
        };

        let (current_groups, current_selectors) = player.selected_stream_groups();
        let (new_groups, new_selectors) =
            tracks::apply_selection(current_groups, current_selectors, group_index, selector);

        info!(
            "using {selector:?} for {:?} {}",
            descriptor.kind, descriptor.description
        );
        player.set_stream_groups(new_groups, new_selectors).await?;
        Ok(())
    }

    /// Lists selectable streams of `kind` from the engine's current layout.
    pub(crate) fn stream_descriptions(
        &self,
        kind: ContentKind,
    ) -> Result<Vec<StreamDescriptor>, SessionError> {
        let player = self.player.as_ref().ok_or(SessionError::PlayerDetached)?;
        let (groups, selectors) = player.selected_stream_groups();
        Ok(tracks::stream_descriptions(&groups, &selectors, kind))
    }

    /// Dispatches one engine-pushed event.
    pub(crate) async fn handle_player_event(&mut self, tagged: TaggedEvent) {
        if tagged.generation != self.generation {
            debug!(
                "dropping event from disposed player generation {}",
                tagged.generation
            );
            return;
        }

        match tagged.event {
            PlayerEvent::EndOfStream => {
                info!("end of stream reached");
                let _ = self.stop().await;
            }
            PlayerEvent::Buffering(buffering) => {
                let marker = if buffering {
                    BUFFERING_EMPTY
                } else {
                    BUFFERING_COMPLETE
                };
                let _ = self.buffering_sender.send(marker);
            }
            PlayerEvent::Error(error) => {
                let error = SessionError::from(error);
                self.report_error(&error);
            }
        }
    }

    /// Full teardown on actor shutdown.
    pub(crate) async fn shutdown(&mut self) {
        let _ = self.stop().await;
    }

    /// Publishes a job failure on the error channel.
    pub(crate) fn report_error(&self, error: &SessionError) {
        let _ = self.error_sender.send(error.describe());
    }

    /// Builds, wires the event feed and prepares an engine. On prepare
    /// failure the partial engine is disposed before the error propagates.
    async fn bring_up(&mut self, request: &BuildRequest) -> Result<B::Player, SessionError> {
        let mut player = self.builder.build(request).await?;

        let Some(mut events) = player.take_events() else {
            if let Err(error) = player.dispose().await {
                warn!("ignoring dispose failure: {error}");
            }
            return Err(SessionError::Player(PlayerError::BuildFailed {
                reason: "engine event feed unavailable".to_string(),
            }));
        };

        self.generation += 1;
        let generation = self.generation;
        let sender = self.event_sender.clone();
        self.forward_task = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if sender.send(TaggedEvent { generation, event }).is_err() {
                    break;
                }
            }
        }));

        if let Err(error) = player.prepare().await {
            self.teardown_partial(player).await;
            return Err(error.into());
        }
        Ok(player)
    }

    fn attach(&mut self, player: B::Player) {
        self.projections
            .attach(player.scalars(), player.is_seeking_supported());
        self.player = Some(player);
    }

    /// Disposes an engine that never got attached.
    async fn teardown_partial(&mut self, mut player: B::Player) {
        if let Some(task) = self.forward_task.take() {
            task.abort();
        }
        self.generation += 1;
        if let Err(error) = player.dispose().await {
            warn!("ignoring dispose failure of partially built player: {error}");
        }
    }

    /// Detaches and disposes the attached engine, swallowing dispose
    /// failures; teardown must always complete.
    async fn terminate_player(&mut self) {
        if let Some(task) = self.forward_task.take() {
            task.abort();
        }
        self.generation += 1;
        self.projections.detach();

        if let Some(mut player) = self.player.take() {
            debug!("disposing player");
            if let Err(error) = player.dispose().await {
                warn!("ignoring dispose failure: {error}");
            }
        }
    }

    fn publish_state(&mut self, state: PlaybackState) {
        if let Some(sender) = &self.state_sender {
            sender.send_replace(state);
        }
    }
}
