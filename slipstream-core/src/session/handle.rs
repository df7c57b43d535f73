//! Handle for communicating with the session actor.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::commands::SessionCommand;
use super::projections::SharedProjections;
use super::SessionError;
use crate::player::{ClipDefinition, PlaybackState};
use crate::tracks::{ContentKind, StreamDescriptor};

/// Handle for communicating with the playback session actor.
///
/// Provides the public command surface, the read-only projections and the
/// three notification channels. Cloneable and safe to share across threads;
/// every clone talks to the same actor.
pub struct PlayerSessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    state_receiver: watch::Receiver<PlaybackState>,
    error_receiver: broadcast::Receiver<String>,
    buffering_receiver: broadcast::Receiver<u8>,
    projections: SharedProjections,
}

impl Clone for PlayerSessionHandle {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            state_receiver: self.state_receiver.clone(),
            error_receiver: self.error_receiver.resubscribe(),
            buffering_receiver: self.buffering_receiver.resubscribe(),
            projections: self.projections.clone(),
        }
    }
}

impl PlayerSessionHandle {
    pub(crate) fn new(
        sender: mpsc::Sender<SessionCommand>,
        state_receiver: watch::Receiver<PlaybackState>,
        error_receiver: broadcast::Receiver<String>,
        buffering_receiver: broadcast::Receiver<u8>,
        projections: SharedProjections,
    ) -> Self {
        Self {
            sender,
            state_receiver,
            error_receiver,
            buffering_receiver,
            projections,
        }
    }

    /// Builds and prepares an engine for `clip`; publishes `Ready` on
    /// success.
    ///
    /// # Errors
    /// - `SessionError::PlayerAttached` - An engine is already attached
    /// - `SessionError::Player` - URL validation, build or prepare failed
    pub async fn set_source(&self, clip: ClipDefinition) -> Result<(), SessionError> {
        let (responder, rx) = oneshot::channel();
        let command = SessionCommand::SetSource { clip, responder };

        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::Disposed)?;

        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Toggles play/pause. Invalid in the current state is a logged no-op.
    pub async fn start(&self) -> Result<(), SessionError> {
        let (responder, rx) = oneshot::channel();
        let command = SessionCommand::Start { responder };

        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::Disposed)?;

        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Pauses playback.
    ///
    /// # Errors
    /// - `SessionError::PlayerDetached` - No engine attached
    /// - `SessionError::Player` - Engine rejected the pause
    pub async fn pause(&self) -> Result<(), SessionError> {
        let (responder, rx) = oneshot::channel();
        let command = SessionCommand::Pause { responder };

        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::Disposed)?;

        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Seeks to an absolute position.
    ///
    /// # Errors
    /// - `SessionError::PlayerDetached` - No engine attached
    /// - `SessionError::Player` - Seek failed
    pub async fn seek_to(&self, position: Duration) -> Result<(), SessionError> {
        let (responder, rx) = oneshot::channel();
        let command = SessionCommand::SeekTo {
            position,
            responder,
        };

        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::Disposed)?;

        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Captures the current position and tears the engine down; the session
    /// remembers the clip for [`PlayerSessionHandle::resume`]. Suspending
    /// without an engine is a no-op.
    pub async fn suspend(&self) -> Result<(), SessionError> {
        let (responder, rx) = oneshot::channel();
        let command = SessionCommand::Suspend { responder };

        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::Disposed)?;

        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Rebuilds the engine at the captured position and starts playback.
    ///
    /// # Errors
    /// - `SessionError::PlayerAttached` - An engine is already attached
    /// - `SessionError::NothingToResume` - No suspended clip
    /// - `SessionError::Player` - Rebuild failed; the session stays detached
    pub async fn resume(&self) -> Result<(), SessionError> {
        let (responder, rx) = oneshot::channel();
        let command = SessionCommand::Resume { responder };

        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::Disposed)?;

        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Transitions to Terminal, disposing any attached engine and completing
    /// the state channel. Further commands become no-ops.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let (responder, rx) = oneshot::channel();
        let command = SessionCommand::Stop { responder };

        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::Disposed)?;

        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Switches the active stream for the descriptor's content kind.
    ///
    /// A descriptor whose id no longer exists in the engine layout is a
    /// warn-logged no-op, not an error.
    pub async fn change_active_stream(
        &self,
        descriptor: StreamDescriptor,
    ) -> Result<(), SessionError> {
        let (responder, rx) = oneshot::channel();
        let command = SessionCommand::ChangeActiveStream {
            descriptor,
            responder,
        };

        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::Disposed)?;

        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Lists selectable streams of `kind` from the engine's current layout.
    ///
    /// # Errors
    /// - `SessionError::PlayerDetached` - No engine attached
    pub async fn streams_description(
        &self,
        kind: ContentKind,
    ) -> Result<Vec<StreamDescriptor>, SessionError> {
        let (responder, rx) = oneshot::channel();
        let command = SessionCommand::GetStreamsDescription { kind, responder };

        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::Disposed)?;

        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Tears the session down and terminates the actor.
    ///
    /// Queued commands run to completion first; in-flight work is never
    /// aborted. Disposing an already-disposed session is a no-op.
    pub async fn dispose(&self) -> Result<(), SessionError> {
        let (responder, rx) = oneshot::channel();
        let command = SessionCommand::Shutdown { responder };

        if self.sender.send(command).await.is_err() {
            // Already disposed.
            return Ok(());
        }

        rx.await.map_err(|_| SessionError::Disposed)
    }

    /// Last published session state (replay-one value of the state channel).
    pub fn state(&self) -> PlaybackState {
        *self.state_receiver.borrow()
    }

    /// Content duration reported by the attached engine, zero when detached.
    pub fn duration(&self) -> Duration {
        self.projections.duration()
    }

    /// Playback position reported by the attached engine, zero when
    /// detached.
    pub fn position(&self) -> Duration {
        self.projections.position()
    }

    pub fn is_seeking_supported(&self) -> bool {
        self.projections.is_seeking_supported()
    }

    /// Subscribes to state transitions. The receiver immediately holds the
    /// most recently published state; the channel completes exactly once, at
    /// Terminal.
    pub fn state_changed(&self) -> watch::Receiver<PlaybackState> {
        self.state_receiver.clone()
    }

    /// Subscribes to failure descriptions ("kind + message"). Emission does
    /// not imply a state transition.
    pub fn playback_errors(&self) -> broadcast::Receiver<String> {
        self.error_receiver.resubscribe()
    }

    /// Subscribes to the coarse buffering markers
    /// ([`super::BUFFERING_EMPTY`] / [`super::BUFFERING_COMPLETE`]).
    pub fn buffering_progress(&self) -> broadcast::Receiver<u8> {
        self.buffering_receiver.resubscribe()
    }

    /// Returns true while the actor is accepting commands.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}
