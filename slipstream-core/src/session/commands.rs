//! Command definitions for the session actor.

use std::time::Duration;

use tokio::sync::oneshot;

use super::SessionError;
use crate::player::{ClipDefinition, PlayerEvent};
use crate::tracks::{ContentKind, StreamDescriptor};

/// Commands that can be sent to the session actor.
///
/// Each command encapsulates an operation request along with a response
/// channel for the actor to send back the result. Commands execute strictly
/// in submission order; a slow job (e.g. prepare) blocks later jobs until it
/// completes or fails.
pub enum SessionCommand {
    /// Build and prepare an engine for the given clip.
    SetSource {
        clip: ClipDefinition,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Toggle play/pause depending on the current engine state.
    Start {
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Pause playback.
    Pause {
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Seek to an absolute position.
    SeekTo {
        position: Duration,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Capture position and tear the engine down, remembering the clip.
    Suspend {
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Rebuild the engine at the captured position and start playback.
    Resume {
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Transition to Terminal and complete the state channel.
    Stop {
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Switch the active stream for the descriptor's content kind.
    ChangeActiveStream {
        descriptor: StreamDescriptor,
        responder: oneshot::Sender<Result<(), SessionError>>,
    },
    /// List selectable streams of one content kind.
    GetStreamsDescription {
        kind: ContentKind,
        responder: oneshot::Sender<Result<Vec<StreamDescriptor>, SessionError>>,
    },
    /// Tear everything down and terminate the actor.
    Shutdown { responder: oneshot::Sender<()> },
}

/// Engine event tagged with the generation of the engine that produced it.
///
/// Events from a generation older than the currently attached engine are
/// dropped; they belong to an engine that has already been disposed.
#[derive(Debug)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: PlayerEvent,
}
