//! Playback session orchestration.
//!
//! A session is a single-owner actor: every engine-touching operation is a
//! job on one FIFO queue, executed by one task. Callers drive the session
//! from any thread through [`PlayerSessionHandle`] and observe it through
//! three independent notification channels (state, error, buffering).

pub mod actor;
pub mod commands;
mod core;
pub mod handle;
mod projections;

#[cfg(test)]
mod integration_tests;

pub use actor::spawn_player_session;
pub use commands::SessionCommand;
pub use handle::PlayerSessionHandle;
pub use projections::SharedProjections;
pub use self::core::PlayerSession;

use crate::player::PlayerError;

/// Marker emitted on the buffering channel when a buffer underrun starts.
pub const BUFFERING_EMPTY: u8 = 0;
/// Marker emitted on the buffering channel when the buffer is ready again.
pub const BUFFERING_COMPLETE: u8 = 100;

/// Errors that can occur during session operations.
///
/// Invalid state transitions (e.g. starting before a source is set) are not
/// errors; they are warn-logged no-ops. Errors cover commands that cannot
/// be meaningfully executed at all.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session actor is gone; no further commands are accepted
    #[error("session disposed")]
    Disposed,

    /// The command requires an attached engine and none is attached
    #[error("no player attached")]
    PlayerDetached,

    /// The command requires a detached session but an engine is attached
    #[error("player already attached")]
    PlayerAttached,

    /// Resume called without a previously suspended clip
    #[error("no suspended clip to resume")]
    NothingToResume,

    #[error(transparent)]
    Player(#[from] PlayerError),
}

impl SessionError {
    /// Short machine-readable kind, mirrored on [`PlayerError::kind`].
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Disposed => "Disposed",
            SessionError::PlayerDetached => "PlayerDetached",
            SessionError::PlayerAttached => "PlayerAttached",
            SessionError::NothingToResume => "NothingToResume",
            SessionError::Player(e) => e.kind(),
        }
    }

    /// Formats the error the way the error channel publishes it:
    /// kind followed by the human-readable message.
    pub fn describe(&self) -> String {
        format!("{} {}", self.kind(), self)
    }
}
