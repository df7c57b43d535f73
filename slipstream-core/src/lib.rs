//! Slipstream Core - Playback session orchestration
//!
//! This crate provides the coordination layer for a media playback session:
//! building, preparing, running, suspending, resuming and tearing down an
//! underlying playback engine while publishing state, error and buffering
//! notifications to subscribers. All engine interaction is serialized onto a
//! single actor task; callers talk to it through a cloneable handle.
//!
//! The playback engine itself (demuxing, decoding, DRM license acquisition,
//! rendering) is an external collaborator consumed through the [`player`]
//! traits.

pub mod config;
pub mod player;
pub mod seek;
pub mod session;
pub mod tracing_setup;
pub mod tracks;

// Re-export main types for convenient access
pub use config::SlipstreamConfig;
pub use player::{ClipDefinition, PlaybackState, Player, PlayerBuilder, PlayerError};
pub use session::{PlayerSessionHandle, SessionError, spawn_player_session};
pub use tracks::{ContentKind, StreamDescriptor};

/// Core errors that can bubble up from any Slipstream subsystem.
#[derive(Debug, thiserror::Error)]
pub enum SlipstreamError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Player error: {0}")]
    Player(#[from] PlayerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlipstreamError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            SlipstreamError::Session(e) => match e {
                SessionError::Disposed => "Playback session is closed".to_string(),
                SessionError::PlayerDetached => "No media is loaded".to_string(),
                SessionError::PlayerAttached => "Media is already loaded".to_string(),
                SessionError::NothingToResume => "Nothing to resume".to_string(),
                SessionError::Player(e) => format!("Playback failed: {e}"),
            },
            SlipstreamError::Player(e) => format!("Playback failed: {e}"),
            SlipstreamError::Io(_) => "File system error occurred".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SlipstreamError>;
