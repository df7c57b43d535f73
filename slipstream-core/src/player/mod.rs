//! Playback engine boundary.
//!
//! The engine performing demux/decode/render is a black box to this crate.
//! It is consumed through the [`Player`] and [`PlayerBuilder`] traits: a
//! narrow command surface, a push-based event feed, and a set of scalar
//! getters that tolerate concurrent reads. Engine handles are not reentrant;
//! the session actor is the only caller of the mutating operations.

pub mod clip;
pub mod test_mocks;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use clip::{ClipDefinition, DrmDescription, scheme_to_key_system};

use crate::tracks::{StreamGroup, StreamSelector};

/// Coarse playback lifecycle state published by a session.
///
/// Buffering is a separate progress signal, never folded into this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlaybackState {
    /// No engine attached and nothing published yet
    None = 0,
    /// Engine prepared and ready to play
    Ready = 1,
    Paused = 2,
    Playing = 3,
    /// Absorbing end state after stop, end-of-stream or disposal
    Terminal = 4,
}

impl PlaybackState {
    /// Returns the wire representation used by [`PlaybackScalars`].
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes the representation stored in [`PlaybackScalars`], falling
    /// back to `None` for values no engine should produce.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PlaybackState::Ready,
            2 => PlaybackState::Paused,
            3 => PlaybackState::Playing,
            4 => PlaybackState::Terminal,
            _ => PlaybackState::None,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::None => "none",
            PlaybackState::Ready => "ready",
            PlaybackState::Paused => "paused",
            PlaybackState::Playing => "playing",
            PlaybackState::Terminal => "terminal",
        };
        write!(f, "{name}")
    }
}

/// Events pushed by an engine over its event feed.
#[derive(Debug)]
pub enum PlayerEvent {
    /// Playback reached the natural end of the content
    EndOfStream,
    /// Buffer underrun started (`true`) or recovered (`false`)
    Buffering(bool),
    /// Runtime failure raised by the engine; does not by itself end playback
    Error(PlayerError),
}

/// Errors raised by engine builds and engine operations.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("invalid source {url}: {reason}")]
    InvalidSource { url: String, reason: String },

    #[error("player build failed: {reason}")]
    BuildFailed { reason: String },

    #[error("prepare failed: {reason}")]
    PrepareFailed { reason: String },

    #[error("{operation} failed: {reason}")]
    OperationFailed {
        operation: &'static str,
        reason: String,
    },

    #[error("playback failure: {reason}")]
    Playback { reason: String },
}

impl PlayerError {
    /// Short machine-readable kind, used when formatting error-channel
    /// messages as "kind + message".
    pub fn kind(&self) -> &'static str {
        match self {
            PlayerError::InvalidSource { .. } => "InvalidSource",
            PlayerError::BuildFailed { .. } => "BuildFailed",
            PlayerError::PrepareFailed { .. } => "PrepareFailed",
            PlayerError::OperationFailed { .. } => "OperationFailed",
            PlayerError::Playback { .. } => "Playback",
        }
    }
}

/// Opaque native window the engine renders into.
///
/// Window management is outside this crate; the value is passed through to
/// engine builds untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowTarget(pub u64);

/// Everything an engine build needs, resolved from a clip.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub url: String,
    /// Key system resolved from the clip's DRM scheme, when protected
    pub key_system: Option<String>,
    /// First DRM descriptor of the clip, when protected
    pub drm: Option<DrmDescription>,
    /// Playback position the engine should start at
    pub start_position: Option<Duration>,
    pub window: Option<WindowTarget>,
}

impl BuildRequest {
    /// Resolves a build request for `clip`.
    ///
    /// The first DRM descriptor (if any) selects the key system; absence
    /// means clear content.
    pub fn for_clip(
        clip: &ClipDefinition,
        start_position: Option<Duration>,
        window: Option<WindowTarget>,
    ) -> Self {
        let drm = clip.drm_info().cloned();
        let key_system = scheme_to_key_system(drm.as_ref().and_then(|d| d.scheme.as_deref()));
        Self {
            url: clip.url.clone(),
            key_system,
            drm,
            start_position,
            window,
        }
    }
}

/// Scalar playback snapshots safe for concurrent read from any thread.
///
/// Engines update these internally; readers treat them as eventually
/// consistent, not transactional.
#[derive(Debug, Default)]
pub struct PlaybackScalars {
    duration_ms: AtomicU64,
    position_ms: AtomicU64,
    state: AtomicU8,
}

impl PlaybackScalars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_duration(&self, duration: Duration) {
        self.duration_ms
            .store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms.load(Ordering::Relaxed))
    }

    pub fn set_position(&self, position: Duration) {
        self.position_ms
            .store(position.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn position(&self) -> Duration {
        Duration::from_millis(self.position_ms.load(Ordering::Relaxed))
    }

    pub fn set_state(&self, state: PlaybackState) {
        self.state.store(state.as_u8(), Ordering::Relaxed);
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::Relaxed))
    }
}

/// Handle to a built playback engine.
///
/// Mutating operations must only be called from one thread at a time; the
/// session actor enforces this by owning the handle exclusively. The
/// [`PlaybackScalars`] returned by [`Player::scalars`] are the one surface
/// safe to share with other threads.
#[async_trait]
pub trait Player: Send + 'static {
    /// Loads and buffers the source until the engine is ready to play.
    ///
    /// # Errors
    /// - `PlayerError::PrepareFailed` - Source could not be loaded
    async fn prepare(&mut self) -> Result<(), PlayerError>;

    /// Starts or resumes rendering. Infallible at the call site; runtime
    /// failures arrive on the event feed.
    fn play(&mut self);

    /// Pauses rendering.
    ///
    /// # Errors
    /// - `PlayerError::OperationFailed` - Engine rejected the pause
    async fn pause(&mut self) -> Result<(), PlayerError>;

    /// Seeks to `position`.
    ///
    /// # Errors
    /// - `PlayerError::OperationFailed` - Seek not possible at this point
    async fn seek(&mut self, position: Duration) -> Result<(), PlayerError>;

    /// Returns the engine's current stream group layout in engine order.
    fn stream_groups(&self) -> Vec<StreamGroup>;

    /// Returns the current layout together with the active selector per group.
    fn selected_stream_groups(&self) -> (Vec<StreamGroup>, Vec<StreamSelector>);

    /// Replaces the active stream selection.
    ///
    /// # Errors
    /// - `PlayerError::OperationFailed` - Engine rejected the selection
    async fn set_stream_groups(
        &mut self,
        groups: Vec<StreamGroup>,
        selectors: Vec<StreamSelector>,
    ) -> Result<(), PlayerError>;

    /// Releases all engine resources.
    ///
    /// Callers treat failures as best-effort cleanup; an engine must be
    /// unusable afterwards even when this returns an error.
    async fn dispose(&mut self) -> Result<(), PlayerError>;

    /// Takes the push-based event feed. Yields `Some` exactly once per
    /// built engine.
    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<PlayerEvent>>;

    /// Shared scalar snapshots (duration, position, engine state).
    fn scalars(&self) -> Arc<PlaybackScalars>;

    fn is_seeking_supported(&self) -> bool {
        true
    }
}

/// Factory producing ready-to-prepare engine instances.
#[async_trait]
pub trait PlayerBuilder: Send + 'static {
    type Player: Player;

    /// Builds an engine for `request`.
    ///
    /// # Errors
    /// - `PlayerError::InvalidSource` - Malformed source description
    /// - `PlayerError::BuildFailed` - Engine could not be constructed
    async fn build(&self, request: &BuildRequest) -> Result<Self::Player, PlayerError>;
}
