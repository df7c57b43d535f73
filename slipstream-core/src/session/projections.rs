//! Read-only playback projections shared with caller threads.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::player::{PlaybackScalars, PlaybackState};

#[derive(Debug)]
struct AttachedSource {
    scalars: Arc<PlaybackScalars>,
    seekable: bool,
}

/// Snapshot access to the attached engine's scalar getters.
///
/// The slot is written only by the session actor on attach/detach; readers
/// on any thread get eventually-consistent values. While no engine is
/// attached, duration and position read as zero and the engine state as
/// `None`.
#[derive(Debug, Clone, Default)]
pub struct SharedProjections {
    inner: Arc<RwLock<Option<AttachedSource>>>,
}

impl SharedProjections {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&self, scalars: Arc<PlaybackScalars>, seekable: bool) {
        *self.inner.write() = Some(AttachedSource { scalars, seekable });
    }

    pub(crate) fn detach(&self) {
        *self.inner.write() = None;
    }

    pub fn duration(&self) -> Duration {
        self.inner
            .read()
            .as_ref()
            .map(|source| source.scalars.duration())
            .unwrap_or(Duration::ZERO)
    }

    pub fn position(&self) -> Duration {
        self.inner
            .read()
            .as_ref()
            .map(|source| source.scalars.position())
            .unwrap_or(Duration::ZERO)
    }

    /// State as reported by the engine itself, not the published session
    /// state.
    pub fn engine_state(&self) -> PlaybackState {
        self.inner
            .read()
            .as_ref()
            .map(|source| source.scalars.state())
            .unwrap_or(PlaybackState::None)
    }

    pub fn is_seeking_supported(&self) -> bool {
        self.inner
            .read()
            .as_ref()
            .map(|source| source.seekable)
            .unwrap_or(true)
    }
}
