//! Centralized configuration for Slipstream.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

use crate::player::WindowTarget;

/// Central configuration for all Slipstream components.
///
/// Groups related configuration settings into logical sections.
#[derive(Debug, Clone, Default)]
pub struct SlipstreamConfig {
    pub session: SessionConfig,
    pub channels: ChannelConfig,
    pub seek: SeekConfig,
}

/// Session actor configuration.
///
/// Controls the command queue feeding the confinement actor and the
/// rendering target handed to engine builds.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Depth of the bounded command queue; submissions beyond this apply
    /// backpressure to callers
    pub command_queue_depth: usize,
    /// Native window the engine renders into, when one exists
    pub window: Option<WindowTarget>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_queue_depth: 100,
            window: None,
        }
    }
}

/// Notification channel configuration.
///
/// Capacities for the broadcast channels; slow subscribers that fall more
/// than a capacity behind observe a lag error, not backpressure.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Buffered error messages per subscriber
    pub error_capacity: usize,
    /// Buffered buffering markers per subscriber
    pub buffering_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            error_capacity: 16,
            buffering_capacity: 16,
        }
    }
}

/// Seek behavior configuration.
///
/// Tunes how rapid seek requests accumulate before a single engine seek is
/// issued (see [`crate::seek::SeekAccumulator`]).
#[derive(Debug, Clone)]
pub struct SeekConfig {
    /// Base jump applied per seek nudge
    pub default_seek_interval: Duration,
    /// Quiet window after which an accumulated target is handed to the engine
    pub accumulate_interval: Duration,
    /// Upper bound on an accumulated target as a fraction of content duration
    pub max_interval_fraction: f64,
    /// Nudges arriving faster than this are coalesced without adding a step
    /// (key-repeat events arrive at ~100ms when a key is held)
    pub repeat_threshold: Duration,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            default_seek_interval: Duration::from_secs(5),
            accumulate_interval: Duration::from_secs(2),
            max_interval_fraction: 1.0,
            repeat_threshold: Duration::from_millis(200),
        }
    }
}
