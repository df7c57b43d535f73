//! Seek accumulation.
//!
//! Held keys and repeated taps produce bursts of seek requests. Issuing each
//! one against the engine would queue a pile of expensive seeks; instead the
//! burst folds into a single target that is handed to
//! [`crate::session::PlayerSessionHandle::seek_to`] once input goes quiet.

use std::time::{Duration, Instant};

use crate::config::SeekConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

/// Folds bursts of seek nudges into one clamped target.
#[derive(Debug)]
pub struct SeekAccumulator {
    config: SeekConfig,
    target: Option<Duration>,
    last_nudge: Option<Instant>,
}

impl SeekAccumulator {
    pub fn new(config: SeekConfig) -> Self {
        Self {
            config,
            target: None,
            last_nudge: None,
        }
    }

    /// Folds one nudge into the pending target and returns it.
    ///
    /// `position` is the current playback position, `duration` the content
    /// length (zero when unknown, which disables the upper clamp). A nudge
    /// arriving within the repeat threshold of the previous one is treated
    /// as key repeat: the quiet window restarts but no step is added.
    pub fn nudge(
        &mut self,
        direction: SeekDirection,
        position: Duration,
        duration: Duration,
        now: Instant,
    ) -> Duration {
        if let (Some(target), Some(last)) = (self.target, self.last_nudge) {
            if now.duration_since(last) < self.config.repeat_threshold {
                self.last_nudge = Some(now);
                return target;
            }
        }

        let origin = match (self.target, self.last_nudge) {
            (Some(target), Some(last))
                if now.duration_since(last) <= self.config.accumulate_interval =>
            {
                target
            }
            _ => position,
        };

        let step = self.config.default_seek_interval;
        let mut next = match direction {
            SeekDirection::Forward => origin.saturating_add(step),
            SeekDirection::Backward => origin.saturating_sub(step),
        };
        if duration > Duration::ZERO {
            let limit = duration.mul_f64(self.config.max_interval_fraction.clamp(0.0, 1.0));
            next = next.min(limit);
        }

        self.target = Some(next);
        self.last_nudge = Some(now);
        next
    }

    /// Hands out the accumulated target once the quiet window has lapsed.
    pub fn take_ready(&mut self, now: Instant) -> Option<Duration> {
        let target = self.target?;
        let last = self.last_nudge?;
        if now.duration_since(last) >= self.config.accumulate_interval {
            self.target = None;
            self.last_nudge = None;
            Some(target)
        } else {
            None
        }
    }

    /// Target accumulated so far, if any.
    pub fn pending(&self) -> Option<Duration> {
        self.target
    }
}
