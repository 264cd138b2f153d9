//! # Frame Time
//!
//! The host-supplied clock driving cook requests.
//!
//! ## Design
//!
//! Time is a rational: an integer `value` over an integer `scale` (units per
//! second). This keeps host frame boundaries exact at any frame rate; a
//! 60 Hz host submits `value` steps of 1000 against a scale of 60000.

use serde::{Deserialize, Serialize};

/// Who drives the external engine's clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    /// The host supplies the time of every cook request.
    #[default]
    External,
    /// The external engine free-runs on its own clock.
    Internal,
}

/// A point on the host timeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameTime {
    /// Elapsed units since the instance started.
    pub value: i64,
    /// Units per second.
    pub scale: u32,
}

impl FrameTime {
    /// Common scale giving exact steps for 24/25/30/60 Hz hosts.
    pub const DEFAULT_SCALE: u32 = 60_000;

    /// Creates a frame time from a value and scale.
    #[inline]
    #[must_use]
    pub const fn new(value: i64, scale: u32) -> Self {
        Self { value, scale }
    }

    /// Time zero at the default scale.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            value: 0,
            scale: Self::DEFAULT_SCALE,
        }
    }

    /// Advances by one frame at the given frames-per-second rate.
    ///
    /// Returns the advanced time; `self` is unchanged.
    #[must_use]
    pub const fn step(self, fps: u32) -> Self {
        let increment = if fps == 0 {
            0
        } else {
            (self.scale / fps) as i64
        };
        Self {
            value: self.value + increment,
            scale: self.scale,
        }
    }

    /// Converts to seconds, for logging only.
    #[must_use]
    pub fn as_seconds(self) -> f64 {
        if self.scale == 0 {
            0.0
        } else {
            self.value as f64 / f64::from(self.scale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_is_exact_at_60hz() {
        let mut t = FrameTime::zero();
        for _ in 0..60 {
            t = t.step(60);
        }
        assert_eq!(t.value, i64::from(FrameTime::DEFAULT_SCALE));
        assert!((t.as_seconds() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_fps_does_not_advance() {
        let t = FrameTime::zero().step(0);
        assert_eq!(t.value, 0);
    }
}
