#![forbid(unsafe_code)]

//! Pure time-to-value tween sampler.
//!
//! A [`Tween`] knows its endpoints, duration, and curve. It holds no clock:
//! callers pass elapsed time to [`Tween::sample`] and get the value for that
//! instant. The runtime's frame-driven `animate` is built on top of this.
//!
//! # Invariants
//!
//! 1. `sample(0)` yields the start value; any elapsed time `≥ duration`
//!    yields exactly the end value with `complete == true`.
//! 2. Progress `t` is monotonically non-decreasing in elapsed time.
//!
//! # Failure Modes
//!
//! - Zero or sub-millisecond duration: clamped to 1ms to avoid division by
//!   zero.

use std::time::Duration;

use super::{Easing, Lerp};

/// Default tween duration (0.8s).
pub const DEFAULT_DURATION: Duration = Duration::from_millis(800);

/// Smallest duration a tween runs for.
pub const MIN_DURATION: Duration = Duration::from_millis(1);

/// Duration and curve for one tween.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenOptions {
    pub duration: Duration,
    pub easing: Easing,
}

impl Default for TweenOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            easing: Easing::EaseInOut,
        }
    }
}

impl TweenOptions {
    #[must_use]
    pub const fn new(duration: Duration, easing: Easing) -> Self {
        Self { duration, easing }
    }

    /// Duration given in seconds; negative or non-finite values clamp to the
    /// minimum duration and values too large for a `Duration` saturate.
    #[must_use]
    pub fn secs(seconds: f64, easing: Easing) -> Self {
        let duration = if seconds.is_finite() && seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self::new(duration, easing)
    }

    #[must_use]
    pub const fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub const fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// The value of a tween at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct TweenSample<T> {
    pub value: T,
    /// Normalized time in [0, 1].
    pub progress: f64,
    pub complete: bool,
}

/// Interpolation from `start` to `end` over a fixed duration.
#[derive(Debug, Clone)]
pub struct Tween<T> {
    from: T,
    to: T,
    duration: Duration,
    easing: Easing,
}

impl<T: Lerp + Clone> Tween<T> {
    #[must_use]
    pub fn new(from: T, to: T, options: TweenOptions) -> Self {
        Self {
            from,
            to,
            duration: options.duration.max(MIN_DURATION),
            easing: options.easing,
        }
    }

    /// Effective duration (after clamping).
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Start value.
    #[must_use]
    pub const fn start(&self) -> &T {
        &self.from
    }

    /// End value.
    #[must_use]
    pub const fn end(&self) -> &T {
        &self.to
    }

    /// Sample the tween `elapsed` after its start.
    #[must_use]
    pub fn sample(&self, elapsed: Duration) -> TweenSample<T> {
        let t = (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0);
        if t >= 1.0 {
            return TweenSample {
                value: self.to.clone(),
                progress: 1.0,
                complete: true,
            };
        }
        let eased = self.easing.apply(t);
        TweenSample {
            value: self.from.lerp(&self.to, eased),
            progress: t,
            complete: false,
        }
    }
}
