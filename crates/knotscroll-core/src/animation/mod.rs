#![forbid(unsafe_code)]

//! Easing curves and interpolation.
//!
//! All curves map normalized time `t ∈ [0, 1]` to eased progress with
//! `f(0) = 0` and `f(1) = 1`. Inputs outside the unit interval are clamped.
//!
//! | Curve        | Formula                                        |
//! |--------------|------------------------------------------------|
//! | `linear`     | `t`                                            |
//! | `ease_in`    | `t²`                                           |
//! | `ease_out`   | `1 − (1 − t)³`                                 |
//! | `ease_in_out`| `2t²` for `t < ½`, else `1 − (−2t + 2)² / 2`   |

pub mod tween;

pub use tween::{Tween, TweenOptions, TweenSample};

/// An easing function over normalized time.
pub type EasingFn = fn(f64) -> f64;

/// `t`
#[inline]
#[must_use]
pub fn linear(t: f64) -> f64 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in.
#[inline]
#[must_use]
pub fn ease_in(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Cubic ease-out.
#[inline]
#[must_use]
pub fn ease_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Quadratic ease-in-out.
#[inline]
#[must_use]
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Named or custom easing curve.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
    /// Caller-supplied curve.
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(EasingFn),
}

impl Easing {
    /// Apply the curve to normalized time `t`.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Self::Linear => linear(t),
            Self::EaseIn => ease_in(t),
            Self::EaseOut => ease_out(t),
            Self::EaseInOut => ease_in_out(t),
            Self::Custom(f) => f(t.clamp(0.0, 1.0)),
        }
    }
}

impl From<EasingFn> for Easing {
    fn from(f: EasingFn) -> Self {
        Self::Custom(f)
    }
}

/// Values a tween can interpolate.
pub trait Lerp: Sized {
    /// Value at eased progress `t` between `self` and `to`.
    ///
    /// `t` may leave [0, 1] for custom curves that overshoot.
    fn lerp(&self, to: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    #[inline]
    fn lerp(&self, to: &Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for f32 {
    #[inline]
    fn lerp(&self, to: &Self, t: f64) -> Self {
        self + (to - self) * t as f32
    }
}

impl Lerp for (f64, f64) {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        (self.0.lerp(&to.0, t), self.1.lerp(&to.1, t))
    }
}

/// A non-numeric value: holds the start value until progress reaches 1,
/// then snaps to the end value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Discrete<T>(pub T);

impl<T: Clone> Lerp for Discrete<T> {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        if t >= 1.0 { to.clone() } else { self.clone() }
    }
}
