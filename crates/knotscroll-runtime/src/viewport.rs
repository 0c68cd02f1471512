#![forbid(unsafe_code)]

//! Scroll position of the letter's content viewport.

/// Scroll metrics reported by the rendering layer, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollViewport {
    pub scroll_top: f64,
    /// Full content height.
    pub scroll_height: f64,
    /// Visible height.
    pub client_height: f64,
}

impl ScrollViewport {
    #[must_use]
    pub const fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    /// Largest reachable `scroll_top`.
    #[must_use]
    pub fn max_scroll(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    /// Reading progress in [0, 1]; 0 when nothing is scrollable.
    ///
    /// NaN metrics yield NaN, which the machine ignores.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.scroll_top.is_nan() || (self.scroll_height - self.client_height).is_nan() {
            return f64::NAN;
        }
        let max = self.max_scroll();
        if max <= 0.0 {
            return 0.0;
        }
        (self.scroll_top / max).clamp(0.0, 1.0)
    }
}
