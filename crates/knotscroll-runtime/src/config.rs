#![forbid(unsafe_code)]

//! Tunable constants for the letter scroll.
//!
//! [`ScrollConfig::default()`] reproduces the stock timings and geometry.
//! With the `config-file` feature the same struct loads from TOML; missing
//! keys keep their defaults and durations are written in seconds.
//!
//! ```toml
//! untie_threshold = 160.0
//! hold_duration = 0.5
//! open_duration = 1.5
//!
//! [announcements]
//! reading = "Scroll to the end to close the letter."
//! ```
//!
//! # Failure Modes
//!
//! - Unreadable file: [`ConfigError::Io`].
//! - Malformed TOML, unknown keys, negative durations: [`ConfigError::Toml`].
//! - Values that parse but make no sense (zero durations, a threshold of 0,
//!   a trigger outside (0, 1]): [`ConfigError::Validation`] listing every
//!   problem found.

#[cfg(feature = "config-file")]
use std::path::Path;
use std::time::Duration;

use knotscroll_core::event::KeyCode;
use knotscroll_core::particles::PetalFieldConfig;
use thiserror::Error;

use crate::machine::Announcements;

/// Errors that can occur when loading a scroll configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scroll config: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config-file")]
    #[error("failed to parse scroll config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid scroll config: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Timings, thresholds, and geometry for one letter scroll.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(default, deny_unknown_fields))]
pub struct ScrollConfig {
    /// Summed drag distance (px) that unties the knot.
    pub untie_threshold: f64,
    /// How long the hold key must stay down to untie.
    #[cfg_attr(feature = "config-file", serde(with = "secs"))]
    pub hold_duration: Duration,
    pub hold_key: KeyCode,

    #[cfg_attr(feature = "config-file", serde(with = "secs"))]
    pub open_duration: Duration,
    #[cfg_attr(feature = "config-file", serde(with = "secs"))]
    pub close_duration: Duration,
    /// Pause in `ReKnotting` before returning to `Closed`.
    #[cfg_attr(feature = "config-file", serde(with = "secs"))]
    pub reknot_delay: Duration,

    /// Reading progress that arms auto-close.
    pub auto_close_progress: f64,
    /// How long progress must stay at the trigger before closing.
    #[cfg_attr(feature = "config-file", serde(with = "secs"))]
    pub auto_close_grace: Duration,

    /// Max knot-half translation (px) while dragging.
    pub knot_spread: f64,
    /// Max knot-half rotation (deg) while dragging.
    pub knot_tilt: f64,
    pub knot_untie_spread: f64,
    pub knot_untie_tilt: f64,
    #[cfg_attr(feature = "config-file", serde(with = "secs"))]
    pub knot_reset_duration: Duration,
    #[cfg_attr(feature = "config-file", serde(with = "secs"))]
    pub knot_untie_duration: Duration,
    #[cfg_attr(feature = "config-file", serde(with = "secs"))]
    pub knot_fade_duration: Duration,
    /// Delay after which the knot is forced fully transparent.
    #[cfg_attr(feature = "config-file", serde(with = "secs"))]
    pub knot_hard_fade_delay: Duration,

    /// Rod rotation (deg) at full open.
    pub rod_open_angle: f64,
    /// Extra rod rotation (deg) across the full reading range.
    pub rod_scroll_rotation: f64,
    pub wave_amplitude: f64,
    pub min_paper_height: f64,
    /// Share of the viewport height added to the content height.
    pub paper_viewport_ratio: f64,

    pub opening_petals: usize,
    /// Reading population; clamped to 3..=6 by the petal field.
    pub reading_petals: usize,
    #[cfg_attr(feature = "config-file", serde(with = "secs"))]
    pub reading_spawn_interval: Duration,
    /// Fixed RNG seed for the petals; `None` seeds from the OS.
    pub petal_seed: Option<u64>,

    /// Enter `Opening` as soon as the scroll starts.
    pub initial_open: bool,
    pub announcements: Announcements,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            untie_threshold: 120.0,
            hold_duration: Duration::from_millis(700),
            hold_key: KeyCode::Space,
            open_duration: Duration::from_millis(1200),
            close_duration: Duration::from_millis(1000),
            reknot_delay: Duration::from_millis(600),
            auto_close_progress: 0.98,
            auto_close_grace: Duration::from_millis(600),
            knot_spread: 24.0,
            knot_tilt: 15.0,
            knot_untie_spread: 28.0,
            knot_untie_tilt: 18.0,
            knot_reset_duration: Duration::from_millis(300),
            knot_untie_duration: Duration::from_millis(300),
            knot_fade_duration: Duration::from_millis(250),
            knot_hard_fade_delay: Duration::from_millis(400),
            rod_open_angle: 220.0,
            // One and a fifth turns.
            rod_scroll_rotation: 432.0,
            wave_amplitude: 3.0,
            min_paper_height: 420.0,
            paper_viewport_ratio: 0.8,
            opening_petals: 10,
            reading_petals: 4,
            reading_spawn_interval: Duration::from_millis(1200),
            petal_seed: None,
            initial_open: false,
            announcements: Announcements::default(),
        }
    }
}

impl ScrollConfig {
    /// Load from a TOML string and validate.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validated()
    }

    /// Load from a TOML file on disk and validate.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML.
    #[cfg(feature = "config-file")]
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Every problem with this config. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(self.untie_threshold.is_finite() && self.untie_threshold > 0.0) {
            errors.push(format!(
                "untie_threshold must be positive, got {}",
                self.untie_threshold
            ));
        }
        if !(self.auto_close_progress > 0.0 && self.auto_close_progress <= 1.0) {
            errors.push(format!(
                "auto_close_progress must be in (0, 1], got {}",
                self.auto_close_progress
            ));
        }
        for (name, value) in [
            ("hold_duration", self.hold_duration),
            ("open_duration", self.open_duration),
            ("close_duration", self.close_duration),
            ("reknot_delay", self.reknot_delay),
            ("auto_close_grace", self.auto_close_grace),
            ("knot_reset_duration", self.knot_reset_duration),
            ("knot_untie_duration", self.knot_untie_duration),
            ("knot_fade_duration", self.knot_fade_duration),
            ("knot_hard_fade_delay", self.knot_hard_fade_delay),
            ("reading_spawn_interval", self.reading_spawn_interval),
        ] {
            if value.is_zero() {
                errors.push(format!("{name} must be positive"));
            }
        }
        if self.reading_petals == 0 {
            errors.push("reading_petals must be at least 1".to_owned());
        }
        if !(self.min_paper_height.is_finite() && self.min_paper_height >= 0.0) {
            errors.push(format!(
                "min_paper_height must be non-negative, got {}",
                self.min_paper_height
            ));
        }
        errors
    }

    /// `self` if valid, otherwise every problem as [`ConfigError::Validation`].
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Petal field settings derived from this config.
    #[must_use]
    pub fn petal_field(&self) -> PetalFieldConfig {
        PetalFieldConfig {
            opening_count: self.opening_petals,
            reading_count: self.reading_petals,
            spawn_interval: self.reading_spawn_interval.as_secs_f64(),
        }
    }

    #[must_use]
    pub fn with_untie_threshold(mut self, px: f64) -> Self {
        self.untie_threshold = px;
        self
    }

    #[must_use]
    pub fn with_hold(mut self, key: KeyCode, duration: Duration) -> Self {
        self.hold_key = key;
        self.hold_duration = duration;
        self
    }

    #[must_use]
    pub fn with_open_duration(mut self, duration: Duration) -> Self {
        self.open_duration = duration;
        self
    }

    #[must_use]
    pub fn with_close_duration(mut self, duration: Duration) -> Self {
        self.close_duration = duration;
        self
    }

    #[must_use]
    pub fn with_reknot_delay(mut self, delay: Duration) -> Self {
        self.reknot_delay = delay;
        self
    }

    #[must_use]
    pub fn with_auto_close(mut self, progress: f64, grace: Duration) -> Self {
        self.auto_close_progress = progress;
        self.auto_close_grace = grace;
        self
    }

    #[must_use]
    pub fn with_petal_seed(mut self, seed: u64) -> Self {
        self.petal_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_initial_open(mut self, open: bool) -> Self {
        self.initial_open = open;
        self
    }

    #[must_use]
    pub fn with_announcements(mut self, announcements: Announcements) -> Self {
        self.announcements = announcements;
        self
    }
}

/// Durations as fractional seconds.
#[cfg(feature = "config-file")]
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Keeps the nanosecond count within `u64`.
    const MAX_SECONDS: f64 = 1.0e9;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        if !(seconds.is_finite() && (0.0..=MAX_SECONDS).contains(&seconds)) {
            return Err(serde::de::Error::custom(format!(
                "expected a non-negative number of seconds, got {seconds}"
            )));
        }
        // Round to whole nanoseconds so decimal inputs like 1.2 come back exact.
        Ok(Duration::from_nanos((seconds * 1e9).round() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScrollConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.untie_threshold, 120.0);
        assert_eq!(config.rod_scroll_rotation, 432.0);
        assert_eq!(config.hold_key, KeyCode::Space);
    }

    #[test]
    fn validation_lists_every_problem() {
        let config = ScrollConfig::default()
            .with_untie_threshold(0.0)
            .with_auto_close(1.5, Duration::ZERO);
        let errors = config.validate();
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("untie_threshold")));
        assert!(errors.iter().any(|e| e.contains("auto_close_progress")));
        assert!(errors.iter().any(|e| e.contains("auto_close_grace")));
    }

    #[test]
    fn validated_wraps_errors() {
        let err = ScrollConfig {
            reading_petals: 0,
            ..ScrollConfig::default()
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref list) if list.len() == 1));
        assert!(err.to_string().contains("reading_petals"));
    }

    #[test]
    fn nan_threshold_is_invalid() {
        let config = ScrollConfig::default().with_untie_threshold(f64::NAN);
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn petal_field_mirrors_config() {
        let field = ScrollConfig::default().petal_field();
        assert_eq!(field.opening_count, 10);
        assert_eq!(field.reading_count, 4);
        assert!((field.spawn_interval - 1.2).abs() < 1e-12);
    }

    #[cfg(feature = "config-file")]
    mod toml_loading {
        use super::*;
        use std::io::Write;

        #[test]
        fn partial_toml_keeps_defaults() {
            let config = ScrollConfig::from_toml_str(
                "untie_threshold = 80.0\nopen_duration = 2\n[announcements]\nreading = \"Read on\"\n",
            )
            .unwrap();
            assert_eq!(config.untie_threshold, 80.0);
            assert_eq!(config.open_duration, Duration::from_secs(2));
            assert_eq!(config.close_duration, Duration::from_secs(1));
            assert_eq!(config.announcements.reading, "Read on");
            assert_eq!(config.announcements.closed, Announcements::default().closed);
        }

        #[test]
        fn unknown_key_is_rejected() {
            let err = ScrollConfig::from_toml_str("untie_treshold = 80.0").unwrap_err();
            assert!(matches!(err, ConfigError::Toml(_)));
        }

        #[test]
        fn negative_duration_is_rejected() {
            let err = ScrollConfig::from_toml_str("hold_duration = -1.0").unwrap_err();
            assert!(matches!(err, ConfigError::Toml(_)));
        }

        #[test]
        fn zero_duration_fails_validation() {
            let err = ScrollConfig::from_toml_str("close_duration = 0.0").unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
        }

        #[test]
        fn loads_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "hold_key = \"Enter\"\ninitial_open = true").unwrap();
            let config = ScrollConfig::from_toml_file(file.path()).unwrap();
            assert_eq!(config.hold_key, KeyCode::Enter);
            assert!(config.initial_open);
        }

        #[test]
        fn missing_file_is_io_error() {
            let err = ScrollConfig::from_toml_file("/nonexistent/knotscroll.toml").unwrap_err();
            assert!(matches!(err, ConfigError::Io(_)));
        }

        #[test]
        fn round_trips_through_toml() {
            let config = ScrollConfig::default().with_petal_seed(9);
            let text = config.to_toml_string().unwrap();
            assert_eq!(ScrollConfig::from_toml_str(&text).unwrap(), config);
        }
    }
}
