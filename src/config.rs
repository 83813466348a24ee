//! Controller configuration, optionally loaded from a `cine.toml` file.

use snafu::{ensure, Snafu};

/// Error type for configuration validation.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[non_exhaustive]
pub enum ConfigError {
    /// minimum frames to play must be at least 1
    ZeroMinFrames,
    /// Frame rate bounds are inconsistent
    #[snafu(display("invalid frame rate bounds: min {}, default {}, max {}", min, default, max))]
    FrameRateBounds { min: f64, default: f64, max: f64 },
    /// Frame rate step is not positive
    #[snafu(display("invalid frame rate step {}", step))]
    FrameRateStep { step: f64 },
}

/// Limits for user-selectable frame rates.
///
/// These mirror the toolbar slider: 1 to 90 fps in steps of 1, starting at 24.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameRateLimits {
    /// Slowest selectable rate (fps)
    pub min: f64,
    /// Fastest selectable rate (fps)
    pub max: f64,
    /// Slider increment (fps)
    pub step: f64,
    /// Rate used when none has been chosen
    pub default: f64,
}

impl Default for FrameRateLimits {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 90.0,
            step: 1.0,
            default: 24.0,
        }
    }
}

impl FrameRateLimits {
    /// Snap `rate` to the step grid (anchored at `min`) and clamp it to
    /// `[min, max]`.
    ///
    /// Non-finite input yields the default rate.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use cine_core_view::FrameRateLimits;
    ///
    /// let limits = FrameRateLimits::default();
    /// assert_eq!(limits.clamp(12.4), 12.0);
    /// assert_eq!(limits.clamp(500.0), 90.0);
    /// assert_eq!(limits.clamp(0.0), 1.0);
    /// assert_eq!(limits.clamp(f64::NAN), 24.0);
    /// ```
    pub fn clamp(&self, rate: f64) -> f64 {
        if !rate.is_finite() {
            return self.default;
        }
        let snapped = if self.step > 0.0 {
            self.min + ((rate - self.min) / self.step).round() * self.step
        } else {
            rate
        };
        snapped.max(self.min).min(self.max)
    }
}

/// Configuration for [`CineController`](crate::CineController).
///
/// All fields are optional in TOML; missing ones take their defaults.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CineConfig {
    /// Viewports with fewer frames than this are never played
    pub min_frames_to_play: usize,
    /// Selectable frame rate range
    pub frame_rate: FrameRateLimits,
}

impl Default for CineConfig {
    fn default() -> Self {
        Self {
            min_frames_to_play: 2,
            frame_rate: FrameRateLimits::default(),
        }
    }
}

impl CineConfig {
    /// Parse a `cine.toml` string into `CineConfig`.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(self.min_frames_to_play >= 1, ZeroMinFramesSnafu);

        let FrameRateLimits {
            min,
            max,
            step,
            default,
        } = self.frame_rate;
        ensure!(
            min.is_finite() && max.is_finite() && min > 0.0 && min <= default && default <= max,
            FrameRateBoundsSnafu { min, default, max }
        );
        ensure!(step.is_finite() && step > 0.0, FrameRateStepSnafu { step });
        Ok(())
    }
}
