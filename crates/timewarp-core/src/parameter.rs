//! Parameter ranges and host-normalized scaling.
//!
//! Hosts automate in normalized `0.0..=1.0`; the effect works in real units.
//! A [`ParameterRange`] converts between the two and clamps out-of-range
//! input at the boundary, so the real-time core never has to.
//!
//! # Example
//!
//! ```
//! use timewarp_core::{ParameterRange, ParameterScale};
//!
//! // Sync multiplier: 1x to 32x, linear
//! let sync = ParameterRange::linear(1.0, 32.0, 1.0);
//! assert_eq!(sync.denormalize(0.0), 1.0);
//! assert_eq!(sync.clamp(64.0), 32.0);
//!
//! // Depth with extra resolution near zero
//! let depth = ParameterRange::exponential(0.0, 1.0, 1.0, 4.0);
//! assert_eq!(depth.denormalize(0.5), 0.0625);
//! ```

/// How a parameter value is scaled between normalized (0-1) and real values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParameterScale {
    /// `real = min + normalized * (max - min)`
    #[default]
    Linear,

    /// `real = min + normalized^curve * (max - min)`
    ///
    /// `curve > 1.0` gives more resolution at the low end.
    Exponential {
        curve: f32,
    },

    /// Values are quantized to integers between `min` and `max`.
    Integer,
}

/// Valid range, default, and scaling of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub scale: ParameterScale,
}

impl ParameterRange {
    /// `default` is clamped into the range.
    pub fn new(min: f32, max: f32, default: f32, scale: ParameterScale) -> Self {
        Self {
            min,
            max,
            default: default.clamp(min, max),
            scale,
        }
    }

    pub fn linear(min: f32, max: f32, default: f32) -> Self {
        Self::new(min, max, default, ParameterScale::Linear)
    }

    pub fn exponential(min: f32, max: f32, default: f32, curve: f32) -> Self {
        Self::new(min, max, default, ParameterScale::Exponential { curve })
    }

    pub fn integer(min: i32, max: i32, default: i32) -> Self {
        Self::new(
            min as f32,
            max as f32,
            default as f32,
            ParameterScale::Integer,
        )
    }

    /// Convert a real value to normalized (0.0-1.0).
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        let value = self.clamp(value);
        let range = self.span();

        if range <= 0.0 {
            return 0.0;
        }

        match self.scale {
            ParameterScale::Linear => (value - self.min) / range,

            ParameterScale::Exponential { curve } => {
                let linear = (value - self.min) / range;
                if curve <= 0.0 || curve == 1.0 {
                    linear
                } else {
                    linear.powf(1.0 / curve)
                }
            }

            ParameterScale::Integer => (value.round() - self.min) / range,
        }
    }

    /// Convert a normalized value (0.0-1.0) to a real value.
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        let normalized = normalized.clamp(0.0, 1.0);
        let range = self.span();

        match self.scale {
            ParameterScale::Linear => self.min + normalized * range,

            ParameterScale::Exponential { curve } => {
                let shaped = if curve <= 0.0 || curve == 1.0 {
                    normalized
                } else {
                    normalized.powf(curve)
                };
                self.min + shaped * range
            }

            ParameterScale::Integer => (self.min + normalized * range).round(),
        }
    }

    /// Clamp a real value to this parameter's range.
    ///
    /// NaN maps to the default.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        let clamped = value.clamp(self.min, self.max);
        match self.scale {
            ParameterScale::Integer => clamped.round(),
            _ => clamped,
        }
    }

    #[inline]
    pub fn default_normalized(&self) -> f32 {
        self.normalize(self.default)
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    #[inline]
    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self::linear(0.0, 1.0, 0.5)
    }
}
