//! Tolerance constants for warp testing.
//!
//! Different operations require different precision levels.

/// Floating point rounding errors (pure delay through the bypass resampler).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// One staircase step. Read positions are floored, so a position that lands
/// a hair under an integer may read the previous sample.
pub const STAIRCASE_STEP: f32 = 1.0;

/// Oversampled round trip of a slow sine. Covers the sub-sample group delay
/// of the linear oversampler.
pub const OVERSAMPLED_EPSILON: f32 = 0.02;

/// Pitch tolerance in Hz for bent notes.
pub const PITCH_EPSILON_HZ: f64 = 0.5;

/// Silence threshold (~-80dB).
/// Values below this are considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.0001;
