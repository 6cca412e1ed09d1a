//! Test helpers and fixtures for timewarp integration tests
//!
//! Engines run offline: blocks are pushed through `process` by hand, so every
//! test is deterministic and needs no audio device.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (pure delay, dry pass-through)
//! - `STAIRCASE_STEP` (1.0): Curve-shaped reads of a staircase
//! - `OVERSAMPLED_EPSILON` (0.02): Anything through the linear oversampler
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use timewarp::prelude::*;
use timewarp::{Bypass, LinearOversampler};

/// Rate at which A4 has a period of exactly 100 samples.
pub const TEST_SAMPLE_RATE: f64 = 44_000.0;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 64;

/// A4, period 100 samples at [`TEST_SAMPLE_RATE`].
pub const A4: u8 = 69;

/// Mono engine without oversampling, prepared at the test rate.
pub fn bypass_engine() -> (WarpEngine<Bypass>, WarpController) {
    TimeWarpBuilder::default()
        .config(EngineConfig::new(TEST_SAMPLE_RATE, TEST_BUFFER_SIZE, 1))
        .build_with(Bypass)
        .expect("Failed to create test engine")
}

/// Engine with the default 4x linear oversampler.
pub fn oversampled_engine(channels: usize) -> (WarpEngine<LinearOversampler>, WarpController) {
    TimeWarpBuilder::default()
        .config(EngineConfig::new(TEST_SAMPLE_RATE, TEST_BUFFER_SIZE, channels))
        .build()
        .expect("Failed to create test engine")
}

/// Runs a mono signal through `engine` in [`TEST_BUFFER_SIZE`] blocks.
///
/// `events` are delivered with the first block only.
pub fn render_mono<R: timewarp::Resampler>(
    engine: &mut WarpEngine<R>,
    input: &[f32],
    events: &[MidiEvent],
) -> Vec<f32> {
    let mut output = input.to_vec();
    for (index, block) in output.chunks_mut(TEST_BUFFER_SIZE).enumerate() {
        let block_events = if index == 0 { events } else { &[] };
        engine.process(&mut [block], block_events);
    }
    output
}

/// Runs a stereo pair through `engine` in [`TEST_BUFFER_SIZE`] blocks.
pub fn render_stereo<R: timewarp::Resampler>(
    engine: &mut WarpEngine<R>,
    left: &[f32],
    right: &[f32],
    events: &[MidiEvent],
) -> (Vec<f32>, Vec<f32>) {
    let mut out_left = left.to_vec();
    let mut out_right = right.to_vec();
    for (index, (l, r)) in out_left
        .chunks_mut(TEST_BUFFER_SIZE)
        .zip(out_right.chunks_mut(TEST_BUFFER_SIZE))
        .enumerate()
    {
        let block_events = if index == 0 { events } else { &[] };
        engine.process(&mut [l, r], block_events);
    }
    (out_left, out_right)
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Generate an integer staircase signal [0, 1, 2, ..., n-1] as f32.
///
/// Each sample equals its index, so a delayed read reveals exactly which
/// sample was fetched.
pub fn generate_integer_staircase(num_samples: usize) -> Vec<f32> {
    (0..num_samples).map(|i| i as f32).collect()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Index and values of the first pair further apart than `tolerance`.
pub fn first_mismatch(a: &[f32], b: &[f32], tolerance: f32) -> Option<(usize, f32, f32)> {
    a.iter()
        .zip(b)
        .enumerate()
        .find(|(_, (x, y))| (*x - *y).abs() > tolerance)
        .map(|(i, (x, y))| (i, *x, *y))
}
