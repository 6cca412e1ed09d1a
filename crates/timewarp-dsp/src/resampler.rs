//! Oversampling stage around the warp.
//!
//! The engine upsamples each block, warps at the higher rate, and decimates
//! back. Anything implementing [`Resampler`] can sit there; the crate ships a
//! pass-through [`Bypass`] and a cheap [`LinearOversampler`].

use crate::error::{Error, Result};

/// Largest oversampling factor accepted by [`LinearOversampler`].
pub const MAX_OVERSAMPLING: usize = 16;

/// Integer-factor up/down sampler with per-channel state.
///
/// `upsample` writes `input.len() * factor()` samples; `downsample` reads
/// that many and writes `output.len()`. Both run on the audio thread and
/// must not allocate after [`prepare`](Self::prepare).
pub trait Resampler: Send {
    fn factor(&self) -> usize;

    /// Group delay at the host rate, reported upstream for compensation.
    fn latency_samples(&self) -> u32;

    /// Allocates per-channel state. Called from the control thread.
    fn prepare(&mut self, channels: usize, max_block_size: usize);

    /// Clears filter history without reallocating.
    fn reset(&mut self);

    fn upsample(&mut self, channel: usize, input: &[f32], output: &mut [f32]);

    fn downsample(&mut self, channel: usize, input: &[f32], output: &mut [f32]);
}

/// Factor 1, zero latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bypass;

impl Resampler for Bypass {
    fn factor(&self) -> usize {
        1
    }

    fn latency_samples(&self) -> u32 {
        0
    }

    fn prepare(&mut self, _channels: usize, _max_block_size: usize) {}

    fn reset(&mut self) {}

    fn upsample(&mut self, _channel: usize, input: &[f32], output: &mut [f32]) {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
    }

    fn downsample(&mut self, _channel: usize, input: &[f32], output: &mut [f32]) {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
    }
}

/// Placeholder oversampling collaborator: linear upsampling, boxcar
/// decimation.
///
/// Each host sample expands to `factor` points on the line from the previous
/// host sample; decimation averages each group of `factor`. This is not an
/// antialiasing stage. The boxcar only notches exact multiples of the host
/// rate, so content the warp pushes just above host Nyquist folds back only
/// about 4 dB down. Swap in a proper polyphase filter through [`Resampler`] where that
/// matters. The combined group delay stays under one host sample, so the
/// reported latency is 0.
#[derive(Debug, Clone)]
pub struct LinearOversampler {
    factor: usize,
    /// Last input sample per channel.
    history: Vec<f32>,
}

impl LinearOversampler {
    pub fn new(factor: usize) -> Result<Self> {
        if factor == 0 || factor > MAX_OVERSAMPLING {
            return Err(Error::InvalidOversamplingFactor(factor));
        }
        Ok(Self {
            factor,
            history: Vec::new(),
        })
    }
}

impl Default for LinearOversampler {
    fn default() -> Self {
        Self {
            factor: crate::DEFAULT_OVERSAMPLING,
            history: Vec::new(),
        }
    }
}

impl Resampler for LinearOversampler {
    fn factor(&self) -> usize {
        self.factor
    }

    fn latency_samples(&self) -> u32 {
        0
    }

    fn prepare(&mut self, channels: usize, _max_block_size: usize) {
        self.history = vec![0.0; channels];
    }

    fn reset(&mut self) {
        self.history.fill(0.0);
    }

    fn upsample(&mut self, channel: usize, input: &[f32], output: &mut [f32]) {
        let factor = self.factor;
        let step = 1.0 / factor as f32;
        let mut previous = self.history.get(channel).copied().unwrap_or(0.0);

        for (points, &sample) in output.chunks_exact_mut(factor).zip(input) {
            for (k, point) in points.iter_mut().enumerate() {
                *point = previous + (sample - previous) * (k + 1) as f32 * step;
            }
            previous = sample;
        }

        if let Some(last) = self.history.get_mut(channel) {
            *last = previous;
        }
    }

    fn downsample(&mut self, _channel: usize, input: &[f32], output: &mut [f32]) {
        let scale = 1.0 / self.factor as f32;
        for (out, group) in output.iter_mut().zip(input.chunks_exact(self.factor)) {
            *out = group.iter().sum::<f32>() * scale;
        }
    }
}
