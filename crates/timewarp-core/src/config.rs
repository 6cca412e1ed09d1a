//! Processing configuration handed to the engine at prepare time.

use crate::{Error, Result};

pub const MIN_SAMPLE_RATE: f64 = 8000.0;
pub const MAX_SAMPLE_RATE: f64 = 384000.0;

/// Mono or stereo, input layout equal to output layout.
pub const MAX_CHANNELS: usize = 2;

/// Host processing configuration.
///
/// Changes are only legal while the engine is not running; the engine applies
/// them through its prepare transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f64,
    pub max_block_size: usize,
    pub channels: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            max_block_size: 512,
            channels: 2,
        }
    }
}

impl EngineConfig {
    pub fn new(sample_rate: f64, max_block_size: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            channels,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite()
            || self.sample_rate < MIN_SAMPLE_RATE
            || self.sample_rate > MAX_SAMPLE_RATE
        {
            return Err(Error::InvalidSampleRate(self.sample_rate));
        }
        if self.max_block_size == 0 {
            return Err(Error::InvalidBlockSize(self.max_block_size));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(Error::UnsupportedChannelCount(self.channels));
        }
        Ok(())
    }
}
