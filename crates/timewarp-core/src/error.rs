//! Error types for timewarp-core.

use thiserror::Error;

/// Error type for timewarp-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid sample rate: {0}. Must be between 8000 and 384000 Hz")]
    InvalidSampleRate(f64),

    #[error("Invalid block size: {0}. Must be greater than zero")]
    InvalidBlockSize(usize),

    #[error("Unsupported channel count: {0}. Only mono and stereo are supported")]
    UnsupportedChannelCount(usize),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
