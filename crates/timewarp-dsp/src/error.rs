//! Error types for timewarp-dsp

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid oversampling factor: {0}. Must be between 1 and 16")]
    InvalidOversamplingFactor(usize),

    #[error(transparent)]
    Core(#[from] timewarp_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
