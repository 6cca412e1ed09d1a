//! Real-time primitives shared by the timewarp crates.
//!
//! # Primary API
//!
//! - [`CrossThreadCell`]: double-buffered single-producer/single-consumer cell,
//!   split into a [`CellWriter`] and a [`CellReader`]
//! - [`BlockRamp`]: per-block linear parameter smoothing
//! - [`ParameterRange`]: normalized ↔ real conversion for host-facing parameters
//! - [`EngineConfig`]: sample rate / block size / channel layout validation
//!
//! # Example
//!
//! ```
//! use timewarp_core::CrossThreadCell;
//!
//! let (mut writer, mut reader) = CrossThreadCell::new(0.0f64).split();
//!
//! // control thread
//! *writer.write() = 0.25;
//! writer.mark_dirty();
//!
//! // audio thread
//! assert_eq!(*reader.read(), 0.25);
//! ```

pub mod error;
pub use error::{Error, Result};

mod config;
pub use config::{EngineConfig, MAX_CHANNELS, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};

pub(crate) mod lockfree;
pub use lockfree::{CellReader, CellWriter, CrossThreadCell, WriteGuard};

pub mod parameter;
pub use parameter::{ParameterRange, ParameterScale};

pub mod smooth;
pub use smooth::BlockRamp;
