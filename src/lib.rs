//! # Timewarp - Pitch-synchronized time-warp distortion
//!
//! A MIDI-driven effect that reads a delayed copy of its input at an offset
//! shaped by a user-drawn transfer curve, one curve cycle per period of the
//! played note. The result is a pitch-locked waveshaping in time rather than
//! amplitude.
//!
//! ## Architecture
//!
//! Timewarp is an umbrella crate that coordinates:
//! - **timewarp-core** - Lock-free cross-thread cells, parameter ranges, block smoothing
//! - **timewarp-midi** - MIDI events and note/pitch-bend tracking
//! - **timewarp-dsp** - Transfer curve, delay line, oversampling, the engine and its controller
//!
//! ## Quick Start
//!
//! ```
//! use timewarp::prelude::*;
//!
//! let (mut engine, mut controller) = TimeWarpBuilder::default()
//!     .config(EngineConfig::new(44_100.0, 256, 2))
//!     .build()?;
//!
//! // control thread: draw a curve
//! controller.set_control_nodes(&[
//!     ControlNode::new(0.0, 0.0),
//!     ControlNode::new(0.5, 1.0),
//!     ControlNode::new(1.0, 0.0),
//! ]);
//!
//! // audio thread: process a block with a note-on at frame 0
//! let mut left = vec![0.0f32; 256];
//! let mut right = vec![0.0f32; 256];
//! engine.process(&mut [&mut left[..], &mut right[..]], &[MidiEvent::note_on(0, 0, 57, 100)]);
//!
//! assert_eq!(controller.frequency(), 220.0);
//! # Ok::<(), timewarp::Error>(())
//! ```

/// Re-export of timewarp-core for direct access
pub use timewarp_core as core;

/// Re-export of timewarp-midi for direct access
pub use timewarp_midi as midi;

/// Re-export of timewarp-dsp for direct access
pub use timewarp_dsp as dsp;

pub use timewarp_core::{BlockRamp, CrossThreadCell, EngineConfig, ParameterRange};

pub use timewarp_midi::{MidiEvent, PitchTracker};

pub use timewarp_dsp::{
    curve, Bypass, ControlNode, EffectParameters, EngineState, LinearOversampler, ParamId,
    Resampler, WarpController, WarpEngine, WarpState,
};

mod error;
pub use error::{Error, Result};

mod builder;
pub use builder::TimeWarpBuilder;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::TimeWarpBuilder;
    pub use crate::{Error, Result};

    pub use timewarp_core::EngineConfig;
    pub use timewarp_midi::MidiEvent;

    pub use timewarp_dsp::{
        ControlNode, EffectParameters, EngineState, ParamId, WarpController, WarpEngine,
        WarpState,
    };
}
