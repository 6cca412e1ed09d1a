//! Pitch-synchronized time-warp distortion.
//!
//! A [`WarpEngine`] on the audio thread reads a delayed copy of its input at
//! an offset shaped by a user-drawn transfer curve, one cycle per period of
//! the played note. A [`WarpController`] on the control thread edits the
//! curve and parameters and polls phase and frequency for display. The two
//! halves only share lock-free cells.
//!
//! ```
//! use timewarp_core::EngineConfig;
//! use timewarp_dsp::{curve, warp_pair, Bypass, EngineControls};
//! use timewarp_midi::MidiEvent;
//!
//! let (mut engine, mut controller) =
//!     warp_pair(Bypass, &curve::identity_nodes(), EngineControls::default());
//! engine.prepare(EngineConfig::new(48_000.0, 256, 1))?;
//!
//! let mut block = vec![0.0f32; 256];
//! engine.process(&mut [&mut block[..]], &[MidiEvent::note_on(0, 0, 69, 100)]);
//! assert_eq!(controller.frequency(), 440.0);
//! # Ok::<(), timewarp_dsp::Error>(())
//! ```

mod error;
pub use error::{Error, Result};

pub mod curve;
pub use curve::{ControlNode, CurveEditor, TransferCurve};

mod delay_line;
pub use delay_line::{DelayLine, MAX_DELAY_CAPACITY};

mod resampler;
pub use resampler::{Bypass, LinearOversampler, Resampler, MAX_OVERSAMPLING};

mod params;
pub use params::{
    EffectParameters, EngineControls, ParamId, PitchReport, PitchRestore, MAX_BEND_RANGE,
};

mod engine;
pub use engine::{
    EngineState, WarpEngine, BASE_DELAY_SAMPLES, FALLBACK_FREQUENCY_HZ, MIN_OSCILLATOR_HZ,
};

mod controller;
pub use controller::WarpController;

mod state;
pub use state::WarpState;

use timewarp_core::CrossThreadCell;

/// Oversampling factor used when none is configured.
pub const DEFAULT_OVERSAMPLING: usize = 4;

/// Creates a connected engine/controller pair.
///
/// `controls` is clamped the same way the controller's setters clamp.
pub fn warp_pair<R: Resampler>(
    resampler: R,
    nodes: &[ControlNode],
    controls: EngineControls,
) -> (WarpEngine<R>, WarpController) {
    let controls = EngineControls {
        parameters: controls.parameters.clamped(),
        bend_range: params::clamp_bend_range(controls.bend_range),
        pitch_restore: controls.pitch_restore,
    };

    let (editor, curve) = curve::curve_pair(nodes);
    let (controls_writer, controls_reader) = CrossThreadCell::new(controls).split();
    let (phase_writer, phase_reader) = CrossThreadCell::new(0.0).split();
    let (frequency_writer, frequency_reader) = CrossThreadCell::new(0.0).split();
    let (pitch_writer, pitch_reader) = CrossThreadCell::new(PitchReport::default()).split();

    let engine = WarpEngine::new(
        resampler,
        curve,
        controls_reader,
        phase_writer,
        frequency_writer,
        pitch_writer,
    );
    let controller = WarpController {
        curve: editor,
        controls: controls_writer,
        phase: phase_reader,
        frequency: frequency_reader,
        pitch: pitch_reader,
        restore_serial: controls.pitch_restore.map_or(0, |restore| restore.serial),
    };

    (engine, controller)
}
