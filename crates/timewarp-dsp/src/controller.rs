//! Control-thread handle for a running [`WarpEngine`](crate::WarpEngine).
//!
//! Everything here is the boundary of the effect: values are clamped before
//! they are published, so the engine never re-validates them.

use timewarp_core::{CellReader, CellWriter};
use timewarp_midi::PitchTracker;

use crate::curve::{ControlNode, CurveEditor};
use crate::params::{
    clamp_bend_range, EffectParameters, EngineControls, ParamId, PitchReport, PitchRestore,
};

/// Edits the curve and parameters and polls what the engine publishes.
///
/// Not `Clone`: there is exactly one writer for each engine input.
#[derive(Debug)]
pub struct WarpController {
    pub(crate) curve: CurveEditor,
    pub(crate) controls: CellWriter<EngineControls>,
    pub(crate) phase: CellReader<f64>,
    pub(crate) frequency: CellReader<f64>,
    pub(crate) pitch: CellReader<PitchReport>,
    pub(crate) restore_serial: u64,
}

impl WarpController {
    /// Publishes a new curve, stable-sorted by `x`. Empty input is ignored.
    pub fn set_control_nodes(&mut self, nodes: &[ControlNode]) -> bool {
        self.curve.set_control_nodes(nodes)
    }

    /// The curve as edited, including edits the engine has not adopted yet.
    pub fn control_nodes(&self) -> &[ControlNode] {
        self.curve.nodes()
    }

    /// Current parameter targets.
    pub fn parameters(&self) -> EffectParameters {
        self.controls.peek().parameters
    }

    pub fn set_parameters(&mut self, parameters: EffectParameters) {
        let parameters = parameters.clamped();
        self.update(|controls| controls.parameters = parameters);
    }

    /// Sets one parameter in real units, clamped to its range.
    pub fn set_parameter(&mut self, param: ParamId, value: f32) {
        self.update(|controls| controls.parameters.set(param, value));
    }

    /// Sets one parameter from a host-normalized `0.0..=1.0` value.
    pub fn set_normalized(&mut self, param: ParamId, normalized: f32) {
        self.set_parameter(param, param.range().denormalize(normalized));
    }

    pub fn normalized(&self, param: ParamId) -> f32 {
        param.range().normalize(self.parameters().get(param))
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.set_parameter(ParamId::Depth, depth);
    }

    pub fn set_sync(&mut self, sync: f32) {
        self.set_parameter(ParamId::Sync, sync);
    }

    pub fn set_dry_wet(&mut self, dry_wet: f32) {
        self.set_parameter(ParamId::DryWet, dry_wet);
    }

    /// Oscillator frequency multiplier `numerator / denominator`, each 1..=16.
    pub fn set_ratio(&mut self, numerator: u32, denominator: u32) {
        self.update(|controls| {
            controls.parameters.set(ParamId::Numerator, numerator as f32);
            controls.parameters.set(ParamId::Denominator, denominator as f32);
        });
    }

    pub fn bend_range(&self) -> f64 {
        self.controls.peek().bend_range
    }

    /// Pitch-bend range in semitones, clamped to `0..=96`.
    pub fn set_bend_range(&mut self, semitones: f64) {
        let semitones = clamp_bend_range(semitones);
        self.update(|controls| controls.bend_range = semitones);
    }

    /// Asks the engine to reinstate `hz` as the held pitch at the start of
    /// its next block.
    pub fn queue_pitch_restore(&mut self, hz: f64) {
        self.restore_serial += 1;
        let restore = PitchRestore {
            serial: self.restore_serial,
            frequency: hz,
        };
        self.update(|controls| controls.pitch_restore = Some(restore));
    }

    /// Oscillator phase in `[0, 1)` at the end of the last processed block.
    pub fn phase(&mut self) -> f64 {
        *self.phase.read()
    }

    /// Oscillator frequency in Hz of the last processed block, 0 before the
    /// first one.
    pub fn frequency(&mut self) -> f64 {
        *self.frequency.read()
    }

    /// Held pitch in Hz, suitable for persisting.
    ///
    /// A restore the engine has not applied yet is reported as it will be
    /// applied.
    pub fn last_known_frequency(&mut self) -> Option<f64> {
        let report = *self.pitch.read();
        if report.restore_serial < self.restore_serial {
            if let Some(restore) = self.controls.peek().pitch_restore {
                let mut tracker = PitchTracker::new();
                tracker.restore_frequency(restore.frequency);
                return tracker.last_known_frequency();
            }
        }
        report.frequency
    }

    /// Curve value at `phase` with the current depth and sync targets, for
    /// drawing. Does not touch the engine's copy of the curve.
    pub fn curve_value(&self, phase: f64) -> f64 {
        let parameters = self.parameters();
        self.curve.evaluate(phase, parameters.depth, parameters.sync)
    }

    fn update(&mut self, apply: impl FnOnce(&mut EngineControls)) {
        {
            let mut controls = self.controls.write();
            apply(&mut *controls);
        }
        self.controls.mark_dirty();
    }
}
