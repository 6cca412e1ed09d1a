//! Effect parameters and the control block handed to the audio thread.

use serde::{Deserialize, Serialize};
use timewarp_core::ParameterRange;
use timewarp_midi::DEFAULT_BEND_RANGE;

use crate::error::{Error, Result};

/// Widest accepted pitch-bend range, in semitones.
pub const MAX_BEND_RANGE: f64 = 96.0;

/// Host-facing parameter identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Depth,
    Sync,
    DryWet,
    Numerator,
    Denominator,
}

impl ParamId {
    pub const ALL: [ParamId; 5] = [
        ParamId::Depth,
        ParamId::Sync,
        ParamId::DryWet,
        ParamId::Numerator,
        ParamId::Denominator,
    ];

    /// Stable identifier for automation and saved state.
    pub fn id(self) -> &'static str {
        match self {
            ParamId::Depth => "depth",
            ParamId::Sync => "sync",
            ParamId::DryWet => "dryWet",
            ParamId::Numerator => "numerator",
            ParamId::Denominator => "denominator",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParamId::Depth => "Depth",
            ParamId::Sync => "Sync",
            ParamId::DryWet => "Dry/Wet",
            ParamId::Numerator => "Numerator",
            ParamId::Denominator => "Denominator",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|param| param.id() == id)
    }

    /// Range, default, and host scaling.
    pub fn range(self) -> ParameterRange {
        match self {
            // skewed so most of the knob travel covers subtle depths
            ParamId::Depth => ParameterRange::exponential(0.0, 1.0, 1.0, 4.0),
            ParamId::Sync => ParameterRange::linear(1.0, 32.0, 1.0),
            ParamId::DryWet => ParameterRange::linear(0.0, 1.0, 1.0),
            ParamId::Numerator | ParamId::Denominator => ParameterRange::integer(1, 16, 1),
        }
    }
}

/// Target values set from the control thread. The engine ramps toward them
/// across each block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectParameters {
    /// Blend between identity (0) and the full curve (1).
    pub depth: f32,
    /// Curve repetitions per oscillator cycle.
    pub sync: f32,
    pub dry_wet: f32,
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            depth: 1.0,
            sync: 1.0,
            dry_wet: 1.0,
            numerator: 1,
            denominator: 1,
        }
    }
}

impl EffectParameters {
    pub fn get(&self, param: ParamId) -> f32 {
        match param {
            ParamId::Depth => self.depth,
            ParamId::Sync => self.sync,
            ParamId::DryWet => self.dry_wet,
            ParamId::Numerator => self.numerator as f32,
            ParamId::Denominator => self.denominator as f32,
        }
    }

    /// Sets a real value, clamped to the parameter's range.
    pub fn set(&mut self, param: ParamId, value: f32) {
        let value = param.range().clamp(value);
        match param {
            ParamId::Depth => self.depth = value,
            ParamId::Sync => self.sync = value,
            ParamId::DryWet => self.dry_wet = value,
            ParamId::Numerator => self.numerator = value as u32,
            ParamId::Denominator => self.denominator = value as u32,
        }
    }

    /// Every field clamped into range. NaN falls back to the default.
    pub fn clamped(self) -> Self {
        let mut out = self;
        for param in ParamId::ALL {
            out.set(param, self.get(param));
        }
        out
    }

    /// Oscillator multiplier `numerator / denominator`.
    #[inline]
    pub fn ratio(&self) -> f64 {
        f64::from(self.numerator.max(1)) / f64::from(self.denominator.max(1))
    }

    /// Rejects non-finite values. Range is not checked; use
    /// [`clamped`](Self::clamped) for that.
    pub fn validate(&self) -> Result<()> {
        for param in [ParamId::Depth, ParamId::Sync, ParamId::DryWet] {
            let value = self.get(param);
            if !value.is_finite() {
                return Err(Error::InvalidParameter(format!(
                    "{} must be finite, got {value}",
                    param.id()
                )));
            }
        }
        Ok(())
    }
}

/// Request to reinstate a persisted pitch. Applied once per `serial`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchRestore {
    pub serial: u64,
    pub frequency: f64,
}

/// Pitch as last seen by the audio thread, with the latest restore it has
/// applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchReport {
    pub restore_serial: u64,
    pub frequency: Option<f64>,
}

/// Everything the control thread hands the audio thread apart from the curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineControls {
    pub parameters: EffectParameters,
    /// Pitch-bend range in semitones.
    pub bend_range: f64,
    pub pitch_restore: Option<PitchRestore>,
}

impl Default for EngineControls {
    fn default() -> Self {
        Self {
            parameters: EffectParameters::default(),
            bend_range: DEFAULT_BEND_RANGE,
            pitch_restore: None,
        }
    }
}

/// Clamps a bend range into `0..=MAX_BEND_RANGE`. NaN yields the default.
pub fn clamp_bend_range(semitones: f64) -> f64 {
    if semitones.is_nan() {
        DEFAULT_BEND_RANGE
    } else {
        semitones.clamp(0.0, MAX_BEND_RANGE)
    }
}
