//! Builder for configuring and constructing a warp engine and its controller.

use timewarp_core::EngineConfig;
use timewarp_dsp::curve::{identity_nodes, sort_nodes};
use timewarp_dsp::{
    warp_pair, ControlNode, EffectParameters, EngineControls, LinearOversampler, Resampler,
    WarpController, WarpEngine, DEFAULT_OVERSAMPLING,
};
use timewarp_midi::DEFAULT_BEND_RANGE;
use tracing::debug;

use crate::Result;

/// The engine is created unprepared unless [`config`](Self::config) is set,
/// in which case `build` also runs the prepare transition.
///
/// # Example
///
/// ```
/// use timewarp::prelude::*;
///
/// let (engine, controller) = TimeWarpBuilder::default()
///     .oversampling(2)
///     .bend_range(2.0)
///     .config(EngineConfig::new(48_000.0, 512, 2))
///     .build()?;
///
/// assert_eq!(engine.state(), EngineState::Prepared);
/// assert_eq!(engine.oversampling_factor(), 2);
/// assert_eq!(controller.bend_range(), 2.0);
/// # Ok::<(), timewarp::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TimeWarpBuilder {
    oversampling: usize,
    bend_range: f64,
    control_nodes: Vec<ControlNode>,
    parameters: EffectParameters,
    config: Option<EngineConfig>,
}

impl Default for TimeWarpBuilder {
    fn default() -> Self {
        Self {
            oversampling: DEFAULT_OVERSAMPLING,
            bend_range: DEFAULT_BEND_RANGE,
            control_nodes: identity_nodes(),
            parameters: EffectParameters::default(),
            config: None,
        }
    }
}

impl TimeWarpBuilder {
    /// Default: 4. Must be within `1..=16`.
    pub fn oversampling(mut self, factor: usize) -> Self {
        self.oversampling = factor;
        self
    }

    /// Pitch-bend range in semitones. Default: 48.
    pub fn bend_range(mut self, semitones: f64) -> Self {
        self.bend_range = semitones;
        self
    }

    /// Initial transfer curve. Default: the identity line.
    pub fn control_nodes(mut self, nodes: impl Into<Vec<ControlNode>>) -> Self {
        self.control_nodes = nodes.into();
        self
    }

    pub fn parameters(mut self, parameters: EffectParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Prepare the engine for this configuration as part of `build`.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds with the linear oversampler at the configured factor.
    pub fn build(self) -> Result<(WarpEngine<LinearOversampler>, WarpController)> {
        let resampler = LinearOversampler::new(self.oversampling)?;
        self.build_with(resampler)
    }

    /// Builds with a caller-supplied resampler. The `oversampling` setting is
    /// ignored in favour of the resampler's own factor.
    pub fn build_with<R: Resampler>(self, resampler: R) -> Result<(WarpEngine<R>, WarpController)> {
        self.parameters.validate()?;

        let mut nodes = if self.control_nodes.is_empty() {
            identity_nodes()
        } else {
            self.control_nodes
        };
        if let Some(index) = nodes.iter().position(|node| !node.is_finite()) {
            return Err(timewarp_dsp::Error::InvalidParameter(format!(
                "control node {index} has a non-finite coordinate"
            ))
            .into());
        }
        sort_nodes(&mut nodes);

        let controls = EngineControls {
            parameters: self.parameters,
            bend_range: self.bend_range,
            pitch_restore: None,
        };
        let (mut engine, controller) = warp_pair(resampler, &nodes, controls);

        if let Some(config) = self.config {
            engine.prepare(config)?;
        }

        debug!(
            oversampling = engine.oversampling_factor(),
            nodes = nodes.len(),
            prepared = self.config.is_some(),
            "time-warp built"
        );
        Ok((engine, controller))
    }
}
