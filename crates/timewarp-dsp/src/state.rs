//! Persistable effect state.
//!
//! [`WarpState`] is what a host saves with a session: the parameters, the
//! curve, and the held pitch. The byte format belongs to the host; the type
//! only implements `serde`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::controller::WarpController;
use crate::curve::{sort_nodes, ControlNode};
use crate::error::{Error, Result};
use crate::params::EffectParameters;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarpState {
    #[serde(default)]
    pub parameters: EffectParameters,
    #[serde(default)]
    pub control_nodes: Vec<ControlNode>,
    /// Held pitch in Hz, absent if no note had been played.
    #[serde(default)]
    pub last_frequency: Option<f64>,
}

impl WarpState {
    /// Rejects non-finite parameters or node coordinates.
    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()?;

        if let Some(index) = self.control_nodes.iter().position(|node| !node.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "control node {index} has a non-finite coordinate"
            )));
        }
        Ok(())
    }
}

impl WarpController {
    /// Captures the current state without touching the engine.
    pub fn snapshot(&mut self) -> WarpState {
        let state = WarpState {
            parameters: self.parameters(),
            control_nodes: self.control_nodes().to_vec(),
            last_frequency: self.last_known_frequency(),
        };
        debug!(
            nodes = state.control_nodes.len(),
            last_frequency = ?state.last_frequency,
            "state snapshot"
        );
        state
    }

    /// Installs a saved state.
    ///
    /// Nodes are stable-sorted and replace the curve wholesale; an empty node
    /// list leaves the curve alone. Parameters are clamped. A saved pitch is
    /// queued for the engine's next block; a missing one leaves the held
    /// pitch alone.
    pub fn restore(&mut self, state: &WarpState) -> Result<()> {
        state.validate()?;

        if !state.control_nodes.is_empty() {
            let mut nodes = state.control_nodes.clone();
            sort_nodes(&mut nodes);
            self.curve.set_control_nodes(&nodes);
        }

        self.set_parameters(state.parameters);

        if let Some(hz) = state.last_frequency {
            self.queue_pitch_restore(hz);
        }

        debug!(
            nodes = state.control_nodes.len(),
            last_frequency = ?state.last_frequency,
            "state restored"
        );
        Ok(())
    }
}
