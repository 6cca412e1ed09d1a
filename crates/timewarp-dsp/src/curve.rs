//! Piecewise-linear transfer curve.
//!
//! The curve maps oscillator phase to a warped phase. It lives in a
//! [`CrossThreadCell`]: the control thread edits it through a
//! [`CurveEditor`], the audio thread evaluates it through a
//! [`TransferCurve`].
//!
//! ```
//! use timewarp_dsp::curve::{self, ControlNode};
//!
//! let triangle = [
//!     ControlNode::new(0.0, 0.0),
//!     ControlNode::new(0.5, 1.0),
//!     ControlNode::new(1.0, 0.0),
//! ];
//! assert_eq!(curve::evaluate_raw(&triangle, 0.25), 0.5);
//! assert_eq!(curve::evaluate(&triangle, 0.25, 0.0, 1.0), 0.25); // depth 0 is identity
//! ```

use serde::{Deserialize, Serialize};
use timewarp_core::{CellReader, CellWriter, CrossThreadCell};

/// Output of a curve with fewer than two nodes.
pub const NEUTRAL_VALUE: f64 = 0.5;

/// Node storage reserved on both sides of the cell, so typical edits never
/// make the audio thread's copy allocate.
pub const NODE_CAPACITY: usize = 256;

/// One point of the curve: phase `x` maps to value `y`, both nominally 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlNode {
    pub x: f32,
    pub y: f32,
}

impl ControlNode {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for ControlNode {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// The identity curve `{(0, 0), (1, 1)}`.
pub fn identity_nodes() -> Vec<ControlNode> {
    vec![ControlNode::new(0.0, 0.0), ControlNode::new(1.0, 1.0)]
}

/// Stable sort by `x`; nodes sharing an `x` keep their relative order.
pub fn sort_nodes(nodes: &mut [ControlNode]) {
    nodes.sort_by(|a, b| a.x.total_cmp(&b.x));
}

/// Wraps into `[0, 1)`. Non-finite input maps to 0.
#[inline]
pub fn wrap_phase(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(1.0);
    // rem_euclid rounds tiny negative inputs up to exactly 1.0
    if wrapped.is_finite() && wrapped < 1.0 {
        wrapped
    } else {
        0.0
    }
}

/// Curve value at `phase`, clamped to `[0, 1]`.
///
/// Finds the first segment `[x1, x2]` containing the wrapped phase and
/// interpolates linearly. A zero-width segment interpolates with `t = 0`.
/// A phase outside every segment extrapolates from the first one.
#[inline]
pub fn evaluate_raw(nodes: &[ControlNode], phase: f64) -> f64 {
    if nodes.len() < 2 {
        return NEUTRAL_VALUE;
    }

    let phase = wrap_phase(phase);
    let segment = nodes
        .windows(2)
        .find(|pair| phase >= f64::from(pair[0].x) && phase <= f64::from(pair[1].x))
        .unwrap_or(&nodes[..2]);

    let (x1, y1) = (f64::from(segment[0].x), f64::from(segment[0].y));
    let (x2, y2) = (f64::from(segment[1].x), f64::from(segment[1].y));

    let t = if x1 == x2 { 0.0 } else { (phase - x1) / (x2 - x1) };
    clamp_unit(y1 + (y2 - y1) * t)
}

/// Curve value with sync repetition and depth blending.
///
/// The curve is evaluated at `wrap(phase × sync)` and blended with the
/// undistorted phase: `depth = 0` returns the wrapped phase, `depth = 1` the
/// raw curve value.
#[inline]
pub fn evaluate(nodes: &[ControlNode], phase: f64, depth: f32, sync: f32) -> f64 {
    let phase = wrap_phase(phase);
    let sync_phase = wrap_phase(phase * f64::from(sync));
    let raw = evaluate_raw(nodes, sync_phase);

    let depth = f64::from(depth);
    clamp_unit(phase * (1.0 - depth) + raw * depth)
}

#[inline]
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        NEUTRAL_VALUE
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn node_cell(initial: &[ControlNode]) -> CrossThreadCell<Vec<ControlNode>> {
    CrossThreadCell::from_fn(|| {
        let mut nodes = Vec::with_capacity(NODE_CAPACITY.max(initial.len()));
        nodes.extend_from_slice(initial);
        sort_nodes(&mut nodes);
        nodes
    })
}

/// Creates the editor/curve pair over one shared node list.
pub fn curve_pair(initial: &[ControlNode]) -> (CurveEditor, TransferCurve) {
    let (writer, reader) = node_cell(initial).split();
    (CurveEditor { nodes: writer }, TransferCurve { nodes: reader })
}

/// Audio-thread side of the curve.
#[derive(Debug)]
pub struct TransferCurve {
    nodes: CellReader<Vec<ControlNode>>,
}

impl TransferCurve {
    /// Adopts the latest published node list and returns it.
    #[inline]
    pub fn refresh(&mut self) -> &[ControlNode] {
        self.nodes.read()
    }

    /// Node list as last adopted.
    #[inline]
    pub fn nodes(&self) -> &[ControlNode] {
        self.nodes.peek()
    }

    #[inline]
    pub fn evaluate_raw(&mut self, phase: f64) -> f64 {
        evaluate_raw(self.nodes.read(), phase)
    }

    #[inline]
    pub fn evaluate(&mut self, phase: f64, depth: f32, sync: f32) -> f64 {
        evaluate(self.nodes.read(), phase, depth, sync)
    }
}

/// Control-thread side of the curve.
#[derive(Debug)]
pub struct CurveEditor {
    nodes: CellWriter<Vec<ControlNode>>,
}

impl CurveEditor {
    /// Publishes `nodes`, stable-sorted by `x`.
    ///
    /// An empty list is ignored and returns `false`.
    pub fn set_control_nodes(&mut self, nodes: &[ControlNode]) -> bool {
        if nodes.is_empty() {
            return false;
        }

        {
            let mut stored = self.nodes.write();
            stored.clear();
            stored.extend_from_slice(nodes);
            sort_nodes(&mut stored);
        }
        self.nodes.mark_dirty();

        tracing::debug!(nodes = nodes.len(), "published control nodes");
        true
    }

    /// The edited node list, including edits the audio thread has not
    /// adopted yet.
    #[inline]
    pub fn nodes(&self) -> &[ControlNode] {
        self.nodes.peek()
    }

    /// Evaluates the edited curve without touching the audio thread's copy.
    pub fn evaluate(&self, phase: f64, depth: f32, sync: f32) -> f64 {
        evaluate(self.nodes.peek(), phase, depth, sync)
    }

    /// Whether the audio thread has yet to adopt the latest edit.
    pub fn is_pending(&self) -> bool {
        self.nodes.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn triangle() -> Vec<ControlNode> {
        vec![
            ControlNode::new(0.0, 0.0),
            ControlNode::new(0.5, 1.0),
            ControlNode::new(1.0, 0.0),
        ]
    }

    #[test]
    fn test_fewer_than_two_nodes_is_neutral() {
        assert_eq!(evaluate_raw(&[], 0.3), NEUTRAL_VALUE);
        assert_eq!(evaluate_raw(&[ControlNode::new(0.2, 0.9)], 0.3), NEUTRAL_VALUE);
    }

    #[test]
    fn test_triangle_segments() {
        let nodes = triangle();
        assert_eq!(evaluate_raw(&nodes, 0.0), 0.0);
        assert_eq!(evaluate_raw(&nodes, 0.25), 0.5);
        assert_eq!(evaluate_raw(&nodes, 0.5), 1.0);
        assert_eq!(evaluate_raw(&nodes, 0.75), 0.5);
    }

    #[test]
    fn test_phase_wraps() {
        let nodes = triangle();
        assert_eq!(evaluate_raw(&nodes, 1.25), 0.5);
        assert_eq!(evaluate_raw(&nodes, -0.75), 0.5);
        assert_eq!(evaluate_raw(&nodes, 1.0), 0.0);
    }

    #[test]
    fn test_zero_width_segment_uses_left_node() {
        let step = [
            ControlNode::new(0.0, 0.0),
            ControlNode::new(0.5, 0.2),
            ControlNode::new(0.5, 0.8),
            ControlNode::new(1.0, 1.0),
        ];
        // 0.5 matches the first segment, which ends at (0.5, 0.2)
        assert_abs_diff_eq!(evaluate_raw(&step, 0.5), 0.2, epsilon = 1e-7);
        assert_abs_diff_eq!(evaluate_raw(&step, 0.75), 0.9, epsilon = 1e-7);
    }

    #[test]
    fn test_output_clamped() {
        let wild = [ControlNode::new(0.0, -2.0), ControlNode::new(1.0, 3.0)];
        assert_eq!(evaluate_raw(&wild, 0.0), 0.0);
        assert_eq!(evaluate_raw(&wild, 0.99), 1.0);
    }

    #[test]
    fn test_phase_outside_nodes_extrapolates_first_segment() {
        let nodes = [ControlNode::new(0.2, 0.2), ControlNode::new(0.6, 0.6)];
        assert_abs_diff_eq!(evaluate_raw(&nodes, 0.1), 0.1, epsilon = 1e-7);
        assert_abs_diff_eq!(evaluate_raw(&nodes, 0.9), 0.9, epsilon = 1e-7);
    }

    #[test]
    fn test_sync_repeats_curve() {
        let nodes = triangle();
        // sync 2: phase 0.125 lands at 0.25 of the curve
        assert_eq!(evaluate(&nodes, 0.125, 1.0, 2.0), 0.5);
        assert_eq!(evaluate(&nodes, 0.625, 1.0, 2.0), 0.5);
    }

    #[test]
    fn test_depth_blends() {
        let nodes = triangle();
        assert_abs_diff_eq!(evaluate(&nodes, 0.25, 0.5, 1.0), 0.375, epsilon = 1e-12);
    }

    #[test]
    fn test_non_finite_inputs_stay_in_range() {
        let nodes = triangle();
        let value = evaluate(&nodes, f64::NAN, 1.0, 1.0);
        assert!((0.0..=1.0).contains(&value));
        let nodes = [ControlNode::new(0.0, f32::NAN), ControlNode::new(1.0, 1.0)];
        assert_eq!(evaluate_raw(&nodes, 0.5), NEUTRAL_VALUE);
    }

    #[test]
    fn test_editor_publishes_sorted() {
        let (mut editor, mut curve) = curve_pair(&identity_nodes());
        assert_eq!(curve.refresh(), identity_nodes().as_slice());

        let published = editor.set_control_nodes(&[
            ControlNode::new(1.0, 0.0),
            ControlNode::new(0.0, 0.0),
            ControlNode::new(0.5, 1.0),
        ]);
        assert!(published);
        assert!(editor.is_pending());
        assert_eq!(editor.nodes(), triangle().as_slice());

        // not adopted until the audio side reads
        assert_eq!(curve.nodes(), identity_nodes().as_slice());
        assert_eq!(curve.evaluate_raw(0.5), 1.0);
        assert_eq!(curve.nodes(), triangle().as_slice());
    }

    #[test]
    fn test_editor_ignores_empty() {
        let (mut editor, mut curve) = curve_pair(&triangle());
        assert!(!editor.set_control_nodes(&[]));
        assert!(!editor.is_pending());
        assert_eq!(curve.refresh(), triangle().as_slice());
    }

    #[test]
    fn test_initial_nodes_sorted() {
        let (editor, curve) = curve_pair(&[ControlNode::new(1.0, 1.0), ControlNode::new(0.0, 0.0)]);
        assert_eq!(editor.nodes(), identity_nodes().as_slice());
        assert_eq!(curve.nodes(), identity_nodes().as_slice());
    }

    #[test]
    fn test_editor_preview_matches_audio_side() {
        let (editor, mut curve) = curve_pair(&triangle());
        for phase in [0.0, 0.1, 0.33, 0.5, 0.9] {
            assert_eq!(editor.evaluate(phase, 0.7, 3.0), curve.evaluate(phase, 0.7, 3.0));
        }
    }

    fn node_strategy() -> impl Strategy<Value = ControlNode> {
        // coarse x grid so ties are common
        (0u8..=8, 0.0f32..=1.0).prop_map(|(x, y)| ControlNode::new(f32::from(x) / 8.0, y))
    }

    proptest! {
        #[test]
        fn prop_two_node_curve_is_linear(y0 in 0.0f32..=1.0, y1 in 0.0f32..=1.0, p in 0.0f64..1.0) {
            let nodes = [ControlNode::new(0.0, y0), ControlNode::new(1.0, y1)];
            let expected = f64::from(y0) + (f64::from(y1) - f64::from(y0)) * p;
            prop_assert!((evaluate_raw(&nodes, p) - expected).abs() < 1e-9);
        }

        #[test]
        fn prop_depth_zero_is_identity(
            nodes in prop::collection::vec(node_strategy(), 0..12),
            p in 0.0f64..1.0,
            sync in 1.0f32..=32.0,
        ) {
            let mut nodes = nodes;
            sort_nodes(&mut nodes);
            prop_assert_eq!(evaluate(&nodes, p, 0.0, sync), p);
        }

        #[test]
        fn prop_full_depth_unit_sync_is_raw(
            nodes in prop::collection::vec(node_strategy(), 2..12),
            p in 0.0f64..1.0,
        ) {
            let mut nodes = nodes;
            sort_nodes(&mut nodes);
            prop_assert_eq!(evaluate(&nodes, p, 1.0, 1.0), evaluate_raw(&nodes, p));
        }

        #[test]
        fn prop_published_nodes_sorted_and_stable(
            nodes in prop::collection::vec(node_strategy(), 1..24),
        ) {
            let (mut editor, mut curve) = curve_pair(&identity_nodes());
            editor.set_control_nodes(&nodes);
            let stored = curve.refresh().to_vec();

            prop_assert_eq!(stored.len(), nodes.len());
            prop_assert!(stored.windows(2).all(|w| w[0].x <= w[1].x));

            // ties keep input order
            let mut expected = nodes.clone();
            expected.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());
            prop_assert_eq!(stored, expected);
        }

        #[test]
        fn prop_output_in_unit_range(
            nodes in prop::collection::vec(node_strategy(), 0..12),
            p in -4.0f64..4.0,
            depth in 0.0f32..=1.0,
            sync in 1.0f32..=32.0,
        ) {
            let mut nodes = nodes;
            sort_nodes(&mut nodes);
            let value = evaluate(&nodes, p, depth, sync);
            prop_assert!((0.0..=1.0).contains(&value));
        }
    }
}
