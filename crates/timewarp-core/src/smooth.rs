//! Block-linear parameter smoothing for zipper-free automation.
//!
//! Targets arrive once per block; within the block the value moves in equal
//! steps from where the previous block ended toward the new target, and the
//! next block starts exactly at that target.
//!
//! # Example
//!
//! ```
//! use timewarp_core::BlockRamp;
//!
//! let mut depth = BlockRamp::new(0.0);
//!
//! // Start of an audio block of 4 samples
//! depth.begin_block(1.0, 4);
//! let values: Vec<f32> = (0..4).map(|i| depth.value_at(i)).collect();
//! assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75]);
//!
//! // End of block: the target becomes the next block's baseline
//! depth.end_block();
//! assert_eq!(depth.current(), 1.0);
//! ```

/// Linear ramp from a block-start value toward a block target.
///
/// Indexed rather than stepped, so several channels can walk the same ramp
/// within one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRamp {
    current: f32,
    target: f32,
    step: f32,
}

impl BlockRamp {
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
        }
    }

    /// Sets the target for a block of `num_samples` samples.
    #[inline]
    pub fn begin_block(&mut self, target: f32, num_samples: usize) {
        self.target = target;
        self.step = if num_samples > 0 {
            (target - self.current) / num_samples as f32
        } else {
            0.0
        };
    }

    /// Value at sample `index` of the current block.
    #[inline]
    pub fn value_at(&self, index: usize) -> f32 {
        self.current + self.step * index as f32
    }

    /// Makes the block target the baseline for the next block.
    #[inline]
    pub fn end_block(&mut self) {
        self.current = self.target;
        self.step = 0.0;
    }

    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.step != 0.0
    }
}

impl Default for BlockRamp {
    fn default() -> Self {
        Self::new(0.0)
    }
}
