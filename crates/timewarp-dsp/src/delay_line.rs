//! Growable multi-channel circular delay line.
//!
//! All channels share one write cursor. Capacity only grows; growth keeps
//! existing samples at their indices and zero-fills the new tail.

/// Upper bound on per-channel capacity, in samples.
///
/// Large enough for the prepare-time sizing at the highest supported
/// sample rate and oversampling factor.
pub const MAX_DELAY_CAPACITY: usize = 1 << 24;

/// Added before flooring a read position, so positions that land on an
/// integer up to rounding error do not fall one sample back.
const READ_EPSILON: f64 = 1e-6;

#[derive(Debug, Default)]
pub struct DelayLine {
    lines: Vec<Vec<f32>>,
    capacity: usize,
    cursor: usize,
}

impl DelayLine {
    /// Empty line with zero capacity. Reads and writes are not possible until
    /// [`allocate`](Self::allocate) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces storage with `channels` zeroed lines of `capacity` samples and
    /// rewinds the cursor.
    pub fn allocate(&mut self, channels: usize, capacity: usize) {
        let capacity = capacity.min(MAX_DELAY_CAPACITY);
        self.lines = (0..channels).map(|_| vec![0.0; capacity]).collect();
        self.capacity = if channels == 0 { 0 } else { capacity };
        self.cursor = 0;
    }

    /// Frees all storage.
    pub fn release(&mut self) {
        self.lines = Vec::new();
        self.capacity = 0;
        self.cursor = 0;
    }

    /// Grows every channel to at least `required` samples.
    ///
    /// Returns `Ok(true)` if it had to grow, `Ok(false)` if the line was
    /// already large enough, and `Err(required)` if `required` exceeds
    /// [`MAX_DELAY_CAPACITY`] or there is no storage to grow.
    ///
    /// Growing allocates. On the audio thread this is the one permitted
    /// allocation and should be rare.
    pub fn ensure_capacity(&mut self, required: usize) -> Result<bool, usize> {
        if required <= self.capacity {
            return Ok(false);
        }
        if required > MAX_DELAY_CAPACITY || self.lines.is_empty() {
            return Err(required);
        }

        for line in &mut self.lines {
            line.resize(required, 0.0);
        }
        self.capacity = required;
        Ok(true)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.capacity > 0
    }

    /// Moves the shared cursor forward after every channel has been written.
    #[inline]
    pub fn advance(&mut self, samples: usize) {
        if self.capacity > 0 {
            self.cursor = (self.cursor + samples) % self.capacity;
        }
    }

    /// Zeroes all channels and rewinds the cursor. Keeps capacity.
    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.cursor = 0;
    }

    /// Storage of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= self.channels()`.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.lines[channel]
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.lines[channel]
    }
}

/// Index of `position` wrapped into `[0, capacity)`, floored.
///
/// `capacity` must be non-zero.
#[inline]
pub fn wrap_index(position: f64, capacity: usize) -> usize {
    let wrapped = position.rem_euclid(capacity as f64);
    let index = (wrapped + READ_EPSILON).floor();
    if index.is_finite() && index >= 0.0 {
        (index as usize) % capacity
    } else {
        0
    }
}
