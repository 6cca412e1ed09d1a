//! Real-time warp engine.
//!
//! Each block the engine follows the incoming pitch, writes the dry signal
//! into a [`DelayLine`], and reads it back at an offset driven by the
//! transfer curve, one oscillator period behind the write cursor. The warp
//! runs at the oversampled rate provided by the [`Resampler`].

use timewarp_core::{BlockRamp, CellReader, CellWriter, EngineConfig};
use timewarp_midi::{MidiEvent, PitchTracker};
use tracing::{info, warn};

use crate::curve::{self, ControlNode, TransferCurve};
use crate::delay_line::{wrap_index, DelayLine, MAX_DELAY_CAPACITY};
use crate::error::Result;
use crate::params::{EffectParameters, EngineControls, PitchReport};
use crate::resampler::{LinearOversampler, Resampler};

/// Oscillator frequency used before any note has been played.
pub const FALLBACK_FREQUENCY_HZ: f64 = 1.0;

/// Floor applied to the oscillator frequency before computing the period.
pub const MIN_OSCILLATOR_HZ: f64 = 1.0 / 32.0;

/// Delay line length per unit of oversampling factor, before the fallback
/// frequency is taken into account.
pub const BASE_DELAY_SAMPLES: usize = 16384;

/// Lifecycle of a [`WarpEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No storage; `process` passes audio through.
    Uninitialized,
    /// Storage allocated for the current config; no block processed yet.
    Prepared,
    Running,
}

/// Audio-thread half of the effect.
///
/// Created together with its [`WarpController`](crate::WarpController) by
/// [`warp_pair`](crate::warp_pair). `prepare` and `release` allocate and
/// belong on the control thread while the audio stream is stopped;
/// `process` never allocates except for the rare delay growth described on
/// [`delay_growths`](Self::delay_growths).
pub struct WarpEngine<R: Resampler = LinearOversampler> {
    resampler: R,
    curve: TransferCurve,
    controls: CellReader<EngineControls>,
    phase_out: CellWriter<f64>,
    frequency_out: CellWriter<f64>,
    pitch_out: CellWriter<PitchReport>,

    pitch: PitchTracker,
    applied_restore: u64,

    delay: DelayLine,
    oversampled: Vec<Vec<f32>>,

    depth: BlockRamp,
    sync: BlockRamp,
    dry_wet: BlockRamp,

    /// Oversampled samples since the last note-on.
    sample_index: i64,

    config: Option<EngineConfig>,
    state: EngineState,
    delay_growths: u64,
    overflowing: bool,
}

impl<R: Resampler> WarpEngine<R> {
    pub(crate) fn new(
        resampler: R,
        curve: TransferCurve,
        controls: CellReader<EngineControls>,
        phase_out: CellWriter<f64>,
        frequency_out: CellWriter<f64>,
        pitch_out: CellWriter<PitchReport>,
    ) -> Self {
        let parameters = controls.peek().parameters;
        Self {
            resampler,
            curve,
            controls,
            phase_out,
            frequency_out,
            pitch_out,
            pitch: PitchTracker::new(),
            applied_restore: 0,
            delay: DelayLine::new(),
            oversampled: Vec::new(),
            depth: BlockRamp::new(parameters.depth),
            sync: BlockRamp::new(parameters.sync),
            dry_wet: BlockRamp::new(parameters.dry_wet),
            sample_index: 0,
            config: None,
            state: EngineState::Uninitialized,
            delay_growths: 0,
            overflowing: false,
        }
    }

    /// Allocates for `config` and returns the latency to report to the host.
    ///
    /// The delay line is sized for the fallback frequency at the oversampled
    /// rate, so playing no note never triggers growth.
    pub fn prepare(&mut self, config: EngineConfig) -> Result<u32> {
        config.validate()?;

        if self.state == EngineState::Running {
            warn!("prepare called on a running engine, re-preparing");
        }

        let factor = self.resampler.factor();
        self.resampler.prepare(config.channels, config.max_block_size);
        self.resampler.reset();

        let oversampled_block = config.max_block_size * factor;
        self.oversampled = (0..config.channels)
            .map(|_| vec![0.0; oversampled_block])
            .collect();

        let oversampled_rate = config.sample_rate * factor as f64;
        let fallback_capacity = (2.0 * oversampled_rate / FALLBACK_FREQUENCY_HZ).ceil() as usize;
        self.delay.allocate(
            config.channels,
            (BASE_DELAY_SAMPLES * factor).max(fallback_capacity),
        );

        self.sample_index = 0;
        self.delay_growths = 0;
        self.overflowing = false;

        let controls = *self.controls.read();
        self.apply_controls(&controls);
        self.snap_ramps(&controls.parameters);

        self.config = Some(config);
        self.state = EngineState::Prepared;

        let latency = self.resampler.latency_samples();
        info!(
            sample_rate = config.sample_rate,
            max_block_size = config.max_block_size,
            channels = config.channels,
            oversampling = factor,
            delay_capacity = self.delay.capacity(),
            latency,
            "warp engine prepared"
        );
        Ok(latency)
    }

    /// Frees the delay line and scratch buffers.
    pub fn release(&mut self) {
        self.delay.release();
        self.oversampled = Vec::new();
        self.config = None;
        self.state = EngineState::Uninitialized;
        info!("warp engine released");
    }

    /// Silences the delay line and resampler history without reallocating.
    pub fn reset(&mut self) {
        self.delay.clear();
        self.resampler.reset();
        self.sample_index = 0;
    }

    /// Processes one block in place.
    ///
    /// `channels` must match the prepared channel count and share one length
    /// no longer than the prepared block size; anything else, and every block
    /// before `prepare`, passes through untouched.
    pub fn process(&mut self, channels: &mut [&mut [f32]], events: &[MidiEvent]) {
        let controls = *self.controls.read();
        self.apply_controls(&controls);
        self.pitch.ingest(events);
        self.pitch_out.try_publish(PitchReport {
            restore_serial: self.applied_restore,
            frequency: self.pitch.last_known_frequency(),
        });

        let parameters = controls.parameters;
        let factor = self.resampler.factor();
        if let Some(offset) = self.pitch.note_on_offset() {
            self.sample_index = -((offset * factor) as i64);
        }

        let frequency = self.oscillator_frequency(parameters.ratio());
        self.frequency_out.try_publish(frequency);

        let Some(config) = self.config else {
            return;
        };
        let period = config.sample_rate * factor as f64 / frequency;

        let frames = channels.first().map_or(0, |channel| channel.len());
        if frames == 0 {
            return;
        }
        if frames > config.max_block_size
            || channels.len() != config.channels
            || channels.iter().any(|channel| channel.len() != frames)
        {
            self.pass_through(&parameters, period);
            return;
        }

        let required = (period.ceil() as usize).saturating_mul(2);
        match self.delay.ensure_capacity(required) {
            Ok(false) => {}
            Ok(true) => {
                self.delay_growths += 1;
                warn!(capacity = required, period, "delay line grown on the audio thread");
            }
            Err(required) => {
                if !self.overflowing {
                    warn!(
                        required,
                        limit = MAX_DELAY_CAPACITY,
                        "oscillator period exceeds the delay line limit, passing audio through"
                    );
                }
                self.overflowing = true;
                self.pass_through(&parameters, period);
                return;
            }
        }
        self.overflowing = false;

        let oversampled_frames = frames * factor;
        for (index, input) in channels.iter().enumerate() {
            self.resampler.upsample(
                index,
                &input[..],
                &mut self.oversampled[index][..oversampled_frames],
            );
        }

        self.depth.begin_block(parameters.depth, oversampled_frames);
        self.sync.begin_block(parameters.sync, oversampled_frames);
        self.dry_wet.begin_block(parameters.dry_wet, oversampled_frames);

        let nodes = self.curve.refresh();
        let capacity = self.delay.capacity();
        let start = self.delay.cursor();

        for (index, buffer) in self.oversampled.iter_mut().enumerate() {
            let line = self.delay.channel_mut(index);
            let mut cursor = start;

            for (i, sample) in buffer[..oversampled_frames].iter_mut().enumerate() {
                let dry = *sample;
                line[cursor] = dry;

                let elapsed = (self.sample_index + i as i64) as f64;
                let wrapped = elapsed.rem_euclid(period);
                let value = curve::evaluate(
                    nodes,
                    wrapped / period,
                    self.depth.value_at(i),
                    self.sync.value_at(i),
                );

                // value == phase reads exactly one period back
                let offset = period * value - wrapped - period;
                let delayed = line[wrap_index(cursor as f64 + offset, capacity)];

                let mix = self.dry_wet.value_at(i);
                *sample = dry * (1.0 - mix) + delayed * mix;

                cursor += 1;
                if cursor == capacity {
                    cursor = 0;
                }
            }
        }

        for (index, output) in channels.iter_mut().enumerate() {
            self.resampler.downsample(
                index,
                &self.oversampled[index][..oversampled_frames],
                &mut output[..],
            );
        }

        self.delay.advance(oversampled_frames);
        self.sample_index += oversampled_frames as i64;

        self.depth.end_block();
        self.sync.end_block();
        self.dry_wet.end_block();

        self.publish_phase(period);
        self.state = EngineState::Running;
    }

    /// Leaves the block untouched. The phase counter does not advance, so a
    /// note-on seen here restarts the cycle in the next processed block.
    fn pass_through(&mut self, parameters: &EffectParameters, period: f64) {
        self.snap_ramps(parameters);
        self.publish_phase(period);
    }

    fn publish_phase(&mut self, period: f64) {
        let phase = (self.sample_index as f64).rem_euclid(period) / period;
        self.phase_out.try_publish(phase);
    }

    fn apply_controls(&mut self, controls: &EngineControls) {
        self.pitch.set_bend_range(controls.bend_range);

        if let Some(restore) = controls.pitch_restore {
            if restore.serial != self.applied_restore {
                self.pitch.restore_frequency(restore.frequency);
                self.applied_restore = restore.serial;
            }
        }
    }

    fn snap_ramps(&mut self, parameters: &EffectParameters) {
        self.depth.set_immediate(parameters.depth);
        self.sync.set_immediate(parameters.sync);
        self.dry_wet.set_immediate(parameters.dry_wet);
    }

    fn oscillator_frequency(&self, ratio: f64) -> f64 {
        let base = self
            .pitch
            .current_frequency()
            .unwrap_or(FALLBACK_FREQUENCY_HZ);
        let frequency = base * ratio;
        if frequency.is_finite() && frequency > MIN_OSCILLATOR_HZ {
            frequency
        } else {
            MIN_OSCILLATOR_HZ
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> Option<&EngineConfig> {
        self.config.as_ref()
    }

    /// Resampler group delay at the host rate.
    pub fn latency_samples(&self) -> u32 {
        self.resampler.latency_samples()
    }

    /// The effect rings for no longer than its input.
    pub fn tail_samples(&self) -> u32 {
        0
    }

    pub fn oversampling_factor(&self) -> usize {
        self.resampler.factor()
    }

    /// Per-channel delay line length in oversampled samples.
    pub fn delay_capacity(&self) -> usize {
        self.delay.capacity()
    }

    /// How many times the delay line had to grow inside `process` since the
    /// last `prepare`. Growth only happens for oscillator frequencies below
    /// the fallback, and allocates on the audio thread.
    pub fn delay_growths(&self) -> u64 {
        self.delay_growths
    }

    /// The curve as of the last processed block.
    pub fn control_nodes(&self) -> &[ControlNode] {
        self.curve.nodes()
    }

    pub fn pitch(&self) -> &PitchTracker {
        &self.pitch
    }

    pub fn resampler(&self) -> &R {
        &self.resampler
    }
}

impl<R: Resampler> std::fmt::Debug for WarpEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarpEngine")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("oversampling", &self.resampler.factor())
            .field("delay_capacity", &self.delay.capacity())
            .field("sample_index", &self.sample_index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::ControlNode;
    use crate::resampler::Bypass;
    use crate::{warp_pair, WarpController};
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    const RATE: f64 = 44_000.0;

    fn bypass_pair() -> (WarpEngine<Bypass>, WarpController) {
        warp_pair(Bypass, &curve::identity_nodes(), EngineControls::default())
    }

    fn prepared(block: usize) -> (WarpEngine<Bypass>, WarpController) {
        let (mut engine, controller) = bypass_pair();
        engine.prepare(EngineConfig::new(RATE, block, 1)).unwrap();
        (engine, controller)
    }

    #[test]
    fn test_starts_uninitialized_and_passes_through() {
        let (mut engine, _controller) = bypass_pair();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert_eq!(engine.delay_capacity(), 0);

        let mut left = [0.1, 0.2, 0.3];
        let mut right = [-0.1, -0.2, -0.3];
        engine.process(&mut [&mut left[..], &mut right[..]], &[MidiEvent::note_on(0, 0, 69, 100)]);

        assert_eq!(left, [0.1, 0.2, 0.3]);
        assert_eq!(right, [-0.1, -0.2, -0.3]);
        assert_eq!(engine.state(), EngineState::Uninitialized);
        // pitch is still tracked
        assert_eq!(engine.pitch().current_frequency(), Some(440.0));
    }

    #[test]
    fn test_prepare_sizes_delay_for_fallback_frequency() {
        let (mut engine, _controller) = bypass_pair();
        let latency = engine.prepare(EngineConfig::new(RATE, 64, 2)).unwrap();

        assert_eq!(latency, 0);
        assert_eq!(engine.state(), EngineState::Prepared);
        assert_eq!(engine.delay_capacity(), 88_000);
    }

    #[test]
    fn test_prepare_uses_base_size_at_low_rates() {
        let (mut engine, _controller) = bypass_pair();
        engine.prepare(EngineConfig::new(8_000.0, 64, 1)).unwrap();
        assert_eq!(engine.delay_capacity(), BASE_DELAY_SAMPLES);
    }

    #[test]
    fn test_prepare_rejects_invalid_config() {
        let (mut engine, _controller) = bypass_pair();
        assert!(engine.prepare(EngineConfig::new(RATE, 0, 1)).is_err());
        assert!(engine.prepare(EngineConfig::new(RATE, 64, 3)).is_err());
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn test_release_returns_to_uninitialized() {
        let (mut engine, _controller) = prepared(64);
        let mut block = [0.5; 64];
        engine.process(&mut [&mut block[..]], &[]);
        assert_eq!(engine.state(), EngineState::Running);

        engine.release();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert_eq!(engine.delay_capacity(), 0);

        let mut block = [0.5; 64];
        engine.process(&mut [&mut block[..]], &[]);
        assert!(block.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_oversized_block_passes_through() {
        let (mut engine, _controller) = prepared(16);
        let mut block = [0.25; 32];
        engine.process(&mut [&mut block[..]], &[MidiEvent::note_on(0, 0, 69, 100)]);
        assert!(block.iter().all(|&s| s == 0.25));
        assert_eq!(engine.state(), EngineState::Prepared);
    }

    #[test]
    fn test_note_on_in_oversized_block_resets_phase() {
        let (mut engine, mut controller) = prepared(16);
        let mut block = [0.0; 16];
        for _ in 0..3 {
            engine.process(&mut [&mut block[..]], &[]);
        }

        let mut oversized = [0.0; 32];
        engine.process(&mut [&mut oversized[..]], &[MidiEvent::note_on(0, 0, 69, 100)]);
        assert_eq!(controller.phase(), 0.0);
        assert_eq!(controller.frequency(), 440.0);

        // 16 samples since the strike on a 100 sample period
        engine.process(&mut [&mut block[..]], &[]);
        assert_abs_diff_eq!(controller.phase(), 0.16, epsilon = 1e-12);
    }

    #[test]
    fn test_frequency_published_before_prepare() {
        let (mut engine, mut controller) = bypass_pair();
        let mut block = [0.0; 16];
        engine.process(&mut [&mut block[..]], &[MidiEvent::note_on(0, 0, 69, 100)]);

        assert_eq!(controller.frequency(), 440.0);
        assert_eq!(controller.last_known_frequency(), Some(440.0));
        // nothing to measure a phase against yet
        assert_eq!(controller.phase(), 0.0);
    }

    #[test]
    fn test_channel_mismatch_passes_through() {
        let (mut engine, _controller) = prepared(16);
        let mut left = [0.25; 16];
        let mut right = [0.25; 16];
        engine.process(&mut [&mut left[..], &mut right[..]], &[]);
        assert!(left.iter().chain(&right).all(|&s| s == 0.25));
    }

    #[test]
    fn test_pure_delay_of_one_period() {
        let (mut engine, mut controller) = bypass_pair();
        controller.set_depth(0.0);
        controller.set_dry_wet(1.0);
        engine.prepare(EngineConfig::new(RATE, 50, 1)).unwrap();

        let mut output = Vec::new();
        let mut next = 0.0f32;
        for block in 0..10 {
            let mut samples: Vec<f32> = (0..50).map(|i| next + i as f32).collect();
            next += 50.0;
            let events = if block == 0 {
                vec![MidiEvent::note_on(0, 0, 69, 100)]
            } else {
                Vec::new()
            };
            engine.process(&mut [&mut samples[..]], &events);
            output.extend(samples);
        }

        // 440 Hz at 44 kHz is a 100 sample period
        for (n, &sample) in output.iter().enumerate() {
            let expected = if n >= 100 { (n - 100) as f32 } else { 0.0 };
            assert_eq!(sample, expected, "sample {n}");
        }
    }

    #[test]
    fn test_dry_wet_zero_is_dry() {
        let (mut engine, mut controller) = bypass_pair();
        controller.set_dry_wet(0.0);
        engine.prepare(EngineConfig::new(RATE, 64, 1)).unwrap();

        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut block = input.clone();
        engine.process(&mut [&mut block[..]], &[MidiEvent::note_on(0, 0, 60, 100)]);
        assert_eq!(block, input);
    }

    #[test]
    fn test_note_on_offset_aligns_phase() {
        let (mut engine, mut controller) = prepared(100);
        let mut block = [0.0; 100];
        engine.process(&mut [&mut block[..]], &[MidiEvent::note_on(40, 0, 69, 100)]);

        // 60 samples elapsed since the strike on a 100 sample period
        assert_abs_diff_eq!(controller.phase(), 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(controller.frequency(), 440.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ratio_scales_frequency() {
        let (mut engine, mut controller) = prepared(64);
        controller.set_ratio(3, 2);
        let mut block = [0.0; 64];
        engine.process(&mut [&mut block[..]], &[MidiEvent::note_on(0, 0, 69, 100)]);
        assert_abs_diff_eq!(controller.frequency(), 660.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fallback_frequency_without_note() {
        let (mut engine, mut controller) = prepared(64);
        let mut block = [0.0; 64];
        engine.process(&mut [&mut block[..]], &[]);
        assert_eq!(controller.frequency(), FALLBACK_FREQUENCY_HZ);
        assert_eq!(engine.delay_growths(), 0);
    }

    #[test]
    fn test_low_frequency_grows_delay_line() {
        let (mut engine, mut controller) = prepared(64);
        controller.set_ratio(1, 16);
        let before = engine.delay_capacity();

        let mut block = [0.0; 64];
        // note 0 is about 8.18 Hz, /16 puts the oscillator near 0.51 Hz
        engine.process(&mut [&mut block[..]], &[MidiEvent::note_on(0, 0, 0, 100)]);

        assert!(engine.delay_capacity() > before);
        assert_eq!(engine.delay_growths(), 1);
        let period = RATE / controller.frequency();
        assert!(engine.delay_capacity() as f64 >= 2.0 * period);

        engine.process(&mut [&mut block[..]], &[]);
        assert_eq!(engine.delay_growths(), 1);
    }

    #[test]
    fn test_parameter_ramp_reaches_target() {
        let (mut engine, mut controller) = prepared(32);
        controller.set_depth(0.0);
        let mut block = [0.0; 32];
        engine.process(&mut [&mut block[..]], &[]);
        assert_eq!(engine.depth.current(), 0.0);
        assert!(!engine.depth.is_ramping());
    }

    #[test]
    fn test_curve_edit_reaches_engine() {
        let (mut engine, mut controller) = prepared(32);
        controller.set_control_nodes(&[ControlNode::new(0.0, 1.0), ControlNode::new(1.0, 1.0)]);
        let mut block = [0.0; 32];
        engine.process(&mut [&mut block[..]], &[]);
        assert_eq!(engine.curve.nodes()[0], ControlNode::new(0.0, 1.0));
    }

    #[test]
    fn test_pitch_restore_applied_once() {
        let (mut engine, mut controller) = prepared(32);
        controller.queue_pitch_restore(261.63);

        let mut block = [0.0; 32];
        engine.process(&mut [&mut block[..]], &[]);
        assert_eq!(engine.pitch().note(), Some(60));

        // a later note is not overwritten by the same request
        engine.process(&mut [&mut block[..]], &[MidiEvent::note_on(0, 0, 72, 100)]);
        engine.process(&mut [&mut block[..]], &[]);
        assert_eq!(engine.pitch().note(), Some(72));
    }

    #[test]
    fn test_bend_range_reaches_tracker() {
        let (mut engine, mut controller) = prepared(32);
        controller.set_bend_range(2.0);
        let mut block = [0.0; 32];
        engine.process(&mut [&mut block[..]], &[]);
        assert_eq!(engine.pitch().bend_range(), 2.0);
    }

    proptest! {
        #[test]
        fn prop_delay_capacity_never_shrinks(
            notes in prop::collection::vec((0u8..=127, 1u32..=16, 1u32..=16), 1..12),
        ) {
            let (mut engine, mut controller) = prepared(16);
            let mut previous = engine.delay_capacity();
            let mut block = [0.0f32; 16];

            for (note, numerator, denominator) in notes {
                controller.set_ratio(numerator, denominator);
                engine.process(&mut [&mut block[..]], &[MidiEvent::note_on(0, 0, note, 100)]);

                let period = RATE / controller.frequency();
                prop_assert!(engine.delay_capacity() >= previous);
                prop_assert!(engine.delay_capacity() as f64 >= 2.0 * period);
                previous = engine.delay_capacity();
            }
        }
    }
}
