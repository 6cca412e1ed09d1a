//! Monophonic pitch tracking from note-on and pitch-bend events.
//!
//! The tracker follows the most recent note-on and the pitch wheel. It has no
//! notion of note-off: once a note has been struck its pitch is held until the
//! next note-on, so the effect keeps a stable period while the note rings out.

use midi_msg::ChannelVoiceMsg;

use crate::event::MidiEvent;
use crate::utils::{bend_to_semitones, hz_to_note, note_to_hz};

/// Pitch-bend range used until one is configured, in semitones.
pub const DEFAULT_BEND_RANGE: f64 = 48.0;

/// Converts a per-block event stream into a fundamental frequency.
///
/// Allocation-free; every method is safe to call on the audio thread.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchTracker {
    note: Option<i32>,
    bend_semitones: f64,
    bend_range: f64,
    /// Frame offset of the latest note-on seen by the last `ingest`.
    note_on_offset: Option<usize>,
}

impl Default for PitchTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PitchTracker {
    pub fn new() -> Self {
        Self {
            note: None,
            bend_semitones: 0.0,
            bend_range: DEFAULT_BEND_RANGE,
            note_on_offset: None,
        }
    }

    /// Consumes one block's events in order.
    ///
    /// A note-on (velocity > 0) sets the note and recenters the bend; a pitch
    /// bend updates the bend offset against the current range. Everything
    /// else is ignored. The note-on edge is cleared first, so
    /// [`was_note_on`](Self::was_note_on) only reflects this batch.
    pub fn ingest(&mut self, events: &[MidiEvent]) {
        self.note_on_offset = None;

        for event in events {
            match event.msg {
                ChannelVoiceMsg::NoteOn { note, velocity } if velocity > 0 => {
                    self.note = Some(i32::from(note));
                    self.bend_semitones = 0.0;
                    self.note_on_offset = Some(event.frame_offset);
                }
                ChannelVoiceMsg::PitchBend { bend } => {
                    self.bend_semitones = bend_to_semitones(bend, self.bend_range);
                }
                _ => {}
            }
        }
    }

    /// `440 × 2^((note + bend − 69) / 12)`, or `None` before any note.
    #[inline]
    pub fn current_frequency(&self) -> Option<f64> {
        self.note
            .map(|note| note_to_hz(f64::from(note) + self.bend_semitones))
    }

    /// Whether the last [`ingest`](Self::ingest) contained a note-on.
    #[inline]
    pub fn was_note_on(&self) -> bool {
        self.note_on_offset.is_some()
    }

    /// In-block frame offset of the latest note-on from the last ingest.
    #[inline]
    pub fn note_on_offset(&self) -> Option<usize> {
        self.note_on_offset
    }

    /// Held note number, if any.
    #[inline]
    pub fn note(&self) -> Option<i32> {
        self.note
    }

    #[inline]
    pub fn bend_semitones(&self) -> f64 {
        self.bend_semitones
    }

    #[inline]
    pub fn bend_range(&self) -> f64 {
        self.bend_range
    }

    /// Applies to subsequent bend messages. Non-finite or negative ranges are
    /// ignored.
    pub fn set_bend_range(&mut self, semitones: f64) {
        if semitones.is_finite() && semitones >= 0.0 {
            self.bend_range = semitones;
        }
    }

    /// Frequency to persist so the pitch survives a session reload.
    #[inline]
    pub fn last_known_frequency(&self) -> Option<f64> {
        self.current_frequency()
    }

    /// Reinstates a persisted pitch as the nearest note with zero bend.
    ///
    /// Zero, negative, and non-finite input clear the held note, as does a
    /// frequency that rounds below note 0.
    pub fn restore_frequency(&mut self, hz: f64) {
        self.bend_semitones = 0.0;
        self.note = None;

        if !(hz.is_finite() && hz > 0.0) {
            return;
        }

        let note = libm::round(hz_to_note(hz));
        if (0.0..=f64::from(i32::MAX)).contains(&note) {
            self.note = Some(note as i32);
        }
    }

    /// Forgets the held note, bend, and note-on edge. The bend range is kept.
    pub fn reset(&mut self) {
        self.note = None;
        self.bend_semitones = 0.0;
        self.note_on_offset = None;
    }
}
