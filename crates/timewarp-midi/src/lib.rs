//! MIDI input for the timewarp effect.
//!
//! Hosts hand each audio block a slice of [`MidiEvent`]s with sample-accurate
//! frame offsets; the [`PitchTracker`] turns them into the fundamental
//! frequency the warp oscillator follows.
//!
//! # Example
//!
//! ```
//! use timewarp_midi::{MidiEvent, PitchTracker};
//!
//! let mut tracker = PitchTracker::new();
//! tracker.ingest(&[MidiEvent::note_on(64, 0, 69, 100)]);
//!
//! assert_eq!(tracker.current_frequency(), Some(440.0));
//! assert_eq!(tracker.note_on_offset(), Some(64));
//! ```

pub(crate) mod event;
pub(crate) mod pitch;
pub(crate) mod utils;

pub use event::{MidiEvent, PITCH_BEND_CENTER, PITCH_BEND_MAX};
pub use pitch::{PitchTracker, DEFAULT_BEND_RANGE};
pub use utils::{bend_to_semitones, hz_to_note, note_to_hz};

// Re-export essential upstream types (users shouldn't need to import midi-msg directly)
pub use midi_msg::{Channel, ChannelVoiceMsg};
