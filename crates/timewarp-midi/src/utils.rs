//! Note / frequency conversions

use libm::{log2, pow};

/// Concert A, MIDI note 69.
pub const A4_HZ: f64 = 440.0;
pub const A4_NOTE: f64 = 69.0;

/// Equal-tempered frequency of a (possibly fractional) note number.
#[inline]
pub fn note_to_hz(note: f64) -> f64 {
    A4_HZ * pow(2.0, (note - A4_NOTE) / 12.0)
}

/// Inverse of [`note_to_hz`]. Non-positive input yields `-inf` or NaN.
#[inline]
pub fn hz_to_note(hz: f64) -> f64 {
    A4_NOTE + 12.0 * log2(hz / A4_HZ)
}

/// Semitone offset of a 14-bit wheel value for a given bend range.
#[inline]
pub fn bend_to_semitones(bend: u16, range_semitones: f64) -> f64 {
    let center = crate::event::PITCH_BEND_CENTER as f64;
    (bend as f64 - center) / center * range_semitones
}
