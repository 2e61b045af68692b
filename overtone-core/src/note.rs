//! # Note Mapping
//!
//! Equal-tempered conversions between frequencies and note names, with A4
//! fixed at 440 Hz.
//!
//! ## Naming
//! - Pitch classes use sharps: `C, C#, D, D#, E, F, F#, G, G#, A, A#, B`
//! - The octave number is `4 + floor(h / 12)` where `h` is the rounded
//!   half-step offset from A4, so the number advances at A rather than at C
//!   (262 Hz is named "C3", 494 Hz is "B4")
//! - Half-step offsets that fall exactly between two notes round to the even
//!   offset

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Reference pitch of A4 in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// Name returned for frequencies that do not map to a note.
pub const INVALID_NOTE: &str = "N/A";

const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Index of A within [`PITCH_CLASSES`].
const A_INDEX: i32 = 9;

/// Name to half-step lookup for octaves 0 through 8.
///
/// Built from [`note_name`] so the two directions can never disagree.
static NOTE_MAP: Lazy<BTreeMap<String, i32>> = Lazy::new(|| {
    (-48..60).map(|h| (note_name(h), h)).collect()
});

/// Rounds a fractional half-step offset to the nearest integer, ties to even.
pub fn round_half_step(half_steps: f32) -> i32 {
    half_steps.round_ties_even() as i32
}

/// Rounded half-step offset of `frequency` from A4.
///
/// `None` for zero, negative or non-finite frequencies.
pub fn nearest_half_step(frequency: f32) -> Option<i32> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return None;
    }
    let half_steps = 12.0 * (frequency / A4_FREQUENCY).log2();
    Some(round_half_step(half_steps))
}

/// Name of the note `half_step` semitones away from A4.
pub fn note_name(half_step: i32) -> String {
    let octave = 4 + half_step.div_euclid(12);
    let pitch_class = (half_step + A_INDEX).rem_euclid(12) as usize;
    format!("{}{}", PITCH_CLASSES[pitch_class], octave)
}

/// Equal-tempered frequency of the note `half_step` semitones from A4.
pub fn half_step_frequency(half_step: i32) -> f32 {
    A4_FREQUENCY * 2.0_f32.powf(half_step as f32 / 12.0)
}

/// Converts a frequency to its nearest note name.
///
/// # Arguments
/// * `frequency` - Frequency in Hz
///
/// # Returns
/// * A note name such as `"A4"` or `"C#5"`
/// * `"N/A"` when the frequency is not a positive, finite number
pub fn frequency_to_note(frequency: f32) -> String {
    match nearest_half_step(frequency) {
        Some(h) => note_name(h),
        None => INVALID_NOTE.to_string(),
    }
}

/// The nearest note to `frequency` together with its target frequency.
pub fn nearest_note(frequency: f32) -> Option<(String, f32)> {
    nearest_half_step(frequency).map(|h| (note_name(h), half_step_frequency(h)))
}

/// Looks up the equal-tempered frequency of a note name such as `"A#4"`.
///
/// Names use the same sharps and octave numbering as [`frequency_to_note`].
pub fn note_frequency(name: &str) -> Option<f32> {
    NOTE_MAP.get(name).map(|&h| half_step_frequency(h))
}

/// Deviation of `frequency` from `target` in cents (positive is sharp).
pub fn cents_deviation(frequency: f32, target: f32) -> f32 {
    1200.0 * (frequency / target).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_pitches() {
        assert_eq!(frequency_to_note(440.0), "A4");
        assert_eq!(frequency_to_note(880.0), "A5");
        assert_eq!(frequency_to_note(220.0), "A3");
        assert_eq!(frequency_to_note(466.16), "A#4");
        assert_eq!(frequency_to_note(415.30), "G#3");
        assert_eq!(frequency_to_note(493.88), "B4");
    }

    #[test]
    fn invalid_frequencies_are_sentinel() {
        assert_eq!(frequency_to_note(0.0), "N/A");
        assert_eq!(frequency_to_note(-440.0), "N/A");
        assert_eq!(frequency_to_note(f32::NAN), "N/A");
        assert_eq!(frequency_to_note(f32::INFINITY), "N/A");
    }

    #[test]
    fn negative_offsets_floor_the_octave() {
        // h = -1 is G#, one octave below the A4 octave.
        assert_eq!(note_name(-1), "G#3");
        assert_eq!(note_name(-12), "A3");
        assert_eq!(note_name(-13), "G#2");
        assert_eq!(note_name(11), "G#4");
        assert_eq!(note_name(12), "A5");
    }

    #[test]
    fn octave_number_rolls_over_at_a() {
        assert_eq!(frequency_to_note(261.63), "C3");
        assert_eq!(frequency_to_note(523.25), "C4");
        assert_eq!(frequency_to_note(27.5), "A0");
    }

    #[test]
    fn ties_round_to_even_half_step() {
        assert_eq!(round_half_step(0.5), 0);
        assert_eq!(round_half_step(1.5), 2);
        assert_eq!(round_half_step(2.5), 2);
        assert_eq!(round_half_step(-0.5), 0);
        assert_eq!(round_half_step(-1.5), -2);
        assert_eq!(round_half_step(0.49), 0);
        assert_eq!(round_half_step(0.51), 1);
    }

    #[test]
    fn fifty_cent_boundary() {
        let below = A4_FREQUENCY * 2.0_f32.powf(0.49 / 12.0);
        let above = A4_FREQUENCY * 2.0_f32.powf(0.51 / 12.0);
        assert_eq!(frequency_to_note(below), "A4");
        assert_eq!(frequency_to_note(above), "A#4");
    }

    #[test]
    fn every_named_note_maps_back_to_itself() {
        for h in -48..60 {
            let name = note_name(h);
            let freq = note_frequency(&name).unwrap();
            assert_eq!(frequency_to_note(freq), name);
        }
        assert_eq!(note_frequency("Bb4"), None);
        assert_eq!(note_frequency("H2"), None);
    }

    #[test]
    fn nearest_note_reports_target() {
        let (name, target) = nearest_note(445.0).unwrap();
        assert_eq!(name, "A4");
        assert_eq!(target, 440.0);
        assert!(nearest_note(0.0).is_none());
    }

    #[test]
    fn cents_are_logarithmic() {
        assert!((cents_deviation(880.0, 440.0) - 1200.0).abs() < 1e-3);
        assert!(cents_deviation(440.0, 440.0).abs() < 1e-6);
        assert!((cents_deviation(half_step_frequency(1), 440.0) - 100.0).abs() < 1e-2);
        assert!(cents_deviation(430.0, 440.0) < 0.0);
    }
}
