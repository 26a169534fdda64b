//! Voltage translation helpers for sequencer knobs.
//!
//! Pattern selection and note display both derive from a knob voltage. The
//! conventions are 1 V per octave with 0 V sitting at octave 4, and a
//! ±10 V range spread over 64 patterns.

use std::f32::consts::PI;

/// Number of patterns a sequencer can select.
pub const NUM_PATTERNS: i32 = 64;
/// Voltage selecting the first pattern.
pub const PATTERN_MIN_V: f32 = -10.0;
/// Voltage selecting the last pattern.
pub const PATTERN_MAX_V: f32 = 10.0;
/// Notes per octave.
pub const NUM_NOTES: i32 = 12;
/// Octave reported for 0 V.
pub const ZERO_OCTAVE: i32 = 4;
/// Total octaves covered by note knobs.
pub const NUM_OCTAVES: i32 = 10;

/// Knob angle pointing straight up (angles start at +x and run clockwise).
pub const ANGLE_STRAIGHT_UP: f32 = 1.5 * PI;
/// Knob angle pointing straight down.
pub const ANGLE_STRAIGHT_DOWN: f32 = 0.5 * PI;

/// Note labels, indexed by note number within the octave.
pub const NOTES: [&str; NUM_NOTES as usize] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Linearly map `x` from `[x_min, x_max]` onto `[y_min, y_max]`.
pub fn rescale(x: f32, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> f32 {
    y_min + (x - x_min) / (x_max - x_min) * (y_max - y_min)
}

/// Pattern number (1-based, `1..=64`) selected by an input voltage.
pub fn volts_to_pattern(volts: f32) -> i32 {
    let pattern = rescale(
        volts,
        PATTERN_MIN_V,
        PATTERN_MAX_V,
        1.0,
        NUM_PATTERNS as f32,
    )
    .round() as i32;
    pattern.clamp(1, NUM_PATTERNS)
}

/// Output voltage for a zero-based pattern index.
pub fn pattern_to_volts(pattern_ix: i32) -> f32 {
    rescale(
        pattern_ix.saturating_add(1) as f32,
        1.0,
        NUM_PATTERNS as f32,
        PATTERN_MIN_V,
        PATTERN_MAX_V,
    )
}

/// Octave for a 1 V/oct voltage.
pub fn volts_to_octave(volts: f32) -> i32 {
    (volts + ZERO_OCTAVE as f32).floor() as i32
}

/// Note index within the octave.
///
/// Uses a truncating remainder, so voltages below the zero octave can yield a
/// negative index. Callers clamp before indexing [`NOTES`].
pub fn volts_to_note_ix(volts: f32) -> i32 {
    ((volts + ZERO_OCTAVE as f32) * NUM_NOTES as f32).round() as i32 % NUM_NOTES
}

/// Note label with octave, e.g. `"C#3"`.
pub fn note_name(volts: f32) -> String {
    let octave = volts_to_octave(volts);
    let note_ix = volts_to_note_ix(volts).clamp(0, NUM_NOTES - 1);
    format!("{}{}", NOTES[note_ix as usize], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_range_ends() {
        assert_eq!(volts_to_pattern(-10.0), 1);
        assert_eq!(volts_to_pattern(10.0), NUM_PATTERNS);
    }

    #[test]
    fn pattern_midpoint() {
        // rescale(0) = 32.5, rounded away from zero.
        assert_eq!(volts_to_pattern(0.0), 33);
    }

    #[test]
    fn pattern_clamps_outside_range() {
        assert_eq!(volts_to_pattern(-50.0), 1);
        assert_eq!(volts_to_pattern(50.0), NUM_PATTERNS);
    }

    #[test]
    fn pattern_to_volts_is_zero_based() {
        assert_eq!(pattern_to_volts(0), PATTERN_MIN_V);
        assert_eq!(pattern_to_volts(NUM_PATTERNS - 1), PATTERN_MAX_V);
    }

    #[test]
    fn pattern_to_volts_at_index_limits() {
        assert!(pattern_to_volts(i32::MAX) > PATTERN_MAX_V);
        assert!(pattern_to_volts(i32::MIN) < PATTERN_MIN_V);
    }

    #[test]
    fn pattern_roundtrip() {
        for ix in 0..NUM_PATTERNS {
            assert_eq!(volts_to_pattern(pattern_to_volts(ix)), ix + 1);
        }
    }

    #[test]
    fn octave_and_note_at_zero_volts() {
        assert_eq!(volts_to_octave(0.0), ZERO_OCTAVE);
        assert_eq!(volts_to_note_ix(0.0), 0);
        assert_eq!(note_name(0.0), "C4");
    }

    #[test]
    fn note_steps_by_semitone() {
        assert_eq!(note_name(1.0 / 12.0), "C#4");
        assert_eq!(note_name(7.0 / 12.0), "G4");
        assert_eq!(note_name(-1.0 / 12.0), "B3");
    }

    #[test]
    fn lowest_note() {
        assert_eq!(volts_to_octave(-4.0), 0);
        assert_eq!(volts_to_note_ix(-4.0), 0);
        assert_eq!(note_name(-4.0), "C0");
    }

    #[test]
    fn note_below_zero_octave_is_clamped() {
        assert!(volts_to_note_ix(-4.5) < 0);
        assert_eq!(note_name(-4.5), "C-1");
    }
}
