//! Keyboard geometry and key naming.
//!
//! Distances are measured in white keys: adjacent white keys are 1 apart
//! and a black key sits half way between its neighbours, so C4 to C5 is 7
//! and C4 to C#5 is 7.5.

/// Position of each pitch class along the white keys of one octave.
const WHITE_KEY_OFFSET: [f64; 12] = [0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 3.5, 4.0, 4.5, 5.0, 5.5, 6.0];

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Lowest key of a standard 88-key piano (A0).
pub const PIANO_LOWEST: u8 = 21;
/// Highest key of a standard 88-key piano (C8).
pub const PIANO_HIGHEST: u8 = 108;

/// White-key coordinate of a MIDI key.
pub fn white_key_index(key: u8) -> f64 {
    let octave = (key / 12) as f64;
    octave * 7.0 + WHITE_KEY_OFFSET[(key % 12) as usize]
}

/// Distance from `low` to `high` in white-key units. Negative when `high`
/// is below `low`.
pub fn key_distance(low: u8, high: u8) -> f64 {
    white_key_index(high) - white_key_index(low)
}

/// Scientific pitch name of a MIDI key, using sharps (`60` -> `C4`).
pub fn key_name(key: u8) -> String {
    let octave = (key / 12) as i32 - 1;
    format!("{}{}", SHARP_NAMES[(key % 12) as usize], octave)
}

/// Parse a key given either as a note name (`A0`, `C#4`, `Bb-1`) or as a
/// raw MIDI key number (`60`).
pub fn parse_key_name(input: &str) -> crate::Result<u8> {
    let invalid = |reason: &str| crate::Error::InvalidKeyName {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty key name"));
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed
            .parse::<u8>()
            .ok()
            .filter(|&k| k <= 127)
            .ok_or_else(|| invalid("key number must be between 0 and 127"));
    }

    let mut chars = trimmed.chars();
    let letter = chars.next().ok_or_else(|| invalid("empty key name"))?;
    let base: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(invalid("expected a note letter A-G")),
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let octave: i32 = octave_str
        .parse()
        .map_err(|_| invalid("expected an octave number after the note name"))?;

    let midi = (octave + 1) * 12 + base + accidental;
    u8::try_from(midi)
        .ok()
        .filter(|&k| k <= 127)
        .ok_or_else(|| invalid("note is outside the MIDI key range 0-127"))
}
