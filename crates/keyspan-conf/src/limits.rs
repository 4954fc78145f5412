//! What the performance is checked against: the player and the instrument.

use serde::{Deserialize, Serialize};

/// Player restrictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Hands available.
    /// Default: 2
    #[serde(default = "PlayerConfig::default_hands")]
    pub hands: usize,

    /// Fingers per hand.
    /// Default: 5
    #[serde(default = "PlayerConfig::default_fingers")]
    pub fingers: usize,

    /// Widest reach of one hand in white keys; a black key counts as 0.5.
    /// Default: 7 (one octave)
    #[serde(default = "PlayerConfig::default_span")]
    pub span: f64,

    /// Cap on keys held at once. Unset means hands x fingers.
    #[serde(default)]
    pub max_notes: Option<usize>,
}

impl PlayerConfig {
    fn default_hands() -> usize {
        2
    }

    fn default_fingers() -> usize {
        5
    }

    fn default_span() -> f64 {
        7.0
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            hands: Self::default_hands(),
            fingers: Self::default_fingers(),
            span: Self::default_span(),
            max_notes: None,
        }
    }
}

/// Instrument restrictions. Keys are note names (`A0`) or MIDI numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PianoConfig {
    /// Default: A0
    #[serde(default = "PianoConfig::default_lowest_key")]
    pub lowest_key: String,

    /// Default: C8
    #[serde(default = "PianoConfig::default_highest_key")]
    pub highest_key: String,
}

impl PianoConfig {
    fn default_lowest_key() -> String {
        "A0".to_string()
    }

    fn default_highest_key() -> String {
        "C8".to_string()
    }
}

impl Default for PianoConfig {
    fn default() -> Self {
        Self {
            lowest_key: Self::default_lowest_key(),
            highest_key: Self::default_highest_key(),
        }
    }
}

/// Which groups of restrictions are enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksConfig {
    /// Key range checks.
    /// Default: true
    #[serde(default = "default_true")]
    pub range: bool,

    /// Hands, fingers, span and note cap.
    /// Default: true
    #[serde(default = "default_true")]
    pub player: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            range: true,
            player: true,
        }
    }
}
