use crate::keys::{PIANO_HIGHEST, PIANO_LOWEST};
use serde::{Deserialize, Serialize};

/// Most hands a configuration may ask for.
pub const MAX_HANDS: usize = 128;

/// Performer and instrument limits a performance is checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Number of hands available. Default: 2.
    pub hands: usize,
    /// Fingers available per hand. Default: 5.
    pub fingers_per_hand: usize,
    /// Widest reach of one hand in white keys (0.5 = one extra black key). Default: 7.
    pub max_span: f64,
    /// Lowest playable key. Default: A0.
    pub lowest_key: u8,
    /// Highest playable key. Default: C8.
    pub highest_key: u8,
    /// Cap on distinct keys held at once, independent of how they fall
    /// across the hands. `None` leaves it implied by hands x fingers.
    pub max_notes: Option<usize>,
    /// Check notes against the key range.
    pub check_range: bool,
    /// Check hands, fingers, span and the note cap.
    pub check_player: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            hands: 2,
            fingers_per_hand: 5,
            max_span: 7.0,
            lowest_key: PIANO_LOWEST,
            highest_key: PIANO_HIGHEST,
            max_notes: None,
            check_range: true,
            check_player: true,
        }
    }
}

impl Constraints {
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |message: String| Err(crate::Error::InvalidConstraints(message));

        if self.hands == 0 {
            return invalid("at least one hand is required".into());
        }
        if self.hands > MAX_HANDS {
            return invalid(format!(
                "at most {MAX_HANDS} hands are supported, got {}",
                self.hands
            ));
        }
        if self.fingers_per_hand == 0 {
            return invalid("at least one finger per hand is required".into());
        }
        if !self.max_span.is_finite() || self.max_span < 0.0 {
            return invalid(format!(
                "span must be a non-negative number, got {}",
                self.max_span
            ));
        }
        if self.lowest_key >= self.highest_key {
            return invalid(format!(
                "lowest key ({}) must be below highest key ({})",
                self.lowest_key, self.highest_key
            ));
        }
        Ok(())
    }

    /// Total fingers across all hands.
    pub fn finger_capacity(&self) -> usize {
        self.hands.saturating_mul(self.fingers_per_hand)
    }

    pub fn in_range(&self, key: u8) -> bool {
        (self.lowest_key..=self.highest_key).contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_two_hands_on_a_full_piano() {
        let c = Constraints::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.finger_capacity(), 10);
        assert!(c.in_range(21));
        assert!(c.in_range(108));
        assert!(!c.in_range(20));
        assert!(!c.in_range(109));
    }

    #[test]
    fn rejects_degenerate_limits() {
        let cases = [
            Constraints {
                hands: 0,
                ..Default::default()
            },
            Constraints {
                fingers_per_hand: 0,
                ..Default::default()
            },
            Constraints {
                max_span: f64::NAN,
                ..Default::default()
            },
            Constraints {
                max_span: -1.0,
                ..Default::default()
            },
            Constraints {
                lowest_key: 60,
                highest_key: 60,
                ..Default::default()
            },
        ];
        for c in cases {
            assert!(c.validate().is_err(), "{c:?} should be rejected");
        }
    }

    #[test]
    fn hand_count_is_capped() {
        let most = Constraints {
            hands: MAX_HANDS,
            ..Default::default()
        };
        assert!(most.validate().is_ok());

        for hands in [MAX_HANDS + 1, 1_000_000_000, usize::MAX] {
            let c = Constraints {
                hands,
                ..Default::default()
            };
            assert!(matches!(
                c.validate(),
                Err(crate::Error::InvalidConstraints(_))
            ));
        }
    }
}
