use crate::constraints::Constraints;
use crate::midi::Anomaly;
use crate::partition::{partition, HandGroup, Outcome, Shortfall};
use crate::range::split_by_range;
use crate::timeline::PolyphonyInterval;
use serde::{Deserialize, Serialize};

/// Something wrong at one point of the performance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum Finding {
    /// Keys outside the instrument's range.
    OutOfRange {
        keys: Vec<u8>,
        lowest: u8,
        highest: u8,
    },
    /// More distinct keys held than the configured cap.
    NoteLimit {
        keys: Vec<u8>,
        held: usize,
        max: usize,
    },
    /// More keys than fingers. `within_reach` is false when the keys are
    /// also spread wider than the hands can cover.
    FingerOverflow {
        keys: Vec<u8>,
        held: usize,
        capacity: usize,
        within_reach: bool,
        assigned: Vec<HandGroup>,
        residual: Vec<u8>,
    },
    /// Spread wider than the hands can cover.
    SpanOverflow {
        keys: Vec<u8>,
        groups_needed: usize,
        hands: usize,
        assigned: Vec<HandGroup>,
        residual: Vec<u8>,
    },
    /// Irregularity in the source events.
    Anomaly(Anomaly),
}

/// Every constraint violation for one interval. Empty means playable.
///
/// Range and player checks are independent: out-of-range keys are reported
/// on their own and left out of the hand assignment.
pub fn evaluate(interval: &PolyphonyInterval, constraints: &Constraints) -> Vec<Finding> {
    let keys = interval.keys();
    let mut findings = Vec::new();

    let reachable = if constraints.check_range {
        let (inside, outside) = split_by_range(&keys, constraints);
        if !outside.is_empty() {
            findings.push(Finding::OutOfRange {
                keys: outside,
                lowest: constraints.lowest_key,
                highest: constraints.highest_key,
            });
        }
        inside
    } else {
        keys.clone()
    };

    if !constraints.check_player {
        return findings;
    }

    if let Some(max) = constraints.max_notes {
        if keys.len() > max {
            findings.push(Finding::NoteLimit {
                keys: keys.clone(),
                held: keys.len(),
                max,
            });
        }
    }

    if let Outcome::Infeasible(failure) = partition(&reachable, constraints) {
        let finding = match failure.shortfall {
            Shortfall::FingerOverflow {
                held,
                capacity,
                within_reach,
            } => Finding::FingerOverflow {
                keys: reachable,
                held,
                capacity,
                within_reach,
                assigned: failure.assigned,
                residual: failure.residual,
            },
            Shortfall::SpanOverflow {
                groups_needed,
                hands,
            } => Finding::SpanOverflow {
                keys: reachable,
                groups_needed,
                hands,
                assigned: failure.assigned,
                residual: failure.residual,
            },
        };
        findings.push(finding);
    }

    findings
}
