//! Assigning held keys to hands.
//!
//! Keys are sorted and each hand takes a contiguous run of them: hands may
//! not interleave, so a hand never skips a key inside its own reach. A run
//! is valid when it holds at most `fingers_per_hand` keys and its outer keys
//! are at most `max_span` white keys apart.
//!
//! Both limits only tighten as a run grows, so taking the longest valid run
//! from the lowest unassigned key never uses more hands than any other
//! assignment. A bounded backtracking pass re-checks greedy failures by
//! shrinking earlier runs before the interval is declared unplayable.

use crate::constraints::Constraints;
use crate::keys::key_distance;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Upper bound on search nodes visited by the backtracking pass.
const SEARCH_BUDGET: usize = 4096;

/// Keys assigned to one hand.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandGroup {
    pub keys: Vec<u8>,
}

impl HandGroup {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Reach between the outer keys, in white keys. Zero for 0 or 1 keys.
    pub fn span(&self) -> f64 {
        match (self.keys.first(), self.keys.last()) {
            (Some(&low), Some(&high)) => key_distance(low, high),
            _ => 0.0,
        }
    }

    pub fn fits(&self, constraints: &Constraints) -> bool {
        self.len() <= constraints.fingers_per_hand && self.span() <= constraints.max_span
    }
}

/// One valid assignment: exactly `hands` groups, lowest hand first.
/// Unused hands are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub hands: Vec<HandGroup>,
}

impl Partition {
    fn from_runs(keys: &[u8], runs: &[Range<usize>], hands: usize) -> Self {
        let mut groups: Vec<HandGroup> = runs
            .iter()
            .map(|run| HandGroup {
                keys: keys[run.clone()].to_vec(),
            })
            .collect();
        groups.resize_with(hands.max(groups.len()), HandGroup::default);
        Self { hands: groups }
    }

    pub fn hands_used(&self) -> usize {
        self.hands.iter().filter(|g| !g.is_empty()).count()
    }

    /// All assigned keys, ascending.
    pub fn keys(&self) -> Vec<u8> {
        self.hands.iter().flat_map(|g| g.keys.iter().copied()).collect()
    }
}

/// Why no assignment exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shortfall {
    /// More keys than the hands can hold at once. `capacity` is the most of
    /// these keys the hands can hold. `within_reach` is false when the keys
    /// are also spread wider than the hands can reach.
    FingerOverflow {
        held: usize,
        capacity: usize,
        within_reach: bool,
    },
    /// The keys are spread wider than the hands can reach, with fingers to
    /// spare.
    SpanOverflow { groups_needed: usize, hands: usize },
}

/// Failed assignment with the greedy attempt kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infeasibility {
    pub shortfall: Shortfall,
    /// Runs the hands would take, lowest first.
    pub assigned: Vec<HandGroup>,
    /// Keys left over once every hand is in use.
    pub residual: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Feasible(Partition),
    Infeasible(Infeasibility),
}

impl Outcome {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Outcome::Feasible(_))
    }
}

/// Decide whether `keys` can be held at once within `constraints`.
///
/// Duplicate keys are collapsed: a key needs one finger however many notes
/// sound on it. Range is not checked here.
pub fn partition(keys: &[u8], constraints: &Constraints) -> Outcome {
    let mut keys = keys.to_vec();
    keys.sort_unstable();
    keys.dedup();

    let hands = constraints.hands;
    let fingers = constraints.fingers_per_hand;

    if hands == 0 || fingers == 0 {
        return Outcome::Infeasible(Infeasibility {
            shortfall: Shortfall::FingerOverflow {
                held: keys.len(),
                capacity: 0,
                within_reach: false,
            },
            assigned: Vec::new(),
            residual: keys,
        });
    }

    let runs = greedy_runs(&keys, fingers, constraints.max_span);
    if runs.len() <= hands {
        return Outcome::Feasible(Partition::from_runs(&keys, &runs, hands));
    }

    let mut budget = SEARCH_BUDGET;
    let mut found = Vec::with_capacity(hands);
    if search(&keys, 0, hands, constraints, &mut budget, &mut found) {
        tracing::trace!(?keys, "backtracking recovered a partition");
        return Outcome::Feasible(Partition::from_runs(&keys, &found, hands));
    }
    tracing::trace!(
        ?keys,
        visited = SEARCH_BUDGET - budget,
        "no partition within search budget"
    );

    Outcome::Infeasible(classify(&keys, &runs, constraints))
}

/// End (exclusive) of the longest valid run starting at `start`.
fn run_end(keys: &[u8], start: usize, fingers: usize, max_span: f64) -> usize {
    let limit = start.saturating_add(fingers).min(keys.len());
    let mut end = start + 1;
    while end < limit && key_distance(keys[start], keys[end]) <= max_span {
        end += 1;
    }
    end
}

fn greedy_runs(keys: &[u8], fingers: usize, max_span: f64) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    while start < keys.len() {
        let end = run_end(keys, start, fingers, max_span);
        runs.push(start..end);
        start = end;
    }
    runs
}

fn search(
    keys: &[u8],
    start: usize,
    hands_left: usize,
    constraints: &Constraints,
    budget: &mut usize,
    runs: &mut Vec<Range<usize>>,
) -> bool {
    if start == keys.len() {
        return true;
    }
    if hands_left == 0 || *budget == 0 {
        return false;
    }
    if keys.len() - start > hands_left.saturating_mul(constraints.fingers_per_hand) {
        return false;
    }
    *budget -= 1;

    let longest = run_end(keys, start, constraints.fingers_per_hand, constraints.max_span);
    for end in (start + 1..=longest).rev() {
        runs.push(start..end);
        if search(keys, end, hands_left - 1, constraints, budget, runs) {
            return true;
        }
        runs.pop();
    }
    false
}

fn classify(keys: &[u8], runs: &[Range<usize>], constraints: &Constraints) -> Infeasibility {
    let hands = constraints.hands;
    let reach_runs = greedy_runs(keys, usize::MAX, constraints.max_span);

    let within_reach = reach_runs.len() <= hands;

    let shortfall = if within_reach || keys.len() > constraints.finger_capacity() {
        Shortfall::FingerOverflow {
            held: keys.len(),
            capacity: capacity(keys, constraints),
            within_reach,
        }
    } else {
        Shortfall::SpanOverflow {
            groups_needed: reach_runs.len(),
            hands,
        }
    };

    let assigned = runs
        .iter()
        .take(hands)
        .map(|run| HandGroup {
            keys: keys[run.clone()].to_vec(),
        })
        .collect();
    let residual = runs
        .get(hands)
        .map(|run| keys[run.start..].to_vec())
        .unwrap_or_default();

    Infeasibility {
        shortfall,
        assigned,
        residual,
    }
}

/// Most of `keys` that the hands can hold at once.
fn capacity(keys: &[u8], constraints: &Constraints) -> usize {
    let n = keys.len();
    let hands = constraints.hands.min(n);

    // best[h][i]: most keys from keys[i..] coverable with h hands
    let mut best = vec![vec![0usize; n + 1]; hands + 1];
    for h in 1..=hands {
        for i in (0..n).rev() {
            let end = run_end(keys, i, constraints.fingers_per_hand, constraints.max_span);
            best[h][i] = best[h][i + 1].max(end - i + best[h - 1][end]);
        }
    }
    best[hands][0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn limits(hands: usize, fingers: usize, span: f64) -> Constraints {
        Constraints {
            hands,
            fingers_per_hand: fingers,
            max_span: span,
            ..Default::default()
        }
    }

    fn groups(outcome: &Outcome) -> Vec<Vec<u8>> {
        match outcome {
            Outcome::Feasible(p) => p.hands.iter().map(|g| g.keys.clone()).collect(),
            Outcome::Infeasible(i) => panic!("expected feasible, got {i:?}"),
        }
    }

    fn shortfall(outcome: &Outcome) -> Shortfall {
        match outcome {
            Outcome::Infeasible(i) => i.shortfall.clone(),
            Outcome::Feasible(p) => panic!("expected infeasible, got {p:?}"),
        }
    }

    #[test]
    fn single_note_is_playable() {
        let outcome = partition(&[60], &Constraints::default());
        assert_eq!(groups(&outcome), vec![vec![60], vec![]]);
    }

    #[test]
    fn silence_is_playable() {
        let outcome = partition(&[], &Constraints::default());
        assert_eq!(groups(&outcome), vec![Vec::<u8>::new(), vec![]]);
    }

    #[test]
    fn eleven_notes_in_an_octave_overflow_ten_fingers() {
        let keys: Vec<u8> = (60..=70).collect();
        let outcome = partition(&keys, &Constraints::default());

        assert_eq!(
            shortfall(&outcome),
            Shortfall::FingerOverflow {
                held: 11,
                capacity: 10,
                within_reach: true
            }
        );
        if let Outcome::Infeasible(i) = outcome {
            assert_eq!(i.assigned.len(), 2);
            assert_eq!(i.residual, vec![70]);
        }
    }

    #[test]
    fn two_octaves_need_two_hands() {
        let keys = [48, 72];

        let one_hand = partition(&keys, &limits(1, 5, 7.0));
        assert_eq!(
            shortfall(&one_hand),
            Shortfall::SpanOverflow {
                groups_needed: 2,
                hands: 1
            }
        );

        let two_hands = partition(&keys, &limits(2, 5, 7.0));
        assert_eq!(groups(&two_hands), vec![vec![48], vec![72]]);
    }

    #[test]
    fn span_limit_is_inclusive() {
        // C4 to C5 is exactly seven white keys
        assert!(partition(&[60, 72], &limits(1, 5, 7.0)).is_feasible());
        // C4 to C#5 needs the extra half
        assert!(!partition(&[60, 73], &limits(1, 5, 7.0)).is_feasible());
        assert!(partition(&[60, 73], &limits(1, 5, 7.5)).is_feasible());
    }

    #[test]
    fn far_key_takes_its_own_hand() {
        let keys = [36, 60, 62, 64];
        let outcome = partition(&keys, &limits(2, 5, 7.0));
        assert_eq!(groups(&outcome), vec![vec![36], vec![60, 62, 64]]);
    }

    #[test]
    fn duplicate_keys_use_one_finger() {
        let outcome = partition(&[60, 60, 64], &limits(1, 2, 7.0));
        assert_eq!(groups(&outcome), vec![vec![60, 64]]);
    }

    #[test]
    fn partition_covers_every_key_once() {
        let keys = [40, 43, 47, 50, 55, 59, 62, 67, 71, 74];
        let c = limits(3, 4, 7.0);
        let Outcome::Feasible(p) = partition(&keys, &c) else {
            panic!("expected feasible");
        };

        assert_eq!(p.hands.len(), 3);
        assert_eq!(p.keys(), keys.to_vec());
        assert!(p.hands.iter().all(|g| g.fits(&c)));
    }

    #[test]
    fn wide_spread_with_spare_fingers_is_span_overflow() {
        let keys = [21, 50, 80, 108];
        let outcome = partition(&keys, &limits(2, 5, 7.0));
        assert_eq!(
            shortfall(&outcome),
            Shortfall::SpanOverflow {
                groups_needed: 4,
                hands: 2
            }
        );
    }

    #[test]
    fn capacity_counts_best_reachable_subset() {
        // Two tight clusters of three with one finger short on each hand
        let keys = [60, 62, 64, 84, 86, 88];
        let outcome = partition(&keys, &limits(2, 2, 7.0));
        assert_eq!(
            shortfall(&outcome),
            Shortfall::FingerOverflow {
                held: 6,
                capacity: 4,
                within_reach: true
            }
        );
    }

    #[test]
    fn more_keys_than_fingers_is_finger_overflow_however_wide() {
        // Three clusters, three octaves apart
        let keys = [24, 26, 28, 29, 60, 62, 64, 65, 96, 98, 100];
        let outcome = partition(&keys, &Constraints::default());
        assert_eq!(
            shortfall(&outcome),
            Shortfall::FingerOverflow {
                held: 11,
                capacity: 8,
                within_reach: false
            }
        );

        // Same count in one octave but a span too small for any pair
        let tight: Vec<u8> = (60..=70).collect();
        let outcome = partition(&tight, &limits(2, 5, 0.0));
        assert_eq!(
            shortfall(&outcome),
            Shortfall::FingerOverflow {
                held: 11,
                capacity: 2,
                within_reach: false
            }
        );
    }

    #[test]
    fn zero_hands_is_infeasible_not_a_panic() {
        let outcome = partition(&[60], &limits(0, 5, 7.0));
        assert!(!outcome.is_feasible());
    }
}
