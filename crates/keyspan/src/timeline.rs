use crate::note::{NoteEvent, Strike, Tick};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A maximal span of time over which the set of held keys does not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyphonyInterval {
    pub start: Tick,
    pub end: Tick,
    /// Sorted held pitches. A pitch appears once per overlapping note
    /// instance, so genuine duplicates in the input survive here.
    pub active_pitches: Vec<u8>,
}

impl PolyphonyInterval {
    /// Distinct keys held during the interval, ascending.
    pub fn keys(&self) -> Vec<u8> {
        let mut keys = self.active_pitches.clone();
        keys.dedup();
        keys
    }

    pub fn polyphony(&self) -> usize {
        self.active_pitches.len()
    }

    pub fn duration(&self) -> Tick {
        self.end - self.start
    }
}

/// Sweep the notes into intervals of constant polyphony.
///
/// Intervals are ordered by start and never overlap. Silent spans are left
/// out, so consecutive intervals are either adjacent or separated by a gap
/// during which nothing sounds. Notes are half-open: one ending exactly
/// where another begins does not overlap it.
pub fn build(notes: &[NoteEvent]) -> crate::Result<Vec<PolyphonyInterval>> {
    // +1 at onset, -1 at offset; applying every change at a tick before
    // emitting gives the half-open semantics.
    let mut boundaries: Vec<(Tick, i32, u8)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        note.validate()?;
        boundaries.push((note.onset, 1, note.pitch));
        boundaries.push((note.offset, -1, note.pitch));
    }
    boundaries.sort_unstable();

    let mut held: BTreeMap<u8, usize> = BTreeMap::new();
    let mut intervals: Vec<PolyphonyInterval> = Vec::new();

    let mut i = 0;
    while i < boundaries.len() {
        let tick = boundaries[i].0;
        while i < boundaries.len() && boundaries[i].0 == tick {
            let (_, delta, pitch) = boundaries[i];
            if delta > 0 {
                *held.entry(pitch).or_insert(0) += 1;
            } else if let Some(count) = held.get_mut(&pitch) {
                *count -= 1;
                if *count == 0 {
                    held.remove(&pitch);
                }
            }
            i += 1;
        }

        let Some(&(next_tick, _, _)) = boundaries.get(i) else {
            break;
        };
        if held.is_empty() {
            continue;
        }

        let active: Vec<u8> = held
            .iter()
            .flat_map(|(&pitch, &count)| std::iter::repeat(pitch).take(count))
            .collect();

        match intervals.last_mut() {
            Some(last) if last.end == tick && last.active_pitches == active => {
                last.end = next_tick;
            }
            _ => intervals.push(PolyphonyInterval {
                start: tick,
                end: next_tick,
                active_pitches: active,
            }),
        }
    }

    tracing::debug!(
        notes = notes.len(),
        intervals = intervals.len(),
        "built polyphony timeline"
    );

    Ok(intervals)
}

/// The interval sounding at `tick`, if any.
pub fn covering(intervals: &[PolyphonyInterval], tick: Tick) -> Option<&PolyphonyInterval> {
    let after = intervals.partition_point(|iv| iv.start <= tick);
    after
        .checked_sub(1)
        .map(|i| &intervals[i])
        .filter(|iv| tick < iv.end)
}

/// Zero-length intervals, one per tick with strikes, holding the struck keys
/// on top of whatever sounds at that tick. Ordered by tick.
pub fn instants(intervals: &[PolyphonyInterval], strikes: &[Strike]) -> Vec<PolyphonyInterval> {
    let mut by_tick: BTreeMap<Tick, Vec<u8>> = BTreeMap::new();
    for strike in strikes {
        by_tick.entry(strike.tick).or_default().push(strike.pitch);
    }

    by_tick
        .into_iter()
        .map(|(tick, struck)| {
            let mut active = covering(intervals, tick)
                .map(|iv| iv.active_pitches.clone())
                .unwrap_or_default();
            active.extend(struck);
            active.sort_unstable();
            PolyphonyInterval {
                start: tick,
                end: tick,
                active_pitches: active,
            }
        })
        .collect()
}
