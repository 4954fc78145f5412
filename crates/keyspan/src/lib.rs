//! Keyboard playability checking.
//!
//! Decides whether a performance can be played by a performer with a given
//! number of hands, fingers per hand and hand span, on a keyboard with a
//! given key range.
//!
//! The pipeline runs in four steps:
//!
//! 1. [`midi::ingest`] pairs note presses with releases and flags irregular
//!    events.
//! 2. [`timeline::build`] sweeps the notes into intervals over which the set
//!    of held keys stays the same. Keys struck for no time at all become
//!    zero-length [`timeline::instants`].
//! 3. [`check::evaluate`] checks each interval against the key range
//!    ([`range`]) and the hands ([`partition`]).
//! 4. [`report::run`] classifies findings as warnings or fails and reduces
//!    them to a [`Verdict`].
//!
//! # Example
//!
//! ```
//! use keyspan::{check_notes, Constraints, NoteEvent, Policy, Verdict};
//!
//! let chord = [
//!     NoteEvent::new(60, 0, 480).unwrap(),
//!     NoteEvent::new(64, 0, 480).unwrap(),
//!     NoteEvent::new(67, 0, 480).unwrap(),
//! ];
//! let report = check_notes(&chord, &Constraints::default(), &Policy::default()).unwrap();
//! assert_eq!(report.verdict, Verdict::Playable);
//! ```

pub mod check;
pub mod constraints;
pub mod keys;
pub mod midi;
pub mod note;
pub mod partition;
pub mod range;
pub mod report;
pub mod timeline;

pub use check::Finding;
pub use constraints::Constraints;
pub use midi::{Anomaly, AnomalyKind, IngestOptions, Ingested, TempoMap};
pub use note::{NoteEvent, Strike, Tick};
pub use partition::{partition, HandGroup, Outcome, Partition, Shortfall};
pub use report::{Entry, OverflowSeverity, Policy, Report, Severity, Verdict};
pub use timeline::PolyphonyInterval;

use serde::{Deserialize, Serialize};

/// Errors that stop a run before any interval is evaluated.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("malformed note {pitch}: onset {onset} is not before offset {offset}")]
    MalformedNote { pitch: u8, onset: Tick, offset: Tick },

    #[error("invalid constraints: {0}")]
    InvalidConstraints(String),

    #[error("invalid key {input:?}: {reason}")]
    InvalidKeyName { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Everything learned from one MIDI file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub report: Report,
    pub tempo: TempoMap,
    pub note_count: usize,
    pub interval_count: usize,
    pub track_count: usize,
}

/// Full pipeline: parse -> pair notes -> timeline -> check -> report.
#[tracing::instrument(skip_all, fields(bytes = midi_bytes.len()))]
pub fn analyze(
    midi_bytes: &[u8],
    constraints: &Constraints,
    policy: &Policy,
    options: &IngestOptions,
) -> Result<Analysis> {
    constraints.validate()?;

    let ingested = midi::ingest(midi_bytes, options)?;
    let intervals = timeline::build(&ingested.notes)?;
    let instants = timeline::instants(&intervals, &ingested.strikes);
    let report = report::run_with_instants(
        &intervals,
        &instants,
        constraints,
        policy,
        ingested.anomalies,
    );

    Ok(Analysis {
        report,
        tempo: ingested.tempo,
        note_count: ingested.notes.len(),
        interval_count: intervals.len(),
        track_count: ingested.track_count,
    })
}

/// Check notes from any source. Malformed notes or constraints are
/// rejected before evaluation starts.
pub fn check_notes(
    notes: &[NoteEvent],
    constraints: &Constraints,
    policy: &Policy,
) -> Result<Report> {
    constraints.validate()?;
    let intervals = timeline::build(notes)?;
    Ok(report::run(&intervals, constraints, policy, Vec::new()))
}
