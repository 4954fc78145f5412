//! Reading held notes out of a Standard MIDI File.

use crate::note::{NoteEvent, Strike, Tick};
use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// General MIDI percussion channel (channel 10, zero-based).
pub const DRUM_CHANNEL: u8 = 9;

/// Tempo assumed until the first tempo event: 120 BPM.
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Which events to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Read the GM percussion channel too.
    pub include_drums: bool,
    /// Only these track indices. `None` reads every track.
    pub tracks: Option<Vec<usize>>,
    /// Only these zero-based channels. `None` reads every channel.
    pub channels: Option<Vec<u8>>,
}

impl IngestOptions {
    fn accepts(&self, track: usize, channel: u8) -> bool {
        if channel == DRUM_CHANNEL && !self.include_drums {
            return false;
        }
        let track_ok = self.tracks.as_ref().map_or(true, |t| t.contains(&track));
        let channel_ok = self.channels.as_ref().map_or(true, |c| c.contains(&channel));
        track_ok && channel_ok
    }
}

/// Irregular note event found while pairing presses with releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Key pressed again while already held on the same channel.
    DuplicatePress,
    /// Key released while not held.
    OrphanRelease,
    /// Pressed and released on the same tick. Checked as a strike, not a
    /// held note.
    ZeroLengthNote,
    /// Still held when its track ended. Closed at the track's last tick.
    UnterminatedNote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub tick: Tick,
    pub key: u8,
    /// Zero-based MIDI channel.
    pub channel: u8,
    pub track: usize,
    pub issue: AnomalyKind,
}

/// How ticks map to wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Timing {
    Metrical { ticks_per_beat: u16 },
    Timecode { frames_per_second: f32, ticks_per_frame: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: Tick,
    pub microseconds_per_beat: u32,
}

/// Tempo changes for the whole file, sorted by tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoMap {
    pub timing: Timing,
    pub changes: Vec<TempoChange>,
}

impl TempoMap {
    pub fn metrical(ticks_per_beat: u16) -> Self {
        Self {
            timing: Timing::Metrical { ticks_per_beat },
            changes: Vec::new(),
        }
    }

    /// Seconds elapsed at `tick`, following every tempo change before it.
    pub fn seconds_at(&self, tick: Tick) -> f64 {
        match self.timing {
            Timing::Timecode {
                frames_per_second,
                ticks_per_frame,
            } => tick as f64 / (frames_per_second as f64 * ticks_per_frame as f64),
            Timing::Metrical { ticks_per_beat } => {
                let ppq = ticks_per_beat as f64;
                let mut seconds = 0.0;
                let mut last_tick: Tick = 0;
                let mut tempo = DEFAULT_TEMPO;

                for change in &self.changes {
                    if change.tick >= tick {
                        break;
                    }
                    seconds += (change.tick - last_tick) as f64 * tempo as f64 / (ppq * 1e6);
                    last_tick = change.tick;
                    tempo = change.microseconds_per_beat;
                }

                seconds + (tick - last_tick) as f64 * tempo as f64 / (ppq * 1e6)
            }
        }
    }
}

/// Notes and metadata read from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingested {
    /// Sorted by onset, then pitch.
    pub notes: Vec<NoteEvent>,
    /// Keys that sound for no time at all, sorted by tick.
    pub strikes: Vec<Strike>,
    /// Sorted by tick.
    pub anomalies: Vec<Anomaly>,
    pub tempo: TempoMap,
    pub format: u8,
    pub track_count: usize,
    pub total_ticks: Tick,
}

/// Parse MIDI bytes and pair note presses with releases.
pub fn ingest(midi_bytes: &[u8], options: &IngestOptions) -> crate::Result<Ingested> {
    let smf = Smf::parse(midi_bytes).map_err(|e| crate::Error::MidiParse(e.to_string()))?;
    extract(&smf, options)
}

/// Pair note presses with releases across every accepted track.
///
/// Presses of an already-held key stack, so each press gets its own note
/// and releases close the most recent press. Tracks of a format 2 file are
/// independent patterns played one after another, so each starts where the
/// previous one ended.
pub fn extract(smf: &Smf, options: &IngestOptions) -> crate::Result<Ingested> {
    let timing = match smf.header.timing {
        midly::Timing::Metrical(ticks) => {
            let ticks_per_beat = ticks.as_int();
            if ticks_per_beat == 0 {
                return Err(crate::Error::MidiParse("ticks per beat is zero".into()));
            }
            Timing::Metrical { ticks_per_beat }
        }
        midly::Timing::Timecode(fps, ticks_per_frame) => {
            if ticks_per_frame == 0 {
                return Err(crate::Error::MidiParse("ticks per frame is zero".into()));
            }
            Timing::Timecode {
                frames_per_second: fps.as_f32(),
                ticks_per_frame,
            }
        }
    };

    let format = match smf.header.format {
        midly::Format::SingleTrack => 0,
        midly::Format::Parallel => 1,
        midly::Format::Sequential => 2,
    };

    let mut notes = Vec::new();
    let mut strikes = Vec::new();
    let mut anomalies = Vec::new();
    let mut changes = Vec::new();
    let mut total_ticks: Tick = 0;

    for (track, events) in smf.tracks.iter().enumerate() {
        let mut current_tick: Tick = match smf.header.format {
            midly::Format::Sequential => total_ticks,
            _ => 0,
        };
        let mut held: BTreeMap<(u8, u8), Vec<Tick>> = BTreeMap::new();

        for event in events {
            current_tick += event.delta.as_int() as Tick;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    changes.push(TempoChange {
                        tick: current_tick,
                        microseconds_per_beat: tempo.as_int(),
                    });
                }
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    if !options.accepts(track, channel) {
                        continue;
                    }
                    let mut flag = |key: u8, issue: AnomalyKind| {
                        anomalies.push(Anomaly {
                            tick: current_tick,
                            key,
                            channel,
                            track,
                            issue,
                        })
                    };

                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            let key = key.as_int();
                            let stack = held.entry((channel, key)).or_default();
                            if !stack.is_empty() {
                                flag(key, AnomalyKind::DuplicatePress);
                            }
                            stack.push(current_tick);
                        }
                        // NoteOn with velocity 0 is a release
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            let key = key.as_int();
                            match held.get_mut(&(channel, key)).and_then(|s| s.pop()) {
                                Some(onset) if onset == current_tick => {
                                    flag(key, AnomalyKind::ZeroLengthNote);
                                    strikes.push(Strike {
                                        pitch: key,
                                        tick: onset,
                                    });
                                }
                                Some(onset) => notes.push(NoteEvent {
                                    pitch: key,
                                    onset,
                                    offset: current_tick,
                                }),
                                None => flag(key, AnomalyKind::OrphanRelease),
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        total_ticks = total_ticks.max(current_tick);

        for ((channel, key), stack) in held {
            for onset in stack {
                anomalies.push(Anomaly {
                    tick: current_tick,
                    key,
                    channel,
                    track,
                    issue: AnomalyKind::UnterminatedNote,
                });
                if onset < current_tick {
                    notes.push(NoteEvent {
                        pitch: key,
                        onset,
                        offset: current_tick,
                    });
                } else {
                    strikes.push(Strike { pitch: key, tick: onset });
                }
            }
        }
    }

    notes.sort_by(|a, b| {
        a.onset
            .cmp(&b.onset)
            .then(a.pitch.cmp(&b.pitch))
            .then(a.offset.cmp(&b.offset))
    });
    strikes.sort_by_key(|s| (s.tick, s.pitch));
    anomalies.sort_by_key(|a| a.tick);

    // Format 1 files may repeat the tempo map on several tracks
    changes.sort_by_key(|t| t.tick);
    changes.dedup_by(|a, b| a.tick == b.tick && a.microseconds_per_beat == b.microseconds_per_beat);

    tracing::info!(
        notes = notes.len(),
        strikes = strikes.len(),
        anomalies = anomalies.len(),
        tracks = smf.tracks.len(),
        "ingested MIDI"
    );

    Ok(Ingested {
        notes,
        strikes,
        anomalies,
        tempo: TempoMap { timing, changes },
        format,
        track_count: smf.tracks.len(),
        total_ticks,
    })
}
