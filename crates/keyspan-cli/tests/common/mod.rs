//! MIDI fixtures for the CLI tests, written with midly.

#![allow(dead_code)]

use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::io::Write;
use tempfile::NamedTempFile;

pub const PPQ: u16 = 480;

/// One event at an absolute tick.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    On { tick: u32, key: u8, channel: u8 },
    Off { tick: u32, key: u8, channel: u8 },
    /// Press and release on the same tick.
    Strike { tick: u32, key: u8, channel: u8 },
    Tempo { tick: u32, micros: u32 },
}

impl Event {
    fn tick(&self) -> u32 {
        match *self {
            Event::On { tick, .. }
            | Event::Off { tick, .. }
            | Event::Strike { tick, .. }
            | Event::Tempo { tick, .. } => tick,
        }
    }

    /// Releases sort ahead of presses on the same tick.
    fn order(&self) -> u8 {
        match self {
            Event::Tempo { .. } => 0,
            Event::Off { .. } => 1,
            Event::On { .. } | Event::Strike { .. } => 2,
        }
    }

    fn kinds(&self) -> Vec<TrackEventKind<'static>> {
        match *self {
            Event::Strike { tick, key, channel } => [
                Event::On { tick, key, channel },
                Event::Off { tick, key, channel },
            ]
            .iter()
            .flat_map(Event::kinds)
            .collect(),
            _ => vec![self.kind()],
        }
    }

    fn kind(&self) -> TrackEventKind<'static> {
        match *self {
            Event::On { key, channel, .. } | Event::Strike { key, channel, .. } => TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOn {
                    key: key.into(),
                    vel: 100u8.into(),
                },
            },
            Event::Off { key, channel, .. } => TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOff {
                    key: key.into(),
                    vel: 0u8.into(),
                },
            },
            Event::Tempo { micros, .. } => TrackEventKind::Meta(MetaMessage::Tempo(micros.into())),
        }
    }
}

/// Notes as `(key, onset, offset)` on channel 1.
pub fn notes(notes: &[(u8, u32, u32)]) -> Vec<Event> {
    notes_on(0, notes)
}

pub fn notes_on(channel: u8, notes: &[(u8, u32, u32)]) -> Vec<Event> {
    notes
        .iter()
        .flat_map(|&(key, onset, offset)| {
            [
                Event::On {
                    tick: onset,
                    key,
                    channel,
                },
                Event::Off {
                    tick: offset,
                    key,
                    channel,
                },
            ]
        })
        .collect()
}

/// Notes held for one beat each, all starting together.
pub fn chord(keys: &[u8]) -> Vec<Event> {
    let spec: Vec<(u8, u32, u32)> = keys.iter().map(|&k| (k, 0, PPQ as u32)).collect();
    notes(&spec)
}

/// Standard MIDI file bytes, one track per event list.
pub fn smf(tracks: &[Vec<Event>]) -> Vec<u8> {
    let format = if tracks.len() == 1 {
        Format::SingleTrack
    } else {
        Format::Parallel
    };
    let header = Header::new(format, Timing::Metrical(PPQ.into()));

    let tracks = tracks
        .iter()
        .map(|events| {
            let mut events = events.clone();
            events.sort_by_key(|e| (e.tick(), e.order()));

            let mut last = 0;
            let mut track: Vec<TrackEvent<'static>> = events
                .iter()
                .flat_map(|e| e.kinds().into_iter().map(move |kind| (e.tick(), kind)))
                .map(|(tick, kind)| {
                    let delta = tick - last;
                    last = tick;
                    TrackEvent {
                        delta: delta.into(),
                        kind,
                    }
                })
                .collect();
            track.push(TrackEvent {
                delta: 0u32.into(),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            });
            track
        })
        .collect();

    let mut buffer = Vec::new();
    Smf { header, tracks }
        .write(&mut buffer)
        .expect("Failed to write MIDI");
    buffer
}

/// Write bytes to a temp file that lives as long as the handle.
pub fn write_temp(bytes: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(bytes).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

pub fn midi_file(tracks: &[Vec<Event>]) -> NamedTempFile {
    write_temp(&smf(tracks), ".mid")
}
