use serde::{Deserialize, Serialize};

/// Absolute time in MIDI ticks from the start of the file.
pub type Tick = u64;

/// A single held key with absolute tick timing.
///
/// Pitches are MIDI key numbers (middle C = 60). The note sounds over the
/// half-open span `[onset, offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: u8,
    pub onset: Tick,
    pub offset: Tick,
}

impl NoteEvent {
    /// Build a note, rejecting empty or inverted spans.
    pub fn new(pitch: u8, onset: Tick, offset: Tick) -> crate::Result<Self> {
        let note = Self {
            pitch,
            onset,
            offset,
        };
        note.validate()?;
        Ok(note)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.onset >= self.offset {
            return Err(crate::Error::MalformedNote {
                pitch: self.pitch,
                onset: self.onset,
                offset: self.offset,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> Tick {
        self.offset.saturating_sub(self.onset)
    }
}

/// A key pressed and released on the same tick. It never sounds over a
/// span, but the hand still has to reach it at that instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strike {
    pub pitch: u8,
    pub tick: Tick,
}
