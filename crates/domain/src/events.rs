use serde::{Deserialize, Serialize};

use crate::{tempo::Tempo, DomainError};

/// General MIDI percussion voices used by the drum exporter.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DrumVoice {
    Kick,
    SideStick,
    Snare,
    Clap,
    ClosedHiHat,
    LowTom,
    OpenHiHat,
    Ride,
    Cowbell,
    MuteConga,
    OpenConga,
    Maracas,
}

impl DrumVoice {
    pub const ALL: [DrumVoice; 12] = [
        DrumVoice::Kick,
        DrumVoice::SideStick,
        DrumVoice::Snare,
        DrumVoice::Clap,
        DrumVoice::ClosedHiHat,
        DrumVoice::LowTom,
        DrumVoice::OpenHiHat,
        DrumVoice::Ride,
        DrumVoice::Cowbell,
        DrumVoice::MuteConga,
        DrumVoice::OpenConga,
        DrumVoice::Maracas,
    ];

    /// Note number on the GM percussion channel.
    pub fn midi_note(self) -> u8 {
        match self {
            DrumVoice::Kick => 36,
            DrumVoice::SideStick => 37,
            DrumVoice::Snare => 38,
            DrumVoice::Clap => 39,
            DrumVoice::LowTom => 41,
            DrumVoice::ClosedHiHat => 42,
            DrumVoice::OpenHiHat => 46,
            DrumVoice::Ride => 51,
            DrumVoice::Cowbell => 56,
            DrumVoice::MuteConga => 62,
            DrumVoice::OpenConga => 63,
            DrumVoice::Maracas => 70,
        }
    }

    pub fn from_midi_note(note: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|voice| voice.midi_note() == note)
    }
}

/// Accent assigned to a tracked beat: even beats kick, odd beats snare.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PulseAccent {
    Kick,
    Snare,
}

impl PulseAccent {
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            PulseAccent::Kick
        } else {
            PulseAccent::Snare
        }
    }

    pub fn voice(self) -> DrumVoice {
        match self {
            PulseAccent::Kick => DrumVoice::Kick,
            PulseAccent::Snare => DrumVoice::Snare,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrumEvent {
    pub voice: DrumVoice,
    /// Beat position (quarter note = 1.0)
    pub position: f64,
    /// Length in quarter-note beats.
    pub duration: f64,
    pub velocity: u8,
}

impl DrumEvent {
    pub fn new(
        voice: DrumVoice,
        position: f64,
        duration: f64,
        velocity: u8,
    ) -> Result<Self, DomainError> {
        if !position.is_finite() || position < 0.0 {
            return Err(DomainError::validation(format!(
                "drum event position must be a non-negative beat offset, got {position}"
            )));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::validation(format!(
                "drum event duration must be positive, got {duration}"
            )));
        }
        if velocity > 127 {
            return Err(DomainError::validation(format!(
                "velocity {velocity} is outside 0-127"
            )));
        }
        Ok(Self {
            voice,
            position,
            duration,
            velocity,
        })
    }

    pub fn pitch(&self) -> u8 {
        self.voice.midi_note()
    }

    pub fn end(&self) -> f64 {
        self.position + self.duration
    }
}

/// Content of a single percussion track: name, tempo and ordered hits.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrumPattern {
    pub name: String,
    pub tempo: Tempo,
    pub events: Vec<DrumEvent>,
}

impl DrumPattern {
    pub fn new(name: impl Into<String>, tempo: Tempo) -> Self {
        Self {
            name: name.into(),
            tempo,
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event: DrumEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count_voice(&self, voice: DrumVoice) -> usize {
        self.events.iter().filter(|e| e.voice == voice).count()
    }
}
