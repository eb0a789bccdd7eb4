use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Lowest tempo accepted on generation requests.
pub const MIN_REQUEST_BPM: u16 = 60;
/// Highest tempo accepted on generation requests.
pub const MAX_REQUEST_BPM: u16 = 200;
pub const DEFAULT_BPM: u16 = 120;

const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;
/// Largest value a MIDI set-tempo meta event can carry (24 bits).
const MAX_MICROS_PER_QUARTER: f64 = 16_777_215.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub fn new(bpm: f64) -> Result<Self, DomainError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(DomainError::validation(format!(
                "tempo must be a positive number of beats per minute, got {bpm}"
            )));
        }
        if MICROSECONDS_PER_MINUTE / bpm > MAX_MICROS_PER_QUARTER {
            return Err(DomainError::validation(format!(
                "tempo {bpm} bpm is too slow to encode"
            )));
        }
        Ok(Self { bpm })
    }

    /// Tempo as requested by a user, limited to the range the generator accepts.
    pub fn requested(bpm: u16) -> Result<Self, DomainError> {
        if !(MIN_REQUEST_BPM..=MAX_REQUEST_BPM).contains(&bpm) {
            return Err(DomainError::validation(format!(
                "tempo bpm must be between {MIN_REQUEST_BPM} and {MAX_REQUEST_BPM}, got {bpm}"
            )));
        }
        Self::new(bpm as f64)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn beats_per_second(&self) -> f64 {
        self.bpm / 60.0
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Re-expresses a time in seconds as a quarter-note beat offset at this tempo.
    pub fn beat_at_time(&self, seconds: f64) -> f64 {
        seconds * self.beats_per_second()
    }

    pub fn micros_per_quarter(&self) -> u32 {
        (MICROSECONDS_PER_MINUTE / self.bpm).round() as u32
    }

    pub fn from_micros_per_quarter(micros: u32) -> Result<Self, DomainError> {
        if micros == 0 {
            return Err(DomainError::validation("tempo meta event of zero"));
        }
        Self::new(MICROSECONDS_PER_MINUTE / micros as f64)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM as f64,
        }
    }
}

impl TryFrom<f64> for Tempo {
    type Error = DomainError;

    fn try_from(bpm: f64) -> Result<Self, Self::Error> {
        Self::new(bpm)
    }
}

impl From<Tempo> for f64 {
    fn from(tempo: Tempo) -> Self {
        tempo.bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tempo_validation() {
        assert!(Tempo::new(0.0).is_err());
        assert!(Tempo::new(-120.0).is_err());
        assert!(Tempo::new(f64::NAN).is_err());
        assert!(Tempo::new(1.0).is_err());
        assert!(Tempo::new(120.0).is_ok());
    }

    #[test]
    fn requested_tempo_range() {
        assert!(Tempo::requested(59).is_err());
        assert!(Tempo::requested(201).is_err());
        assert_eq!(Tempo::requested(60).unwrap().bpm(), 60.0);
        assert_eq!(Tempo::requested(200).unwrap().bpm(), 200.0);
    }

    #[test]
    fn tempo_conversions() {
        let tempo = Tempo::new(120.0).unwrap();
        assert_eq!(tempo.beats_per_second(), 2.0);
        assert_eq!(tempo.micros_per_quarter(), 500_000);
        assert_relative_eq!(tempo.beat_at_time(0.75), 1.5);
        let back = Tempo::from_micros_per_quarter(500_000).unwrap();
        assert_relative_eq!(back.bpm(), 120.0);
        assert_eq!(Tempo::default().bpm(), 120.0);
    }

    #[test]
    fn tempo_serializes_as_number() {
        let json = serde_json::to_string(&Tempo::new(90.0).unwrap()).unwrap();
        assert_eq!(json, "90.0");
        assert!(serde_json::from_str::<Tempo>("-3.0").is_err());
    }
}
