use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{presets, tempo, DomainError};

pub const MAX_DURATION_SECONDS: u32 = 180;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Genre {
    #[serde(rename = "hip-hop")]
    HipHop,
    #[serde(rename = "trap")]
    Trap,
    #[serde(rename = "lo-fi")]
    LoFi,
    #[serde(rename = "edm")]
    Edm,
    #[serde(rename = "house")]
    House,
    #[serde(rename = "drill")]
    Drill,
    #[serde(rename = "r&b")]
    RnB,
    #[serde(rename = "jazz")]
    Jazz,
    #[serde(rename = "ambient")]
    Ambient,
    #[serde(rename = "afrobeats")]
    Afrobeats,
    #[serde(rename = "amapiano")]
    Amapiano,
    #[serde(rename = "afro-fusion")]
    AfroFusion,
}

impl Genre {
    pub const ALL: [Genre; 12] = [
        Genre::HipHop,
        Genre::Trap,
        Genre::LoFi,
        Genre::Edm,
        Genre::House,
        Genre::Drill,
        Genre::RnB,
        Genre::Jazz,
        Genre::Ambient,
        Genre::Afrobeats,
        Genre::Amapiano,
        Genre::AfroFusion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::HipHop => "hip-hop",
            Genre::Trap => "trap",
            Genre::LoFi => "lo-fi",
            Genre::Edm => "edm",
            Genre::House => "house",
            Genre::Drill => "drill",
            Genre::RnB => "r&b",
            Genre::Jazz => "jazz",
            Genre::Ambient => "ambient",
            Genre::Afrobeats => "afrobeats",
            Genre::Amapiano => "amapiano",
            Genre::AfroFusion => "afro-fusion",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Dark,
    Energetic,
    Chill,
    Melancholic,
    Aggressive,
    Dreamy,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Dark,
        Mood::Energetic,
        Mood::Chill,
        Mood::Melancholic,
        Mood::Aggressive,
        Mood::Dreamy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Dark => "dark",
            Mood::Energetic => "energetic",
            Mood::Chill => "chill",
            Mood::Melancholic => "melancholic",
            Mood::Aggressive => "aggressive",
            Mood::Dreamy => "dreamy",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MusicalKey {
    #[serde(rename = "C major")]
    CMajor,
    #[serde(rename = "C minor")]
    CMinor,
    #[serde(rename = "D major")]
    DMajor,
    #[serde(rename = "D minor")]
    DMinor,
    #[serde(rename = "E major")]
    EMajor,
    #[serde(rename = "E minor")]
    EMinor,
    #[serde(rename = "F major")]
    FMajor,
    #[serde(rename = "F minor")]
    FMinor,
    #[serde(rename = "G major")]
    GMajor,
    #[serde(rename = "G minor")]
    GMinor,
    #[serde(rename = "A major")]
    AMajor,
    #[serde(rename = "A minor")]
    AMinor,
    #[serde(rename = "B major")]
    BMajor,
    #[serde(rename = "B minor")]
    BMinor,
}

impl MusicalKey {
    pub const ALL: [MusicalKey; 14] = [
        MusicalKey::CMajor,
        MusicalKey::CMinor,
        MusicalKey::DMajor,
        MusicalKey::DMinor,
        MusicalKey::EMajor,
        MusicalKey::EMinor,
        MusicalKey::FMajor,
        MusicalKey::FMinor,
        MusicalKey::GMajor,
        MusicalKey::GMinor,
        MusicalKey::AMajor,
        MusicalKey::AMinor,
        MusicalKey::BMajor,
        MusicalKey::BMinor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MusicalKey::CMajor => "C major",
            MusicalKey::CMinor => "C minor",
            MusicalKey::DMajor => "D major",
            MusicalKey::DMinor => "D minor",
            MusicalKey::EMajor => "E major",
            MusicalKey::EMinor => "E minor",
            MusicalKey::FMajor => "F major",
            MusicalKey::FMinor => "F minor",
            MusicalKey::GMajor => "G major",
            MusicalKey::GMinor => "G minor",
            MusicalKey::AMajor => "A major",
            MusicalKey::AMinor => "A minor",
            MusicalKey::BMajor => "B major",
            MusicalKey::BMinor => "B minor",
        }
    }
}

impl Default for MusicalKey {
    fn default() -> Self {
        MusicalKey::CMinor
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Drums,
    Bass,
    Melody,
    Pad,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [
        Instrument::Drums,
        Instrument::Bass,
        Instrument::Melody,
        Instrument::Pad,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Instrument::Drums => "drums",
            Instrument::Bass => "bass",
            Instrument::Melody => "melody",
            Instrument::Pad => "pad",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Genre, Mood, MusicalKey, Instrument);

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerateRequest {
    pub genre: Genre,
    #[serde(default = "default_bpm")]
    pub bpm: u16,
    pub mood: Mood,
    #[serde(default)]
    pub key: MusicalKey,
    /// Duration in seconds.
    #[serde(default = "default_duration")]
    pub duration: u32,
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub custom_prompt: String,
    /// Fixed seed for repeatable rendering from a composition plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

fn default_bpm() -> u16 {
    tempo::DEFAULT_BPM
}

fn default_duration() -> u32 {
    30
}

impl GenerateRequest {
    pub fn new(genre: Genre, mood: Mood, instruments: Vec<Instrument>) -> Self {
        Self {
            genre,
            bpm: default_bpm(),
            mood,
            key: MusicalKey::default(),
            duration: default_duration(),
            instruments,
            custom_prompt: String::new(),
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        tempo::Tempo::requested(self.bpm)?;
        if self.duration == 0 || self.duration > MAX_DURATION_SECONDS {
            return Err(DomainError::validation(format!(
                "duration must be between 1 and {MAX_DURATION_SECONDS} seconds, got {}",
                self.duration
            )));
        }
        if self.instruments.is_empty() {
            return Err(DomainError::validation(
                "at least one instrument is required",
            ));
        }
        Ok(())
    }

    pub fn length_ms(&self) -> u64 {
        self.duration as u64 * 1000
    }

    /// Text prompt sent to the music model.
    pub fn build_prompt(&self) -> String {
        let custom = self.custom_prompt.trim();
        if !custom.is_empty() {
            return format!("{custom}, {} BPM, key of {}", self.bpm, self.key);
        }
        let instruments = self
            .instruments
            .iter()
            .map(|i| i.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} {}, featuring {}, {} BPM, key of {}, instrumental only",
            self.mood,
            presets::genre_description(self.genre),
            instruments,
            self.bpm,
            self.key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerateRequest {
        GenerateRequest::new(
            Genre::Trap,
            Mood::Dark,
            vec![Instrument::Drums, Instrument::Bass],
        )
    }

    #[test]
    fn defaults_match_request_schema() {
        let parsed: GenerateRequest = serde_json::from_str(
            r#"{"genre":"lo-fi","mood":"chill","instruments":["drums"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.bpm, 120);
        assert_eq!(parsed.key, MusicalKey::CMinor);
        assert_eq!(parsed.duration, 30);
        assert_eq!(parsed.genre, Genre::LoFi);
        assert!(parsed.custom_prompt.is_empty());
        assert_eq!(parsed.seed, None);
    }

    #[test]
    fn seed_is_optional_on_the_wire() {
        let seeded: GenerateRequest = serde_json::from_str(
            r#"{"genre":"house","mood":"energetic","instruments":["drums"],"seed":1234}"#,
        )
        .unwrap();
        assert_eq!(seeded.seed, Some(1234));
        let null: GenerateRequest = serde_json::from_str(
            r#"{"genre":"house","mood":"energetic","instruments":["drums"],"seed":null}"#,
        )
        .unwrap();
        assert_eq!(null.seed, None);
        let json = serde_json::to_value(request()).unwrap();
        assert!(json.get("seed").is_none());
    }

    #[test]
    fn validation_rules() {
        assert!(request().validate().is_ok());
        let mut slow = request();
        slow.bpm = 40;
        assert!(slow.validate().is_err());
        let mut silent = request();
        silent.instruments.clear();
        assert!(silent.validate().is_err());
        let mut long = request();
        long.duration = 600;
        assert!(long.validate().is_err());
    }

    #[test]
    fn prompt_from_fields() {
        let mut req = request();
        req.bpm = 140;
        assert_eq!(
            req.build_prompt(),
            "dark trap beat with 808 bass, hi-hat rolls, and hard-hitting snares, \
             featuring drums, bass, 140 BPM, key of C minor, instrumental only"
        );
    }

    #[test]
    fn prompt_prefers_custom_text() {
        let mut req = request();
        req.custom_prompt = "  dusty breakbeat  ".into();
        req.key = MusicalKey::AMinor;
        assert_eq!(req.build_prompt(), "dusty breakbeat, 120 BPM, key of A minor");
    }

    #[test]
    fn enums_serialize_to_display_values() {
        assert_eq!(serde_json::to_string(&Genre::RnB).unwrap(), "\"r&b\"");
        assert_eq!(Genre::AfroFusion.to_string(), "afro-fusion");
        assert_eq!(MusicalKey::GMajor.to_string(), "G major");
        assert_eq!(Instrument::Pad.to_string(), "pad");
    }
}
