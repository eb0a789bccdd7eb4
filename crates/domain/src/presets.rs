use serde::{Deserialize, Serialize};

use crate::request::{Genre, Instrument, Mood, MusicalKey};

pub const DURATION_OPTIONS: [u32; 6] = [30, 60, 90, 120, 150, 180];

pub fn genre_default_bpm(genre: Genre) -> u16 {
    match genre {
        Genre::HipHop => 90,
        Genre::Trap => 140,
        Genre::LoFi => 80,
        Genre::Edm => 128,
        Genre::House => 124,
        Genre::Drill => 145,
        Genre::RnB => 95,
        Genre::Jazz => 110,
        Genre::Ambient => 70,
        Genre::Afrobeats => 106,
        Genre::Amapiano => 112,
        Genre::AfroFusion => 102,
    }
}

pub fn genre_description(genre: Genre) -> &'static str {
    match genre {
        Genre::HipHop => "hip hop boom bap style beat with punchy drums",
        Genre::Trap => "trap beat with 808 bass, hi-hat rolls, and hard-hitting snares",
        Genre::LoFi => "lo-fi chill hip hop beat with vinyl crackle and jazzy samples",
        Genre::Edm => "electronic dance music beat with synthesizers and build-ups",
        Genre::House => "house music beat with four-on-the-floor kick and groovy bassline",
        Genre::Drill => "UK drill beat with sliding 808 bass and rapid hi-hats",
        Genre::RnB => "smooth R&B beat with lush pads and soulful melodies",
        Genre::Jazz => "jazz-influenced beat with complex rhythms and melodic improvisation",
        Genre::Ambient => "ambient atmospheric beat with evolving textures and soft pads",
        Genre::Afrobeats => {
            "Nigerian Afrobeats instrumental with syncopated Afro swing drums, punchy kick, \
             shakers, congas, talking drum accents, rolling Afro bassline, rhythmic guitar plucks"
        }
        Genre::Amapiano => {
            "Amapiano instrumental with deep log drum groove, syncopated percussion, \
             jazz piano chords, airy pads, warm hypnotic dancefloor vibe"
        }
        Genre::AfroFusion => {
            "Afro-fusion instrumental blending Afrobeat groove with modern production, \
             live-feel instruments, soulful melodies, wide stereo percussion"
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PresetOption {
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_bpm: Option<u16>,
}

impl PresetOption {
    fn new(value: &str, label: String) -> Self {
        Self {
            value: value.to_string(),
            label,
            default_bpm: None,
        }
    }
}

/// Option lists offered to clients building a generation request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Presets {
    pub genres: Vec<PresetOption>,
    pub moods: Vec<PresetOption>,
    pub keys: Vec<PresetOption>,
    pub instruments: Vec<PresetOption>,
    pub duration_options: Vec<u32>,
}

impl Presets {
    pub fn catalog() -> Self {
        let genres = Genre::ALL
            .iter()
            .map(|g| PresetOption {
                default_bpm: Some(genre_default_bpm(*g)),
                ..PresetOption::new(g.as_str(), title_case(&g.as_str().replace('-', " ")))
            })
            .collect();
        let moods = Mood::ALL
            .iter()
            .map(|m| PresetOption::new(m.as_str(), title_case(m.as_str())))
            .collect();
        let keys = MusicalKey::ALL
            .iter()
            .map(|k| PresetOption::new(k.as_str(), k.as_str().to_string()))
            .collect();
        let instruments = Instrument::ALL
            .iter()
            .map(|i| PresetOption::new(i.as_str(), title_case(i.as_str())))
            .collect();
        Self {
            genres,
            moods,
            keys,
            instruments,
            duration_options: DURATION_OPTIONS.to_vec(),
        }
    }
}

/// Upper-cases the first letter of every alphabetic run, lower-cases the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
