//! Genre drum grooves written straight to MIDI, without any audio analysis.
//!
//! Each genre has a one-bar template on a sixteenth-note grid. The bar is
//! repeated for as many whole 4/4 bars as fit in the requested duration.

use std::fs;
use std::path::Path;

use crescent_domain::{DrumEvent, DrumPattern, DrumVoice, Genre, Tempo};
use tracing::{debug, info};

use crate::error::ConversionError;
use crate::midi::DrumEncoder;

pub const TEMPLATE_TRACK_NAME: &str = "Crescent Afro Percussion";
pub const STEPS_PER_BAR: u8 = 16;
pub const BEATS_PER_BAR: f64 = 4.0;
/// Length of one grid step, in quarter-note beats.
pub const STEP_BEATS: f64 = BEATS_PER_BAR / STEPS_PER_BAR as f64;

/// One hit on the sixteenth-note grid of a bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub index: u8,
    pub voice: DrumVoice,
    pub velocity: u8,
}

/// A one-bar drum groove for a genre.
#[derive(Clone, Debug, PartialEq)]
pub struct GrooveTemplate {
    genre: Genre,
    bar: Vec<Step>,
}

impl GrooveTemplate {
    /// Afro genres get their own groove; everything else shares a straight
    /// kick, snare and hi-hat bar.
    pub fn for_genre(genre: Genre) -> Self {
        let bar = match genre {
            Genre::Afrobeats => afrobeats(),
            Genre::Amapiano => amapiano(),
            Genre::AfroFusion => afro_fusion(),
            _ => straight(),
        };
        Self { genre, bar }
    }

    pub fn genre(&self) -> Genre {
        self.genre
    }

    pub fn steps(&self) -> &[Step] {
        &self.bar
    }

    /// Whole bars that fit in `duration_secs`, never fewer than one.
    pub fn bar_count(tempo: Tempo, duration_secs: f64) -> usize {
        let seconds_per_bar = BEATS_PER_BAR * tempo.seconds_per_beat();
        let bars = (duration_secs / seconds_per_bar).floor();
        if bars.is_finite() && bars >= 1.0 {
            bars as usize
        } else {
            1
        }
    }

    /// Repeats the bar over `duration_secs` at `tempo`, ordered by position.
    pub fn pattern(&self, tempo: Tempo, duration_secs: f64) -> Result<DrumPattern, ConversionError> {
        let bars = Self::bar_count(tempo, duration_secs);
        let mut pattern = DrumPattern::new(TEMPLATE_TRACK_NAME, tempo);
        for bar in 0..bars {
            let bar_start = bar as f64 * BEATS_PER_BAR;
            for step in &self.bar {
                let position = bar_start + step.index as f64 * STEP_BEATS;
                let hit = DrumEvent::new(step.voice, position, STEP_BEATS, step.velocity)
                    .map_err(|err| ConversionError::Encode(err.to_string()))?;
                pattern.push(hit);
            }
        }
        pattern
            .events
            .sort_by(|a, b| a.position.total_cmp(&b.position));
        debug!(genre = %self.genre, bars, events = pattern.events.len(), "built groove");
        Ok(pattern)
    }
}

/// Writes the genre groove for `duration_secs` at `bpm` as a MIDI file.
pub fn write_genre_midi(
    path: &Path,
    genre: Genre,
    bpm: u16,
    duration_secs: u32,
) -> Result<DrumPattern, ConversionError> {
    let tempo = Tempo::requested(bpm).map_err(ConversionError::Tempo)?;
    let pattern = GrooveTemplate::for_genre(genre).pattern(tempo, duration_secs as f64)?;
    let bytes = DrumEncoder::default().encode(&pattern)?;
    fs::write(path, &bytes).map_err(|source| ConversionError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), %genre, bpm, events = pattern.events.len(), "wrote genre groove");
    Ok(pattern)
}

struct Bar(Vec<Step>);

impl Bar {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn hit(&mut self, index: u8, voice: DrumVoice, velocity: u8) -> &mut Self {
        self.0.push(Step {
            index,
            voice,
            velocity,
        });
        self
    }

    fn every(&mut self, stride: u8, voice: DrumVoice, velocity: impl Fn(u8) -> u8) -> &mut Self {
        for index in (0..STEPS_PER_BAR).step_by(stride as usize) {
            self.hit(index, voice, velocity(index));
        }
        self
    }

    fn finish(&mut self) -> Vec<Step> {
        std::mem::take(&mut self.0)
    }
}

fn straight() -> Vec<Step> {
    Bar::new()
        .every(1, DrumVoice::ClosedHiHat, |_| 80)
        .every(4, DrumVoice::Kick, |_| 100)
        .hit(2, DrumVoice::Snare, 100)
        .hit(6, DrumVoice::Snare, 100)
        .hit(10, DrumVoice::Snare, 100)
        .hit(14, DrumVoice::Snare, 100)
        .finish()
}

fn afrobeats() -> Vec<Step> {
    use DrumVoice::*;
    Bar::new()
        .hit(0, Kick, 105)
        .hit(7, Kick, 90)
        .hit(10, Kick, 95)
        .hit(4, Snare, 100)
        .hit(12, Snare, 100)
        .every(2, ClosedHiHat, |_| 75)
        .hit(3, OpenHiHat, 70)
        .hit(11, OpenHiHat, 70)
        .every(1, Maracas, |i| 50 + (i % 2) * 10)
        .hit(3, OpenConga, 80)
        .hit(7, OpenConga, 75)
        .hit(11, OpenConga, 80)
        .hit(15, MuteConga, 65)
        .finish()
}

fn amapiano() -> Vec<Step> {
    use DrumVoice::*;
    Bar::new()
        // log drum
        .hit(0, LowTom, 100)
        .hit(4, LowTom, 85)
        .hit(8, LowTom, 95)
        .hit(3, Kick, 70)
        .hit(10, Kick, 75)
        .hit(4, SideStick, 85)
        .hit(12, SideStick, 85)
        .every(2, ClosedHiHat, |_| 70)
        .every(1, Maracas, |i| if i % 4 == 0 { 60 } else { 45 })
        .hit(7, OpenHiHat, 65)
        .hit(15, OpenHiHat, 60)
        .finish()
}

fn afro_fusion() -> Vec<Step> {
    use DrumVoice::*;
    Bar::new()
        .hit(0, Kick, 100)
        .hit(5, Kick, 70)
        .hit(10, Kick, 90)
        .hit(4, Snare, 95)
        .hit(12, Snare, 95)
        .hit(13, Snare, 50)
        .every(1, ClosedHiHat, |i| if i % 2 == 0 { 80 } else { 55 })
        .every(1, Maracas, |_| 45)
        .hit(3, OpenConga, 75)
        .hit(6, MuteConga, 65)
        .hit(11, OpenConga, 75)
        .hit(14, MuteConga, 65)
        .finish()
}
