//! Standard MIDI File export of drum patterns.
//!
//! Tracked beats alternate kick and snare; every onset adds a closed hi-hat.
//! Positions stay in fractional beats until serialization, where they are
//! rounded to ticks.

use std::collections::{HashMap, VecDeque};

use crescent_domain::{
    BeatEstimate, DomainError, DrumEvent, DrumPattern, DrumVoice, ExportFormat, JsonExporter,
    PatternExporter, PulseAccent, Tempo,
};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConversionError;

pub const TICKS_PER_QUARTER: u16 = 960;
/// General MIDI percussion channel (channel 10, zero-based).
pub const DRUM_CHANNEL: u8 = 9;
pub const TRACK_NAME: &str = "Beat Generator Drums";

pub const BEAT_DURATION: f64 = 0.25;
pub const BEAT_VELOCITY: u8 = 100;
pub const ONSET_DURATION: f64 = 0.125;
pub const ONSET_VELOCITY: u8 = 80;

const MAX_TICK: u64 = (1 << 28) - 1;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EncoderConfig {
    pub ticks_per_quarter: u16,
    pub track_name: String,
    pub beat_duration: f64,
    pub beat_velocity: u8,
    pub onset_duration: f64,
    pub onset_velocity: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ticks_per_quarter: TICKS_PER_QUARTER,
            track_name: TRACK_NAME.to_string(),
            beat_duration: BEAT_DURATION,
            beat_velocity: BEAT_VELOCITY,
            onset_duration: ONSET_DURATION,
            onset_velocity: ONSET_VELOCITY,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DrumEncoder {
    config: EncoderConfig,
}

impl DrumEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Maps detected times onto the target tempo. The estimate's own bpm is
    /// not used; positions are `t * bpm / 60` beats at `tempo`.
    pub fn pattern(
        &self,
        estimate: &BeatEstimate,
        tempo: Tempo,
    ) -> Result<DrumPattern, ConversionError> {
        let config = &self.config;
        let mut pattern = DrumPattern::new(config.track_name.clone(), tempo);
        for (index, &time) in estimate.beat_times().iter().enumerate() {
            let voice = PulseAccent::for_index(index).voice();
            pattern.push(event(
                voice,
                tempo.beat_at_time(time),
                config.beat_duration,
                config.beat_velocity,
            )?);
        }
        for &time in estimate.onset_times() {
            pattern.push(event(
                DrumVoice::ClosedHiHat,
                tempo.beat_at_time(time),
                config.onset_duration,
                config.onset_velocity,
            )?);
        }
        debug!(
            events = pattern.events.len(),
            bpm = tempo.bpm(),
            "built drum pattern"
        );
        Ok(pattern)
    }

    /// Serializes a pattern as a single-track (format 0) Standard MIDI File.
    pub fn encode(&self, pattern: &DrumPattern) -> Result<Vec<u8>, ConversionError> {
        let tpq = self.config.ticks_per_quarter;
        if tpq == 0 || tpq > 0x7FFF {
            return Err(ConversionError::Encode(format!(
                "ticks per quarter must be in 1..=32767, got {tpq}"
            )));
        }

        let mut notes = Vec::with_capacity(pattern.events.len() * 2);
        for hit in &pattern.events {
            let on = to_tick(hit.position, tpq)?;
            let off = to_tick(hit.end(), tpq)?.max(on + 1);
            if off > MAX_TICK {
                return Err(ConversionError::Encode(format!(
                    "note ending at beat {} does not fit in a midi track",
                    hit.end()
                )));
            }
            notes.push(NoteEdge {
                tick: on,
                on: true,
                key: hit.pitch(),
                velocity: hit.velocity,
            });
            notes.push(NoteEdge {
                tick: off,
                on: false,
                key: hit.pitch(),
                velocity: 0,
            });
        }
        // Releases sort ahead of attacks on the same tick.
        notes.sort_by_key(|edge| (edge.tick, edge.on));

        let mut track = vec![
            TrackEvent {
                delta: u28::from(0),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(pattern.name.as_bytes())),
            },
            TrackEvent {
                delta: u28::from(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(
                    pattern.tempo.micros_per_quarter(),
                ))),
            },
            TrackEvent {
                delta: u28::from(0),
                kind: TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
            },
        ];

        let channel = u4::from(DRUM_CHANNEL);
        let mut current = 0u64;
        for edge in &notes {
            let delta = (edge.tick - current) as u32;
            current = edge.tick;
            let message = if edge.on {
                MidiMessage::NoteOn {
                    key: u7::from(edge.key),
                    vel: u7::from(edge.velocity),
                }
            } else {
                MidiMessage::NoteOff {
                    key: u7::from(edge.key),
                    vel: u7::from(0),
                }
            };
            track.push(TrackEvent {
                delta: u28::from(delta),
                kind: TrackEventKind::Midi { channel, message },
            });
        }
        track.push(TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });

        let smf = Smf {
            header: Header {
                format: Format::SingleTrack,
                timing: Timing::Metrical(u15::from(tpq)),
            },
            tracks: vec![track],
        };
        let mut bytes = Vec::new();
        smf.write(&mut bytes)
            .map_err(|err| ConversionError::Encode(format!("failed to write midi data: {err:?}")))?;
        Ok(bytes)
    }

    /// Pattern plus serialization in one step.
    pub fn convert(&self, estimate: &BeatEstimate, tempo: Tempo) -> Result<Vec<u8>, ConversionError> {
        let pattern = self.pattern(estimate, tempo)?;
        self.encode(&pattern)
    }
}

impl PatternExporter for DrumEncoder {
    fn export(&self, pattern: &DrumPattern, format: ExportFormat) -> Result<Vec<u8>, DomainError> {
        match format {
            ExportFormat::Midi => self
                .encode(pattern)
                .map_err(|err| DomainError::Serialization(err.to_string())),
            ExportFormat::Json => JsonExporter.export(pattern, format),
        }
    }
}

/// Reads a drum track back from MIDI bytes. Note-ons pair with the earliest
/// open note of the same key; notes outside the drum map are skipped.
pub fn decode_pattern(bytes: &[u8]) -> Result<DrumPattern, ConversionError> {
    let smf = Smf::parse(bytes).map_err(|err| ConversionError::Parse(format!("{err:?}")))?;
    let tpq = match smf.header.timing {
        Timing::Metrical(t) => t.as_int() as f64,
        Timing::Timecode(..) => {
            return Err(ConversionError::Parse(
                "timecode-based midi timing is not supported".to_string(),
            ))
        }
    };

    let mut name = String::new();
    let mut tempo = Tempo::default();
    let mut events = Vec::new();
    let mut open: HashMap<u8, VecDeque<(u64, u8)>> = HashMap::new();

    for track in &smf.tracks {
        let mut tick = 0u64;
        for event in track {
            tick += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Meta(MetaMessage::TrackName(raw)) if name.is_empty() => {
                    name = String::from_utf8_lossy(raw).into_owned();
                }
                TrackEventKind::Meta(MetaMessage::Tempo(micros)) => {
                    tempo = Tempo::from_micros_per_quarter(micros.as_int())
                        .map_err(ConversionError::Tempo)?;
                }
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        open.entry(key.as_int())
                            .or_default()
                            .push_back((tick, vel.as_int()));
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let key = key.as_int();
                        let Some((start, velocity)) =
                            open.get_mut(&key).and_then(|queue| queue.pop_front())
                        else {
                            debug!(key, tick, "note-off without a matching note-on");
                            continue;
                        };
                        let Some(voice) = DrumVoice::from_midi_note(key) else {
                            debug!(key, "skipping note outside the drum map");
                            continue;
                        };
                        if tick == start {
                            debug!(key, tick, "skipping zero-length note");
                            continue;
                        }
                        let hit = DrumEvent::new(
                            voice,
                            start as f64 / tpq,
                            (tick - start) as f64 / tpq,
                            velocity,
                        )
                        .map_err(|err| ConversionError::Parse(err.to_string()))?;
                        events.push(hit);
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    let unclosed: usize = open.values().map(VecDeque::len).sum();
    if unclosed > 0 {
        warn!(unclosed, "dropping notes that were never released");
    }

    events.sort_by(|a: &DrumEvent, b: &DrumEvent| a.position.total_cmp(&b.position));
    Ok(DrumPattern { name, tempo, events })
}

struct NoteEdge {
    tick: u64,
    on: bool,
    key: u8,
    velocity: u8,
}

fn event(voice: DrumVoice, position: f64, duration: f64, velocity: u8) -> Result<DrumEvent, ConversionError> {
    DrumEvent::new(voice, position, duration, velocity)
        .map_err(|err| ConversionError::Encode(err.to_string()))
}

fn to_tick(beats: f64, tpq: u16) -> Result<u64, ConversionError> {
    let ticks = (beats * tpq as f64).round();
    if !ticks.is_finite() || ticks < 0.0 || ticks > MAX_TICK as f64 {
        return Err(ConversionError::Encode(format!(
            "beat position {beats} does not fit in a midi track"
        )));
    }
    Ok(ticks as u64)
}
