use std::fs;
use std::path::{Path, PathBuf};

use crescent_audio::{normalize_file, Waveform};
use crescent_domain::tempo::DEFAULT_BPM;
use crescent_domain::{BeatEstimate, ExportFormat, PatternExporter, Tempo};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::detector::{BeatDetector, DetectorConfig};
use crate::error::{ConversionError, Stage};
use crate::midi::{DrumEncoder, EncoderConfig};

/// One audio file to convert into a drum track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionJob {
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
    pub target_bpm: u16,
    /// Peak-normalize before analysis: the file in place when it is a WAV,
    /// otherwise the decoded samples.
    pub normalize: bool,
    pub format: ExportFormat,
}

impl TranscriptionJob {
    pub fn new(audio_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            output_path: output_path.into(),
            target_bpm: DEFAULT_BPM,
            normalize: false,
            format: ExportFormat::Midi,
        }
    }

    pub fn with_target_bpm(mut self, bpm: u16) -> Self {
        self.target_bpm = bpm;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }
}

/// Where peak normalization was applied for a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    Skipped,
    /// The audio file was rewritten in place.
    File,
    /// The file could not be rewritten; only the decoded samples were scaled.
    InMemory,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionReport {
    pub output_path: PathBuf,
    pub estimate: BeatEstimate,
    pub event_count: usize,
    pub normalization: Normalization,
}

/// Normalize, detect, encode, write. Holds no per-call state, so one pipeline
/// can be cloned onto as many worker threads as needed.
#[derive(Clone, Debug, Default)]
pub struct TranscriptionPipeline {
    detector: BeatDetector,
    encoder: DrumEncoder,
}

impl TranscriptionPipeline {
    pub fn new(detector: DetectorConfig, encoder: EncoderConfig) -> Self {
        Self {
            detector: BeatDetector::new(detector),
            encoder: DrumEncoder::new(encoder),
        }
    }

    /// Decodes an audio file and runs the detector on it.
    pub fn analyze(&self, audio_path: &Path) -> Result<BeatEstimate, ConversionError> {
        self.detector.detect(&load(audio_path)?)
    }

    #[instrument(skip(self, job), fields(audio = %job.audio_path.display(), bpm = job.target_bpm))]
    pub fn transcribe(&self, job: &TranscriptionJob) -> Result<TranscriptionReport, ConversionError> {
        let tempo = Tempo::requested(job.target_bpm).map_err(ConversionError::Tempo)?;

        let rewritten = job.normalize && normalize_in_place(&job.audio_path);
        let mut waveform = load(&job.audio_path)?;
        let normalization = match (job.normalize, rewritten) {
            (false, _) => Normalization::Skipped,
            (true, true) => Normalization::File,
            (true, false) => {
                let level = waveform.normalize();
                info!(peak = level.peak, gain = level.gain, "normalized decoded samples");
                Normalization::InMemory
            }
        };
        let estimate = self.detector.detect(&waveform)?;
        let pattern = self.encoder.pattern(&estimate, tempo)?;
        let bytes = match job.format {
            ExportFormat::Midi => self.encoder.encode(&pattern)?,
            format => self
                .encoder
                .export(&pattern, format)
                .map_err(|err| ConversionError::Encode(err.to_string()))?,
        };

        fs::write(&job.output_path, &bytes).map_err(|source| ConversionError::Write {
            path: job.output_path.clone(),
            source,
        })?;
        info!(
            output = %job.output_path.display(),
            events = pattern.events.len(),
            bytes = bytes.len(),
            "wrote drum track"
        );

        Ok(TranscriptionReport {
            output_path: job.output_path.clone(),
            estimate,
            event_count: pattern.events.len(),
            normalization,
        })
    }
}

fn load(audio_path: &Path) -> Result<Waveform, ConversionError> {
    Waveform::load(audio_path).map_err(|source| ConversionError::Decode {
        path: audio_path.to_path_buf(),
        source,
    })
}

/// Returns whether the file was rewritten. Failures are logged and swallowed.
fn normalize_in_place(audio_path: &Path) -> bool {
    match normalize_file(audio_path) {
        Ok(level) => {
            info!(peak = level.peak, gain = level.gain, "normalized input file");
            true
        }
        Err(source) => {
            let err = ConversionError::Normalize {
                path: audio_path.to_path_buf(),
                source,
            };
            warn!(stage = %Stage::Normalize, error = %err, "normalizing decoded samples instead");
            false
        }
    }
}

/// Converts an audio file into a MIDI drum track at `target_bpm` with default settings.
pub fn audio_to_midi(
    audio_path: impl Into<PathBuf>,
    midi_path: impl Into<PathBuf>,
    target_bpm: u16,
) -> Result<TranscriptionReport, ConversionError> {
    let job = TranscriptionJob::new(audio_path, midi_path).with_target_bpm(target_bpm);
    TranscriptionPipeline::default().transcribe(&job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crescent_audio::io::{pcm16_spec, write_wav, AudioReader};
    use crescent_audio::signal::click_track;

    fn write_clicks(path: &Path, seconds: f64) {
        let sample_rate = 22_050;
        let len = (seconds * sample_rate as f64) as usize;
        let audio = AudioReader {
            sample_rate,
            channels: 1,
            samples: click_track(sample_rate, 21 * 512, len),
        };
        write_wav(path, &audio, pcm16_spec(sample_rate, 1)).unwrap();
    }

    #[test]
    fn pipeline_handles_missing_audio() {
        let dir = tempfile::tempdir().unwrap();
        let job = TranscriptionJob::new("missing.wav", dir.path().join("out.mid"));
        let err = TranscriptionPipeline::default().transcribe(&job).unwrap_err();
        assert_eq!(err.stage(), Stage::Decode);
        assert!(!dir.path().join("out.mid").exists());
    }

    #[test]
    fn out_of_range_tempo_is_rejected_before_work() {
        let dir = tempfile::tempdir().unwrap();
        let job = TranscriptionJob::new("missing.wav", dir.path().join("out.mid")).with_target_bpm(250);
        let err = TranscriptionPipeline::default().transcribe(&job).unwrap_err();
        assert!(matches!(err, ConversionError::Tempo(_)));
    }

    #[test]
    fn mp3_input_is_normalized_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("beat.wav");
        write_clicks(&audio, 3.0);
        // A mp3 extension on wav data decodes fine but cannot be rewritten.
        let disguised = dir.path().join("beat.mp3");
        fs::rename(&audio, &disguised).unwrap();
        let before = fs::read(&disguised).unwrap();

        let job = TranscriptionJob::new(&disguised, dir.path().join("beat.mid")).with_normalize(true);
        let report = TranscriptionPipeline::default().transcribe(&job).unwrap();
        assert_eq!(report.normalization, Normalization::InMemory);
        assert!(report.estimate.bpm() > 0.0);
        assert!(report.output_path.exists());
        assert_eq!(fs::read(&disguised).unwrap(), before);
    }

    #[test]
    fn normalization_is_skipped_unless_asked() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("beat.mp3");
        write_clicks(&audio, 3.0);
        let job = TranscriptionJob::new(&audio, dir.path().join("beat.mid"));
        let report = TranscriptionPipeline::default().transcribe(&job).unwrap();
        assert_eq!(report.normalization, Normalization::Skipped);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["normalization"], "skipped");
    }

    #[test]
    fn writes_midi_for_clicks() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("beat.wav");
        write_clicks(&audio, 6.0);

        let report = audio_to_midi(&audio, dir.path().join("beat.mid"), 90).unwrap();
        assert!(report.estimate.bpm() > 0.0);
        assert_eq!(
            report.event_count,
            report.estimate.beat_times().len() + report.estimate.onset_times().len()
        );
        let bytes = fs::read(&report.output_path).unwrap();
        assert_eq!(&bytes[..4], b"MThd");
    }

    #[test]
    fn json_output_describes_the_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("beat.wav");
        write_clicks(&audio, 3.0);

        let job = TranscriptionJob::new(&audio, dir.path().join("beat.json"))
            .with_format(ExportFormat::Json)
            .with_normalize(true);
        let report = TranscriptionPipeline::default().transcribe(&job).unwrap();
        assert_eq!(report.normalization, Normalization::File);
        let text = fs::read_to_string(&report.output_path).unwrap();
        assert!(text.contains("\"name\": \"Beat Generator Drums\""));
        assert!(text.contains("\"tempo\": 120.0"));
    }
}
