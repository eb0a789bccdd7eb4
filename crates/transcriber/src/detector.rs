use crescent_audio::spectral::{frames_to_time, onset_strength};
use crescent_audio::{SpectralConfig, Waveform};
use crescent_domain::BeatEstimate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::beats::{BeatTrackConfig, BeatTracker};
use crate::error::ConversionError;
use crate::onset::{OnsetConfig, OnsetPicker};
use crate::tempo::{TempoConfig, TempoEstimator};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DetectorConfig {
    pub spectral: SpectralConfig,
    pub tempo: TempoConfig,
    pub beats: BeatTrackConfig,
    pub onset: OnsetConfig,
}

/// Finds tempo, beats and onsets in a mono waveform. Stateless between calls.
#[derive(Clone, Debug, Default)]
pub struct BeatDetector {
    config: DetectorConfig,
    tempo: TempoEstimator,
    tracker: BeatTracker,
    picker: OnsetPicker,
}

impl BeatDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            tempo: TempoEstimator::new(config.tempo),
            tracker: BeatTracker::new(config.beats),
            picker: OnsetPicker::new(config.onset),
        }
    }

    /// Onsets are picked independently of the tempo estimate, so audio with
    /// transients but no steady pulse keeps its onsets with a zero tempo.
    /// Silent or empty audio yields [`BeatEstimate::degenerate`].
    #[instrument(skip(self, waveform), fields(sample_rate = waveform.sample_rate(), duration = waveform.duration_secs()))]
    pub fn detect(&self, waveform: &Waveform) -> Result<BeatEstimate, ConversionError> {
        let spectral = &self.config.spectral;
        let envelope =
            onset_strength(waveform.samples(), spectral).map_err(ConversionError::Detect)?;
        let frame_rate = spectral.frame_rate(waveform.sample_rate());
        let to_seconds =
            |frames: &[usize]| frames_to_time(frames, waveform.sample_rate(), spectral.hop_length);

        let onset_frames = self.picker.pick(&envelope, frame_rate);
        let (bpm, beat_frames) = match self.tempo.estimate(&envelope, frame_rate) {
            Some(bpm) => (bpm, self.tracker.track(&envelope, bpm, frame_rate)),
            None => {
                debug!(
                    frames = envelope.len(),
                    onsets = onset_frames.len(),
                    "no periodicity found"
                );
                (0.0, Vec::new())
            }
        };

        let estimate = BeatEstimate::new(bpm, to_seconds(&beat_frames), to_seconds(&onset_frames))
            .map_err(ConversionError::Estimate)?;
        info!(
            bpm = estimate.bpm(),
            beats = estimate.beat_times().len(),
            onsets = estimate.onset_times().len(),
            "detected rhythm"
        );
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crescent_audio::signal::click_track;

    const SAMPLE_RATE: u32 = 22_050;
    const CLICK_INTERVAL: usize = 21 * 512;

    fn clicks(seconds: f64) -> Waveform {
        let len = (seconds * SAMPLE_RATE as f64) as usize;
        Waveform::new(click_track(SAMPLE_RATE, CLICK_INTERVAL, len), SAMPLE_RATE).unwrap()
    }

    #[test]
    fn click_track_tempo_and_beats() {
        let estimate = BeatDetector::default().detect(&clicks(8.0)).unwrap();
        let period = CLICK_INTERVAL as f64 / SAMPLE_RATE as f64;

        assert!(
            (115.0..130.0).contains(&estimate.bpm()),
            "bpm {}",
            estimate.bpm()
        );
        let beats = estimate.beat_times();
        assert!(beats.len() >= 10, "only {} beats", beats.len());
        assert!(beats.iter().all(|t| *t >= 0.0));
        for pair in beats.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((gap - period).abs() < 0.05, "beat gap {gap}");
        }
    }

    #[test]
    fn click_track_onsets_sit_on_clicks() {
        let estimate = BeatDetector::default().detect(&clicks(8.0)).unwrap();
        let period = CLICK_INTERVAL as f64 / SAMPLE_RATE as f64;
        let onsets = estimate.onset_times();

        assert!(onsets.windows(2).all(|w| w[0] <= w[1]));
        for k in 1..16 {
            let click = k as f64 * period;
            assert!(
                onsets.iter().any(|t| (t - click).abs() < 0.06),
                "no onset near click at {click:.3}s"
            );
        }
        assert!(onsets.len() <= 2 * 17);
    }

    #[test]
    fn silence_is_degenerate() {
        let silent = Waveform::new(vec![0.0; SAMPLE_RATE as usize * 2], SAMPLE_RATE).unwrap();
        let estimate = BeatDetector::default().detect(&silent).unwrap();
        assert!(estimate.is_degenerate());
    }

    #[test]
    fn empty_audio_is_degenerate() {
        let empty = Waveform::new(Vec::new(), SAMPLE_RATE).unwrap();
        assert!(BeatDetector::default().detect(&empty).unwrap().is_degenerate());
    }

    #[test]
    fn short_audio_has_no_tempo() {
        let estimate = BeatDetector::default().detect(&clicks(0.1)).unwrap();
        assert_eq!(estimate.bpm(), 0.0);
        assert!(estimate.beat_times().is_empty());
    }

    #[test]
    fn lone_hit_keeps_its_onset_without_tempo() {
        // One second of silence, then a single click and two seconds of decay.
        let second = SAMPLE_RATE as usize;
        let mut samples = vec![0.0f32; second];
        samples.extend(click_track(SAMPLE_RATE, 3 * second, 2 * second));
        let waveform = Waveform::new(samples, SAMPLE_RATE).unwrap();

        let estimate = BeatDetector::default().detect(&waveform).unwrap();
        assert_eq!(estimate.bpm(), 0.0);
        assert!(estimate.beat_times().is_empty());
        assert_eq!(estimate.onset_times().len(), 1, "{:?}", estimate.onset_times());
        assert!((estimate.onset_times()[0] - 1.0).abs() < 0.05);
    }

    #[test]
    fn bad_analysis_config_fails_in_detect_stage() {
        let config = DetectorConfig {
            spectral: SpectralConfig {
                hop_length: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = BeatDetector::new(config).detect(&clicks(1.0)).unwrap_err();
        assert_eq!(err.stage(), crate::error::Stage::Detect);
    }
}
