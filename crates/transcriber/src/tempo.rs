use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TempoConfig {
    /// Centre of the tempo prior.
    pub start_bpm: f64,
    /// Width of the tempo prior, in octaves.
    pub std_octaves: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            start_bpm: 120.0,
            std_octaves: 1.0,
            min_bpm: 30.0,
            max_bpm: 320.0,
        }
    }
}

impl TempoConfig {
    pub fn with_start_bpm(mut self, start_bpm: f64) -> Self {
        self.start_bpm = start_bpm;
        self
    }

    fn prior(&self, bpm: f64) -> f64 {
        let octaves = (bpm / self.start_bpm).log2() / self.std_octaves;
        (-0.5 * octaves * octaves).exp()
    }
}

/// Global tempo from the autocorrelation of an onset envelope.
#[derive(Clone, Debug, Default)]
pub struct TempoEstimator {
    config: TempoConfig,
}

impl TempoEstimator {
    pub fn new(config: TempoConfig) -> Self {
        Self { config }
    }

    /// Returns `None` when the envelope is flat or too short to hold one period.
    pub fn estimate(&self, envelope: &[f32], frame_rate: f64) -> Option<f64> {
        if envelope.len() < 2 || !envelope.iter().any(|v| *v > 0.0) {
            return None;
        }
        let min_lag = ((frame_rate * 60.0 / self.config.max_bpm).ceil() as usize).max(1);
        let max_lag =
            ((frame_rate * 60.0 / self.config.min_bpm).floor() as usize).min(envelope.len() - 1);
        if max_lag < min_lag {
            debug!(
                frames = envelope.len(),
                min_lag, max_lag, "envelope too short for tempo estimation"
            );
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for lag in min_lag..=max_lag {
            let correlation: f64 = envelope
                .iter()
                .zip(&envelope[lag..])
                .map(|(a, b)| *a as f64 * *b as f64)
                .sum();
            let bpm = 60.0 * frame_rate / lag as f64;
            let score = correlation * self.config.prior(bpm);
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((lag, score));
            }
        }

        let (lag, score) = best?;
        let bpm = 60.0 * frame_rate / lag as f64;
        debug!(lag, score, bpm, "estimated tempo");
        Some(bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Envelope with a unit pulse every `period` frames.
    fn pulses(period: usize, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| if i % period == 0 { 1.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn finds_pulse_period() {
        let frame_rate = 50.0;
        // 25 frames at 50 fps is 0.5 s, i.e. 120 bpm.
        let bpm = TempoEstimator::default()
            .estimate(&pulses(25, 500), frame_rate)
            .unwrap();
        assert!((bpm - 120.0).abs() < 1e-9);
    }

    #[test]
    fn prior_decides_between_octaves() {
        let frame_rate = 50.0;
        // Pulses every 15 frames match at 200 bpm and at every multiple of the
        // period; the prior around 120 bpm favours the 100 bpm reading.
        let bpm = TempoEstimator::default()
            .estimate(&pulses(15, 600), frame_rate)
            .unwrap();
        assert!((bpm - 100.0).abs() < 1e-9);

        let fast_prior = TempoEstimator::new(TempoConfig::default().with_start_bpm(200.0));
        let bpm = fast_prior.estimate(&pulses(15, 600), frame_rate).unwrap();
        assert!((bpm - 200.0).abs() < 1e-9);
    }

    #[test]
    fn flat_or_short_envelopes_have_no_tempo() {
        let estimator = TempoEstimator::default();
        assert_eq!(estimator.estimate(&[], 43.0), None);
        assert_eq!(estimator.estimate(&[0.0; 400], 43.0), None);
        assert_eq!(estimator.estimate(&[0.0, 1.0, 0.0], 43.0), None);
    }
}
