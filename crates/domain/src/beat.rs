use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Tempo plus beat and onset positions (in seconds) detected in one waveform.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BeatEstimate {
    bpm: f64,
    beat_times: Vec<f64>,
    onset_times: Vec<f64>,
}

impl BeatEstimate {
    pub fn new(
        bpm: f64,
        beat_times: Vec<f64>,
        onset_times: Vec<f64>,
    ) -> Result<Self, DomainError> {
        if !bpm.is_finite() || bpm < 0.0 {
            return Err(DomainError::validation(format!(
                "estimated tempo must be finite and non-negative, got {bpm}"
            )));
        }
        check_times("beat", &beat_times)?;
        check_times("onset", &onset_times)?;
        Ok(Self {
            bpm,
            beat_times,
            onset_times,
        })
    }

    /// Result for silent or too-short audio: no tempo, no events.
    pub fn degenerate() -> Self {
        Self::default()
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn beat_times(&self) -> &[f64] {
        &self.beat_times
    }

    pub fn onset_times(&self) -> &[f64] {
        &self.onset_times
    }

    pub fn is_degenerate(&self) -> bool {
        self.bpm == 0.0 && self.beat_times.is_empty() && self.onset_times.is_empty()
    }
}

fn check_times(kind: &str, times: &[f64]) -> Result<(), DomainError> {
    if let Some(bad) = times.iter().find(|t| !t.is_finite() || **t < 0.0) {
        return Err(DomainError::validation(format!(
            "{kind} time {bad} must be finite and non-negative"
        )));
    }
    if times.windows(2).any(|pair| pair[1] < pair[0]) {
        return Err(DomainError::validation(format!(
            "{kind} times must be sorted ascending"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_validates_sequences() {
        assert!(BeatEstimate::new(120.0, vec![0.0, 0.5, 1.0], vec![0.25]).is_ok());
        assert!(BeatEstimate::new(120.0, vec![0.5, 0.0], vec![]).is_err());
        assert!(BeatEstimate::new(120.0, vec![], vec![-0.1]).is_err());
        assert!(BeatEstimate::new(f64::NAN, vec![], vec![]).is_err());
    }

    #[test]
    fn degenerate_estimate_is_empty() {
        let estimate = BeatEstimate::degenerate();
        assert!(estimate.is_degenerate());
        assert_eq!(estimate.bpm(), 0.0);
        assert!(estimate.beat_times().is_empty());
        assert!(estimate.onset_times().is_empty());
        let non_empty = BeatEstimate::new(0.0, vec![], vec![1.0]).unwrap();
        assert!(!non_empty.is_degenerate());
    }
}
