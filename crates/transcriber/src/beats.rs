use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct BeatTrackConfig {
    /// How strongly beat spacing is held to the estimated period.
    pub tightness: f64,
    /// Drop weak beats at the start and end of the track.
    pub trim: bool,
}

impl Default for BeatTrackConfig {
    fn default() -> Self {
        Self {
            tightness: 100.0,
            trim: true,
        }
    }
}

/// Dynamic-programming beat tracker over an onset envelope.
#[derive(Clone, Debug, Default)]
pub struct BeatTracker {
    config: BeatTrackConfig,
}

impl BeatTracker {
    pub fn new(config: BeatTrackConfig) -> Self {
        Self { config }
    }

    /// Beat frame indices, ascending, for a track at `bpm`.
    pub fn track(&self, envelope: &[f32], bpm: f64, frame_rate: f64) -> Vec<usize> {
        if envelope.is_empty() || !(bpm > 0.0) || !(frame_rate > 0.0) {
            return Vec::new();
        }
        let period = (60.0 * frame_rate / bpm).round().max(1.0);
        let Some(local) = local_score(envelope, period) else {
            return Vec::new();
        };
        let (cumulative, backlinks) = self.dynamic_program(&local, period);
        let Some(last) = last_beat(&cumulative) else {
            return Vec::new();
        };

        let mut beats = vec![last];
        while let Some(previous) = backlinks[beats[beats.len() - 1]] {
            beats.push(previous);
        }
        beats.reverse();

        if self.config.trim {
            beats = trim_beats(&local, beats);
        }
        debug!(period, count = beats.len(), "tracked beats");
        beats
    }

    fn dynamic_program(&self, local: &[f64], period: f64) -> (Vec<f64>, Vec<Option<usize>>) {
        let n = local.len();
        let far = (2.0 * period) as usize;
        let near = ((period / 2.0).round() as usize).max(1);
        let threshold = 0.01 * local.iter().copied().fold(0.0, f64::max);

        let mut cumulative = vec![0.0f64; n];
        let mut backlinks = vec![None; n];
        let mut first_beat = true;
        for i in 0..n {
            let mut best: Option<(usize, f64)> = None;
            if i >= near {
                for previous in i.saturating_sub(far)..=(i - near) {
                    let gap = (i - previous) as f64 / period;
                    let score = cumulative[previous] - self.config.tightness * gap.ln().powi(2);
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((previous, score));
                    }
                }
            }
            match best {
                Some((previous, score)) if !(first_beat && local[i] < threshold) => {
                    cumulative[i] = local[i] + score;
                    backlinks[i] = Some(previous);
                    first_beat = false;
                }
                _ => {
                    cumulative[i] = local[i];
                    if local[i] >= threshold {
                        first_beat = false;
                    }
                }
            }
        }
        (cumulative, backlinks)
    }
}

/// Envelope scaled to unit standard deviation and smoothed by a Gaussian one
/// period wide. `None` if the envelope is constant.
fn local_score(envelope: &[f32], period: f64) -> Option<Vec<f64>> {
    let n = envelope.len();
    if n < 2 {
        return None;
    }
    let mean = envelope.iter().map(|v| *v as f64).sum::<f64>() / n as f64;
    let variance = envelope
        .iter()
        .map(|v| (*v as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    let std = variance.sqrt();
    if !(std > 0.0) {
        return None;
    }

    let half = period as isize;
    let kernel: Vec<f64> = (-half..=half)
        .map(|k| {
            let x = k as f64 * 32.0 / period;
            (-0.5 * x * x).exp()
        })
        .collect();

    let scores = (0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, w)| {
                    let idx = i + j as isize - half;
                    (0..n as isize)
                        .contains(&idx)
                        .then(|| w * envelope[idx as usize] as f64 / std)
                })
                .sum()
        })
        .collect();
    Some(scores)
}

/// Last local maximum of the cumulative score that reaches half the median peak.
fn last_beat(cumulative: &[f64]) -> Option<usize> {
    let n = cumulative.len();
    let maxima: Vec<usize> = (0..n)
        .filter(|&i| {
            let left = if i == 0 { cumulative[i] } else { cumulative[i - 1] };
            let right = if i + 1 == n { cumulative[i] } else { cumulative[i + 1] };
            cumulative[i] > left && cumulative[i] >= right
        })
        .collect();
    if maxima.is_empty() {
        return None;
    }
    let mut peaks: Vec<f64> = maxima.iter().map(|&i| cumulative[i]).collect();
    peaks.sort_by(|a, b| a.total_cmp(b));
    let middle = peaks.len() / 2;
    let median = if peaks.len() % 2 == 0 {
        (peaks[middle - 1] + peaks[middle]) / 2.0
    } else {
        peaks[middle]
    };
    maxima
        .into_iter()
        .rev()
        .find(|&i| 2.0 * cumulative[i] > median)
}

/// Removes leading and trailing beats whose smoothed local score falls below
/// half the RMS of the smoothed scores. The last strong beat is dropped as
/// well: the kept range is half-open.
fn trim_beats(local: &[f64], beats: Vec<usize>) -> Vec<usize> {
    const SMOOTHING: [f64; 5] = [0.0, 0.5, 1.0, 0.5, 0.0];
    let strengths: Vec<f64> = beats.iter().map(|&b| local[b]).collect();
    let smoothed: Vec<f64> = (0..strengths.len())
        .map(|i| {
            SMOOTHING
                .iter()
                .enumerate()
                .filter_map(|(j, w)| {
                    (i + j)
                        .checked_sub(2)
                        .and_then(|idx| strengths.get(idx))
                        .map(|s| w * s)
                })
                .sum()
        })
        .collect();
    let rms = (smoothed.iter().map(|s| s * s).sum::<f64>() / smoothed.len().max(1) as f64).sqrt();
    let threshold = 0.5 * rms;

    let first = smoothed.iter().position(|s| *s > threshold);
    let last = smoothed.iter().rposition(|s| *s > threshold);
    match (first, last) {
        (Some(first), Some(last)) => beats[first..last].to_vec(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulses(period: usize, offset: usize, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| if i >= offset && (i - offset) % period == 0 { 1.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn beats_follow_pulses() {
        let frame_rate = 50.0;
        let envelope = pulses(25, 10, 600);
        let beats = BeatTracker::default().track(&envelope, 120.0, frame_rate);

        assert!(beats.len() >= 20, "only {} beats", beats.len());
        assert!(beats.windows(2).all(|w| w[0] < w[1]));
        for beat in &beats {
            assert_eq!((beat - 10) % 25, 0, "beat {beat} is off the pulse grid");
        }
    }

    #[test]
    fn empty_and_flat_envelopes_have_no_beats() {
        let tracker = BeatTracker::default();
        assert!(tracker.track(&[], 120.0, 43.0).is_empty());
        assert!(tracker.track(&[0.5; 200], 120.0, 43.0).is_empty());
        assert!(tracker.track(&pulses(25, 0, 200), 0.0, 43.0).is_empty());
    }

    #[test]
    fn last_beat_uses_median_of_peaks() {
        let cumulative = [0.0, 3.0, 1.0, 4.0, 2.0, 0.5, 0.6, 0.1];
        // maxima at 1, 3, 6 with median 3.0; index 6 is too weak.
        assert_eq!(last_beat(&cumulative), Some(3));
    }

    #[test]
    fn trimming_drops_weak_edges() {
        let mut local = vec![0.0; 100];
        let beats: Vec<usize> = (0..10).map(|i| i * 10).collect();
        for &b in &beats[2..8] {
            local[b] = 1.0;
        }
        let trimmed = trim_beats(&local, beats);
        assert_eq!(trimmed, vec![20, 30, 40, 50, 60]);
    }
}
