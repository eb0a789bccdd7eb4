use serde::{Deserialize, Serialize};

/// Peak-picking windows, in seconds, plus the threshold above the local mean.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct OnsetConfig {
    pub pre_max: f64,
    pub post_max: f64,
    pub pre_avg: f64,
    pub post_avg: f64,
    /// Minimum gap between two onsets.
    pub wait: f64,
    pub delta: f32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            pre_max: 0.03,
            post_max: 0.0,
            pre_avg: 0.1,
            post_avg: 0.1,
            wait: 0.03,
            delta: 0.07,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Windows {
    pre_max: usize,
    post_max: usize,
    pre_avg: usize,
    post_avg: usize,
    wait: usize,
}

impl Windows {
    fn new(config: &OnsetConfig, frame_rate: f64) -> Self {
        let frames = |secs: f64| (secs * frame_rate).round().max(0.0) as usize;
        Self {
            pre_max: frames(config.pre_max),
            post_max: frames(config.post_max) + 1,
            pre_avg: frames(config.pre_avg),
            post_avg: frames(config.post_avg) + 1,
            wait: frames(config.wait),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct OnsetPicker {
    config: OnsetConfig,
}

impl OnsetPicker {
    pub fn new(config: OnsetConfig) -> Self {
        Self { config }
    }

    /// Frame indices of onsets, ascending. The envelope is rescaled to [0, 1]
    /// first; a flat envelope has no onsets.
    pub fn pick(&self, envelope: &[f32], frame_rate: f64) -> Vec<usize> {
        let Some(normalized) = min_max_normalize(envelope) else {
            return Vec::new();
        };
        let windows = Windows::new(&self.config, frame_rate);
        let n = normalized.len();

        let mut onsets = Vec::new();
        let mut last: Option<usize> = None;
        for i in 0..n {
            let max_range = i.saturating_sub(windows.pre_max)..(i + windows.post_max).min(n);
            let local_max = normalized[max_range].iter().copied().fold(f32::MIN, f32::max);
            if normalized[i] != local_max {
                continue;
            }

            let avg_range = i.saturating_sub(windows.pre_avg)..(i + windows.post_avg).min(n);
            let span = &normalized[avg_range];
            let local_avg = span.iter().sum::<f32>() / span.len() as f32;
            if normalized[i] < local_avg + self.config.delta {
                continue;
            }

            if last.map_or(true, |prev| i > prev + windows.wait) {
                onsets.push(i);
                last = Some(i);
            }
        }
        onsets
    }
}

fn min_max_normalize(envelope: &[f32]) -> Option<Vec<f32>> {
    let min = envelope.iter().copied().fold(f32::INFINITY, f32::min);
    let max = envelope.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if !(range > 0.0) {
        return None;
    }
    Some(envelope.iter().map(|v| (v - min) / range).collect())
}
