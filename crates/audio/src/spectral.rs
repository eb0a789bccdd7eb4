use ndarray::Array2;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};

use crate::error::AudioError;

/// Floor applied to power values before taking the logarithm.
const AMIN: f32 = 1e-10;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpectralConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    /// Dynamic range kept below the loudest bin, in dB.
    pub top_db: f32,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            top_db: 80.0,
        }
    }
}

impl SpectralConfig {
    pub fn validate(&self) -> Result<(), AudioError> {
        if self.n_fft < 2 {
            return Err(AudioError::InvalidParameter {
                name: "n_fft",
                reason: "must be at least 2",
            });
        }
        if self.hop_length == 0 {
            return Err(AudioError::InvalidParameter {
                name: "hop_length",
                reason: "must be > 0",
            });
        }
        if !(self.top_db > 0.0) {
            return Err(AudioError::InvalidParameter {
                name: "top_db",
                reason: "must be > 0",
            });
        }
        Ok(())
    }

    /// Analysis frames per second.
    pub fn frame_rate(&self, sample_rate: u32) -> f64 {
        sample_rate as f64 / self.hop_length as f64
    }

    /// Frame count of a centered STFT over `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            1 + len / self.hop_length
        }
    }
}

/// Periodic Hann window.
pub fn hann(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let m = n as f32;
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / m).cos())
        .collect()
}

/// Power spectrogram of shape (n_fft / 2 + 1, frames). Frames are centered on
/// multiples of the hop length with zero padding at both ends.
pub fn power_spectrogram(samples: &[f32], config: &SpectralConfig) -> Result<Array2<f32>, AudioError> {
    config.validate()?;
    let n_fft = config.n_fft;
    let n_freq = n_fft / 2 + 1;
    let n_frames = config.frame_count(samples.len());
    let mut spec = Array2::<f32>::zeros((n_freq, n_frames));
    if n_frames == 0 {
        return Ok(spec);
    }

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut input = fft.make_input_vec();
    let mut output = fft.make_output_vec();
    let window = hann(n_fft);
    let pad = n_fft / 2;

    for t in 0..n_frames {
        let start = t * config.hop_length;
        for (i, slot) in input.iter_mut().enumerate() {
            let sample = (start + i)
                .checked_sub(pad)
                .and_then(|idx| samples.get(idx))
                .copied()
                .unwrap_or(0.0);
            *slot = sample * window[i];
        }
        fft.process(&mut input, &mut output)
            .map_err(|err| AudioError::Fft(err.to_string()))?;
        for (f, bin) in output.iter().enumerate() {
            spec[[f, t]] = bin.norm_sqr();
        }
    }
    Ok(spec)
}

/// Converts power to decibels in place, clamped to `top_db` below the maximum.
pub fn power_to_db(spec: &mut Array2<f32>, top_db: f32) {
    spec.mapv_inplace(|p| 10.0 * p.max(AMIN).log10());
    let max_db = spec.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max_db.is_finite() {
        let floor = max_db - top_db;
        spec.mapv_inplace(|db| db.max(floor));
    }
}

/// Spectral-flux novelty curve: per frame, the mean positive rise in log power
/// across frequency bins relative to the previous frame. Frame 0 is zero.
pub fn onset_strength(samples: &[f32], config: &SpectralConfig) -> Result<Vec<f32>, AudioError> {
    let mut spec = power_spectrogram(samples, config)?;
    let (n_freq, n_frames) = spec.dim();
    if n_frames == 0 {
        return Ok(Vec::new());
    }
    power_to_db(&mut spec, config.top_db);

    let mut envelope = vec![0.0f32; n_frames];
    for t in 1..n_frames {
        let current = spec.column(t);
        let previous = spec.column(t - 1);
        let rise: f32 = current
            .iter()
            .zip(previous.iter())
            .map(|(c, p)| (c - p).max(0.0))
            .sum();
        envelope[t] = rise / n_freq as f32;
    }
    Ok(envelope)
}

/// Converts frame indices to seconds.
pub fn frames_to_time(frames: &[usize], sample_rate: u32, hop_length: usize) -> Vec<f64> {
    frames
        .iter()
        .map(|&frame| (frame * hop_length) as f64 / sample_rate as f64)
        .collect()
}
