use std::path::Path;

use crate::dsp::{normalize_peak, PeakLevel};
use crate::error::AudioError;
use crate::io::{AudioDecoder, AudioReader};

/// Mono samples at a known, positive sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    sample_rate: u32,
    samples: Vec<f32>,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate);
        }
        Ok(Self {
            sample_rate,
            samples,
        })
    }

    pub fn from_reader(audio: &AudioReader) -> Result<Self, AudioError> {
        Self::new(audio.downmix(), audio.sample_rate)
    }

    /// Decodes a file at its native sample rate and folds it down to mono.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AudioError> {
        let audio = AudioDecoder::open(path)?;
        Self::from_reader(&audio)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn normalize(&mut self) -> PeakLevel {
        normalize_peak(&mut self.samples)
    }
}
