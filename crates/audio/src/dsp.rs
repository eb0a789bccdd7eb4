use std::path::Path;

use tracing::debug;

use crate::error::AudioError;
use crate::io::{read_wav, replace_wav};

/// Peak amplitude after normalization, as a fraction of full scale.
pub const TARGET_PEAK: f32 = 0.95;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakLevel {
    /// Largest absolute sample before scaling.
    pub peak: f32,
    /// Factor every sample was multiplied by.
    pub gain: f32,
}

impl PeakLevel {
    pub fn silence() -> Self {
        Self {
            peak: 0.0,
            gain: 1.0,
        }
    }
}

pub fn peak_amplitude(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
}

/// Scales `buffer` so its peak sits at [`TARGET_PEAK`]; silence is left untouched.
pub fn normalize_peak(buffer: &mut [f32]) -> PeakLevel {
    let peak = peak_amplitude(buffer);
    if peak <= 0.0 || !peak.is_finite() {
        return PeakLevel {
            peak,
            ..PeakLevel::silence()
        };
    }
    let gain = TARGET_PEAK / peak;
    for sample in buffer.iter_mut() {
        *sample *= gain;
    }
    PeakLevel { peak, gain }
}

/// Peak-normalizes a WAV file in place, keeping its channel count and sample format.
pub fn normalize_file(path: &Path) -> Result<PeakLevel, AudioError> {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if !is_wav {
        return Err(AudioError::UnsupportedFormat(path.to_path_buf()));
    }
    let (mut audio, spec) = read_wav(path)?;
    let level = normalize_peak(&mut audio.samples);
    replace_wav(path, &audio, spec)?;
    debug!(path = %path.display(), peak = level.peak, gain = level.gain, "normalized audio file");
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{pcm16_spec, write_wav, AudioReader};
    use approx::assert_relative_eq;

    #[test]
    fn normalize_scales_to_target_peak() {
        let mut buffer = vec![0.5, -2.0, 0.75];
        let level = normalize_peak(&mut buffer);
        assert_relative_eq!(level.peak, 2.0);
        assert_relative_eq!(peak_amplitude(&buffer), TARGET_PEAK, epsilon = 1e-6);
        assert_relative_eq!(buffer[0], 0.2375, epsilon = 1e-6);
        assert!(buffer[1] < 0.0 && buffer[0] > 0.0);
    }

    #[test]
    fn silence_is_untouched() {
        let mut buffer = vec![0.0; 16];
        let level = normalize_peak(&mut buffer);
        assert_eq!(level, PeakLevel::silence());
        assert!(buffer.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut buffer = vec![0.1, -0.3, 0.2];
        normalize_peak(&mut buffer);
        let once = buffer.clone();
        let level = normalize_peak(&mut buffer);
        assert_relative_eq!(level.gain, 1.0, epsilon = 1e-6);
        for (a, b) in once.iter().zip(&buffer) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn file_is_rewritten_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiet.wav");
        let audio = AudioReader {
            sample_rate: 8_000,
            channels: 2,
            samples: vec![0.1, -0.2, 0.05, 0.0],
        };
        write_wav(&path, &audio, pcm16_spec(8_000, 2)).unwrap();

        let level = normalize_file(&path).unwrap();
        assert_relative_eq!(level.peak, 0.2, epsilon = 1e-3);

        let (loud, spec) = read_wav(&path).unwrap();
        assert_eq!(spec, pcm16_spec(8_000, 2));
        assert_eq!(loud.frames(), 2);
        assert_relative_eq!(peak_amplitude(&loud.samples), TARGET_PEAK, epsilon = 1e-3);
    }

    #[test]
    fn non_wav_is_unsupported() {
        let result = normalize_file(Path::new("beat.mp3"));
        assert!(matches!(result, Err(AudioError::UnsupportedFormat(_))));
    }
}
