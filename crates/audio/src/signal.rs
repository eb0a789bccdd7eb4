//! Synthetic test signals.

/// Decay constant of a click, in seconds.
const CLICK_DECAY_SECS: f32 = 0.002;
const CLICK_LEVEL: f32 = 0.8;

/// `len` samples of silence with an exponentially decaying click every
/// `interval` samples, starting at sample 0.
pub fn click_track(sample_rate: u32, interval: usize, len: usize) -> Vec<f32> {
    let mut signal = vec![0.0f32; len];
    if interval == 0 {
        return signal;
    }
    let tau = (CLICK_DECAY_SECS * sample_rate as f32).max(1.0);
    let click_len = (tau * 8.0) as usize;
    for start in (0..len).step_by(interval) {
        for (offset, sample) in signal[start..].iter_mut().take(click_len).enumerate() {
            *sample += CLICK_LEVEL * (-(offset as f32) / tau).exp();
        }
    }
    signal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clicks_start_on_interval() {
        let signal = click_track(8_000, 1_000, 3_500);
        assert_eq!(signal.len(), 3_500);
        for start in [0, 1_000, 2_000, 3_000] {
            assert_eq!(signal[start], CLICK_LEVEL);
        }
        assert_eq!(signal[500], 0.0);
        assert!(signal.iter().all(|s| *s <= CLICK_LEVEL));
    }
}
