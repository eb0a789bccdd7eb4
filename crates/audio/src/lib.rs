pub mod dsp;
pub mod error;
pub mod io;
pub mod signal;
pub mod spectral;
pub mod waveform;

pub use dsp::{normalize_file, normalize_peak, PeakLevel, TARGET_PEAK};
pub use error::AudioError;
pub use io::{AudioDecoder, AudioReader};
pub use spectral::SpectralConfig;
pub use waveform::Waveform;
