pub mod beats;
pub mod detector;
pub mod error;
pub mod midi;
pub mod onset;
pub mod pipeline;
pub mod tempo;
pub mod templates;

pub use detector::{BeatDetector, DetectorConfig};
pub use error::{ConversionError, Stage};
pub use midi::{decode_pattern, DrumEncoder, EncoderConfig};
pub use pipeline::{audio_to_midi, Normalization, TranscriptionJob, TranscriptionPipeline, TranscriptionReport};
pub use templates::{write_genre_midi, GrooveTemplate};
