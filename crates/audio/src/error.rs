use std::path::PathBuf;

use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decode error: {0}")]
    Decode(#[from] SymphoniaError),
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),
    #[error("fft error: {0}")]
    Fft(String),
    #[error("no audio track found")]
    NoAudioTrack,
    #[error("cannot rewrite {0:?}: only wav files can be rewritten in place")]
    UnsupportedFormat(PathBuf),
    #[error("sample rate must be positive")]
    InvalidSampleRate,
    #[error("invalid analysis parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}

impl AudioError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
