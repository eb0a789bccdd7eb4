use std::fmt;
use std::path::PathBuf;

use crescent_audio::AudioError;
use crescent_domain::DomainError;
use thiserror::Error;

/// Step of the audio-to-MIDI conversion that produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Decode,
    Detect,
    Encode,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::Decode => "decode",
            Stage::Detect => "detect",
            Stage::Encode => "encode",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("normalize stage failed for {path:?}: {source}")]
    Normalize {
        path: PathBuf,
        #[source]
        source: AudioError,
    },
    #[error("decode stage failed for {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: AudioError,
    },
    #[error("detect stage failed: {0}")]
    Detect(#[source] AudioError),
    #[error("detector produced an invalid estimate: {0}")]
    Estimate(#[source] DomainError),
    #[error("invalid target tempo: {0}")]
    Tempo(#[source] DomainError),
    #[error("encode stage failed: {0}")]
    Encode(String),
    #[error("cannot read midi data: {0}")]
    Parse(String),
    #[error("write stage failed for {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    pub fn stage(&self) -> Stage {
        match self {
            ConversionError::Normalize { .. } => Stage::Normalize,
            ConversionError::Decode { .. } => Stage::Decode,
            ConversionError::Detect(_) | ConversionError::Estimate(_) => Stage::Detect,
            ConversionError::Tempo(_) | ConversionError::Encode(_) | ConversionError::Parse(_) => {
                Stage::Encode
            }
            ConversionError::Write { .. } => Stage::Write,
        }
    }
}
