use std::path::PathBuf;

use crescent_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("ELEVENLABS_API_KEY is not set")]
    MissingApiKey,
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] DomainError),
    #[error("music api error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unknown beat id {0:?}")]
    UnknownBeat(String),
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ServiceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
