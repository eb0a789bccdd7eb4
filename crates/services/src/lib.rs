pub mod artifacts;
pub mod client;
pub mod config;
pub mod error;
pub mod workflow;

pub use artifacts::ArtifactStore;
pub use client::{ElevenLabsClient, GeneratedAudio, MusicGenerator, SoundEffect};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use workflow::{audio_url, midi_url, BeatResponse, BeatWorkflow};
