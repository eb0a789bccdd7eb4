pub mod beat;
pub mod error;
pub mod events;
pub mod history;
pub mod io;
pub mod presets;
pub mod request;
pub mod tempo;

pub use crate::beat::BeatEstimate;
pub use crate::error::DomainError;
pub use crate::events::{DrumEvent, DrumPattern, DrumVoice, PulseAccent};
pub use crate::history::{BeatHistory, HistoryItem};
pub use crate::io::{ExportFormat, JsonExporter, PatternExporter};
pub use crate::presets::Presets;
pub use crate::request::{GenerateRequest, Genre, Instrument, Mood, MusicalKey};
pub use crate::tempo::Tempo;
