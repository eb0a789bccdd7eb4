use serde::{Deserialize, Serialize};

use crate::{error::DomainError, events::DrumPattern};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Midi,
    Json,
}

pub trait PatternExporter {
    fn export(&self, pattern: &DrumPattern, format: ExportFormat) -> Result<Vec<u8>, DomainError>;
}

pub struct JsonExporter;

impl PatternExporter for JsonExporter {
    fn export(&self, pattern: &DrumPattern, format: ExportFormat) -> Result<Vec<u8>, DomainError> {
        match format {
            ExportFormat::Json => serde_json::to_vec_pretty(pattern)
                .map_err(|err| DomainError::Serialization(err.to_string())),
            other => Err(DomainError::validation(format!(
                "JsonExporter cannot handle {:?}",
                other
            ))),
        }
    }
}
