use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{request::GenerateRequest, DomainError};

pub const HISTORY_CAPACITY: usize = 50;
pub const RECENT_LIMIT: usize = 20;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryItem {
    pub id: String,
    pub params: GenerateRequest,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Generated beats, newest first. Owned by whoever drives the workflow.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct BeatHistory {
    items: Vec<HistoryItem>,
}

impl BeatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a history file; a missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self, DomainError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = fs::read_to_string(path)?;
        let mut history: Self = serde_json::from_str(&text)?;
        history.items.truncate(HISTORY_CAPACITY);
        Ok(history)
    }

    pub fn save(&self, path: &Path) -> Result<(), DomainError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn record(&mut self, item: HistoryItem) {
        self.items.insert(0, item);
        self.items.truncate(HISTORY_CAPACITY);
    }

    pub fn recent(&self) -> &[HistoryItem] {
        &self.items[..self.items.len().min(RECENT_LIMIT)]
    }

    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Genre, Instrument, Mood};

    fn item(id: &str) -> HistoryItem {
        HistoryItem {
            id: id.to_string(),
            params: GenerateRequest::new(Genre::House, Mood::Chill, vec![Instrument::Drums]),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn newest_first_and_capped() {
        let mut history = BeatHistory::new();
        for i in 0..(HISTORY_CAPACITY + 5) {
            history.record(item(&format!("beat{i}")));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.recent().len(), RECENT_LIMIT);
        assert_eq!(history.recent()[0].id, format!("beat{}", HISTORY_CAPACITY + 4));
        assert!(history.get("beat0").is_none());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        assert!(BeatHistory::load(&path).unwrap().is_empty());

        let mut history = BeatHistory::new();
        history.record(item("abc123"));
        history.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"created_at\": \"1970-01-01T00:00:00Z\""));
        let loaded = BeatHistory::load(&path).unwrap();
        assert_eq!(loaded, history);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            BeatHistory::load(&path),
            Err(DomainError::Serialization(_))
        ));
    }
}
