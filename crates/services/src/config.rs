use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const API_KEY_VAR: &str = "ELEVENLABS_API_KEY";
pub const OUTPUT_DIR_VAR: &str = "CRESCENT_OUTPUT_DIR";
pub const API_URL_VAR: &str = "CRESCENT_API_URL";

pub const DEFAULT_API_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_url: String,
    pub output_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl ServiceConfig {
    /// Reads the API key, API base URL and output directory from the
    /// environment; blank values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_key: read(API_KEY_VAR),
            api_url: read(API_URL_VAR)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            output_dir: read(OUTPUT_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn history_path(&self) -> PathBuf {
        self.output_dir.join("history.json")
    }
}
