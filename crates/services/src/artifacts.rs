use std::fs;
use std::path::PathBuf;

use uuid::Uuid;

use crate::error::ServiceError;

const ID_LEN: usize = 12;
const SFX_PREFIX: &str = "sfx_";
const SFX_ID_LEN: usize = 8;
/// Audio extensions looked up for an existing beat, in order of preference.
const AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Files produced for each beat, keyed by beat id under one output directory.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn ensure_root(&self) -> Result<(), ServiceError> {
        fs::create_dir_all(&self.root).map_err(|err| ServiceError::io(&self.root, err))
    }

    pub fn new_id() -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(ID_LEN);
        id
    }

    /// Sound effects share the output directory under a prefixed id.
    pub fn new_sfx_id() -> String {
        let mut hex = Uuid::new_v4().simple().to_string();
        hex.truncate(SFX_ID_LEN);
        format!("{SFX_PREFIX}{hex}")
    }

    pub fn audio_path(&self, id: &str, extension: &str) -> Result<PathBuf, ServiceError> {
        check_id(id)?;
        Ok(self.root.join(format!("{id}.{extension}")))
    }

    pub fn midi_path(&self, id: &str) -> Result<PathBuf, ServiceError> {
        check_id(id)?;
        Ok(self.root.join(format!("{id}.mid")))
    }

    pub fn write_audio(&self, id: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf, ServiceError> {
        self.ensure_root()?;
        let path = self.audio_path(id, extension)?;
        fs::write(&path, bytes).map_err(|err| ServiceError::io(&path, err))?;
        Ok(path)
    }

    pub fn find_audio(&self, id: &str) -> Result<PathBuf, ServiceError> {
        for extension in AUDIO_EXTENSIONS {
            let path = self.audio_path(id, extension)?;
            if path.is_file() {
                return Ok(path);
            }
        }
        Err(ServiceError::UnknownBeat(id.to_string()))
    }

    pub fn find_midi(&self, id: &str) -> Result<PathBuf, ServiceError> {
        let path = self.midi_path(id)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(ServiceError::UnknownBeat(id.to_string()))
        }
    }
}

fn check_id(id: &str) -> Result<(), ServiceError> {
    let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::UnknownBeat(id.to_string()))
    }
}
