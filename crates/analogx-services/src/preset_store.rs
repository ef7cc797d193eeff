//! Preset persistence on disk

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use analogx_core::{DecodeError, EncodeError, PresetDocument};
use thiserror::Error;
use tracing::{debug, info};

/// Preset restored at launch and written when the synth goes away
pub const LAST_PRESET_FILE: &str = "last-preset.json";
/// Target of the share/export action
pub const EXPORT_FILE: &str = "asx-preset-export.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Preset I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Preset at {path} is not valid: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("Preset could not be encoded: {0}")]
    Encode(#[from] EncodeError),
}

/// Directory of named preset documents
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// `Ok(None)` when no file of that name exists
    pub fn load(&self, name: &str) -> Result<Option<PresetDocument>, StoreError> {
        let path = self.path(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No preset file");
                return Ok(None);
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        PresetDocument::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Decode { path, source })
    }

    /// Write atomically: encode, write a sibling temp file, rename over
    pub fn save(&self, name: &str, preset: &PresetDocument) -> Result<PathBuf, StoreError> {
        let text = preset.to_json()?;
        self.write_text(name, &text)
    }

    pub fn load_last(&self) -> Result<Option<PresetDocument>, StoreError> {
        self.load(LAST_PRESET_FILE)
    }

    pub fn save_last(&self, preset: &PresetDocument) -> Result<PathBuf, StoreError> {
        self.save(LAST_PRESET_FILE, preset)
    }

    /// Write the export file and hand back its path with the JSON text,
    /// so callers can share either one
    pub fn export(&self, preset: &PresetDocument) -> Result<(PathBuf, String), StoreError> {
        let text = preset.to_json()?;
        let path = self.write_text(EXPORT_FILE, &text)?;
        info!(path = %path.display(), "Preset exported");
        Ok((path, text))
    }

    fn write_text(&self, name: &str, text: &str) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path(name);
        let tmp = self.dir.join(format!(".{name}.tmp"));
        fs::write(&tmp, text).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = text.len(), "Preset written");
        Ok(path)
    }
}
