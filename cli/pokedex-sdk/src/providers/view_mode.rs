//! The view mode is the only state kept across sessions.
//!
//! It lives under [`VIEW_MODE_KEY`] in a small JSON document
//! ([`VIEW_MODE_FILE`]) in the data directory. Other keys in that document
//! are preserved on write.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::session::ViewMode;

pub const VIEW_MODE_KEY: &str = "pokedex-view-mode";
pub const VIEW_MODE_FILE: &str = "preferences.json";

#[derive(Debug, Error)]
pub enum ViewModeStoreError {
    #[error("failed to read preferences")]
    Read(#[source] std::io::Error),
    #[error("failed to parse preferences")]
    Deserialize(#[source] serde_json::Error),
    #[error("preferences are not a JSON object")]
    NotAnObject,
    #[error("stored view mode is not a string")]
    InvalidValue,
    #[error("failed to write preferences")]
    Write(#[source] std::io::Error),
    #[error("failed to serialize preferences")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ViewModeStore {
    path: PathBuf,
}

impl ViewModeStore {
    /// A store backed by [`VIEW_MODE_FILE`] in `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(VIEW_MODE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored view mode, or [None] if none was stored yet.
    ///
    /// A stored value that is not a known mode reads as [None].
    pub fn try_load(&self) -> Result<Option<ViewMode>, ViewModeStoreError> {
        let Some(document) = self.read_document()? else {
            return Ok(None);
        };
        let Some(value) = document.get(VIEW_MODE_KEY) else {
            return Ok(None);
        };
        let value = value.as_str().ok_or(ViewModeStoreError::InvalidValue)?;
        match value.parse() {
            Ok(mode) => Ok(Some(mode)),
            Err(err) => {
                debug!(%err, "ignoring stored view mode");
                Ok(None)
            },
        }
    }

    /// The stored view mode, falling back to [ViewMode::Grid].
    pub fn load(&self) -> ViewMode {
        match self.try_load() {
            Ok(mode) => mode.unwrap_or_default(),
            Err(err) => {
                warn!(path = ?self.path, %err, "failed to read view mode, using default");
                ViewMode::default()
            },
        }
    }

    /// Store `mode`, replacing the file atomically.
    pub fn save(&self, mode: ViewMode) -> Result<(), ViewModeStoreError> {
        // A corrupt document is replaced rather than blocking every write
        let mut document = self.read_document().ok().flatten().unwrap_or_default();
        document.insert(VIEW_MODE_KEY.to_string(), Value::String(mode.to_string()));

        let dir = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(ViewModeStoreError::Write)?;

        let contents =
            serde_json::to_vec_pretty(&document).map_err(ViewModeStoreError::Serialize)?;
        let mut file = NamedTempFile::new_in(dir).map_err(ViewModeStoreError::Write)?;
        file.write_all(&contents)
            .map_err(ViewModeStoreError::Write)?;
        file.persist(&self.path)
            .map_err(|err| ViewModeStoreError::Write(err.error))?;

        debug!(path = ?self.path, %mode, "wrote view mode");
        Ok(())
    }

    /// Store `mode`, logging failures instead of returning them.
    pub fn persist(&self, mode: ViewMode) {
        if let Err(err) = self.save(mode) {
            warn!(path = ?self.path, %err, "failed to save view mode");
        }
    }

    fn read_document(&self) -> Result<Option<Map<String, Value>>, ViewModeStoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(ViewModeStoreError::Read)?;
        match serde_json::from_str(&contents).map_err(ViewModeStoreError::Deserialize)? {
            Value::Object(document) => Ok(Some(document)),
            _ => Err(ViewModeStoreError::NotAnObject),
        }
    }
}
