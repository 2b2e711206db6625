//! JSON file store with atomic replace

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use super::StateStore;
use crate::{
    error::{Result, TomatoError},
    state::TimerState,
};

/// Keeps the record in a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<TimerState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state record at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(TomatoError::Io {
                    context: format!("Failed to read {}", self.path.display()),
                    source: e,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| TomatoError::CorruptRecord {
                path: self.path.clone(),
                source: e,
            })
    }

    fn save(&self, state: &TimerState) -> Result<()> {
        let content = serde_json::to_string_pretty(state)?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| TomatoError::Io {
            context: format!("Failed to create {}", dir.display()),
            source: e,
        })?;

        // Temp file in the same directory so the rename stays atomic
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| TomatoError::Io {
            context: "Failed to create temp file".to_string(),
            source: e,
        })?;

        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.flush())
            .map_err(|e| TomatoError::Io {
                context: "Failed to write temp file".to_string(),
                source: e,
            })?;

        tmp.persist(&self.path).map_err(|e| TomatoError::Io {
            context: format!("Failed to persist {}", self.path.display()),
            source: e.error,
        })?;

        debug!("State record written to {}", self.path.display());
        Ok(())
    }
}
