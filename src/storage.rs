//! The single on-disk slot holding the most recently downloaded asset

use crate::error::{PipelineError, Result};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AssetSlot {
    path: PathBuf,
}

impl AssetSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Remove the current occupant. A missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_error(e)),
        }
    }

    /// Open the slot for writing, truncating any previous content.
    /// Failure here means storage itself is unusable.
    pub fn create(&self) -> Result<File> {
        File::create(&self.path).map_err(|source| PipelineError::SlotUnavailable {
            path: self.path.clone(),
            source,
        })
    }

    pub fn open(&self) -> Result<File> {
        File::open(&self.path).map_err(|e| self.storage_error(e))
    }

    pub fn storage_error(&self, source: std::io::Error) -> PipelineError {
        PipelineError::Storage {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn clear_ignores_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let slot = AssetSlot::new(temp_dir.path().join("current.png"));
        assert!(!slot.exists());
        assert!(slot.clear().is_ok());
    }

    #[test]
    fn create_then_clear_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let slot = AssetSlot::new(temp_dir.path().join("current.png"));
        slot.create().unwrap().write_all(b"abc").unwrap();
        assert!(slot.exists());
        slot.clear().unwrap();
        assert!(!slot.exists());
    }

    #[test]
    fn create_in_missing_directory_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let slot = AssetSlot::new(temp_dir.path().join("missing").join("current.png"));
        let err = slot.create().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn open_missing_file_is_recoverable() {
        let temp_dir = TempDir::new().unwrap();
        let slot = AssetSlot::new(temp_dir.path().join("current.png"));
        let err = slot.open().unwrap_err();
        assert!(!err.is_fatal());
    }
}
