//! Error types for the acquisition and rendering pipeline.

use crate::types::FailureClass;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Listing response was empty")]
    EmptyResponse,

    #[error("Failed to parse listing: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Listing contains no candidate images")]
    EmptyDirectory,

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Storage error at {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The asset slot cannot be opened for writing. Not recoverable.
    #[error("Asset slot unavailable at {path:?}: {source}")]
    SlotUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decode failed: {0}")]
    Decode(String),
}

impl PipelineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::SlotUnavailable { .. })
    }

    pub fn class(&self) -> FailureClass {
        match self {
            PipelineError::Network(_) => FailureClass::Network,
            PipelineError::EmptyResponse => FailureClass::EmptyResponse,
            PipelineError::Parse(_) => FailureClass::Parse,
            PipelineError::EmptyDirectory => FailureClass::EmptyDirectory,
            PipelineError::Download(_) => FailureClass::Download,
            PipelineError::Storage { .. } | PipelineError::SlotUnavailable { .. } => {
                FailureClass::Storage
            }
            PipelineError::Decode(_) => FailureClass::Decode,
        }
    }
}

impl From<png::DecodingError> for PipelineError {
    fn from(e: png::DecodingError) -> Self {
        PipelineError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_slot_open_failure_is_fatal() {
        let io = || std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let fatal = PipelineError::SlotUnavailable {
            path: PathBuf::from("/slot.png"),
            source: io(),
        };
        let storage = PipelineError::Storage {
            path: PathBuf::from("/slot.png"),
            source: io(),
        };
        assert!(fatal.is_fatal());
        assert!(!storage.is_fatal());
        assert!(!PipelineError::EmptyDirectory.is_fatal());
        assert_eq!(storage.class(), FailureClass::Storage);
    }

    #[test]
    fn parse_errors_convert_from_serde() {
        let err: PipelineError = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
        assert_eq!(err.class(), FailureClass::Parse);
    }
}
