//! Batch report: per-file outcome of a settled batch.
//!
//! Each entry carries the same information an upload widget shows per file:
//! progress, status and the error text. Entries keep the input order so a
//! caller can re-run just the failed indices.

use serde::{Deserialize, Serialize};

use super::errors::UploadError;
use super::ids::BatchId;
use super::state::FileState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub index: usize,
    pub file_name: String,
    pub state: FileState,
    pub percent: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The typed error, kept for callers; not serialized.
    #[serde(skip)]
    pub failure: Option<UploadError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.files.iter().all(|f| f.state == FileState::Complete)
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.files
            .iter()
            .filter(|f| f.state == FileState::Failed)
            .map(|f| f.index)
            .collect()
    }

    /// Error of the lowest-index failed file.
    pub fn first_error(&self) -> Option<&UploadError> {
        self.files.iter().find_map(|f| f.failure.as_ref())
    }

    /// `Ok(())` when every file completed, else the lowest-index failure.
    pub fn into_result(self) -> Result<(), UploadError> {
        match self.files.into_iter().find_map(|f| f.failure) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
