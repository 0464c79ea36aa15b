//! Errors - エラー型と分類
//!
//! - `TransportError`: ネットワーク失敗・非 2xx・期限切れ/不正な宛先。リトライしない。
//! - `ContractViolation`: 呼び出し側のプログラミングエラー。通信前に失敗する。
//! - `UploadError`: 呼び出し側に返す集約エラー

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("destination refused upload with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upload target expired at {expired_at}")]
    ExpiredTarget { expired_at: DateTime<Utc> },

    #[error("invalid upload target: {0}")]
    InvalidTarget(String),

    /// The upload task panicked or was aborted before it settled.
    #[error("upload interrupted: {0}")]
    Interrupted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("{files} file(s) but {targets} upload target(s); every file needs exactly one target")]
    LengthMismatch { files: usize, targets: usize },

    #[error("cannot read file {path}: {reason}")]
    UnreadableFile { path: String, reason: String },

    #[error("file {file} is {size} bytes, limit is {limit}")]
    FileTooLarge { file: String, size: u64, limit: u64 },

    #[error("file {file} has content type {content_type} which is not accepted")]
    ContentTypeNotAccepted { file: String, content_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    #[error("upload of {file} failed: {source}")]
    Transport {
        file: String,
        #[source]
        source: TransportError,
    },
}

impl UploadError {
    pub fn transport(file: impl Into<String>, source: TransportError) -> Self {
        Self::Transport {
            file: file.into(),
            source,
        }
    }

    /// Name of the failing file, if the failure belongs to one.
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Transport { file, .. } => Some(file),
            Self::Contract(ContractViolation::FileTooLarge { file, .. })
            | Self::Contract(ContractViolation::ContentTypeNotAccepted { file, .. }) => Some(file),
            Self::Contract(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_names_the_file() {
        let err = UploadError::transport(
            "b.png",
            TransportError::Status {
                status: 403,
                body: "Request has expired".to_string(),
            },
        );
        assert_eq!(err.file(), Some("b.png"));
        let msg = err.to_string();
        assert!(msg.contains("b.png"));
        assert!(msg.contains("403"));
    }

    #[test]
    fn length_mismatch_has_no_file() {
        let err: UploadError = ContractViolation::LengthMismatch { files: 3, targets: 2 }.into();
        assert_eq!(err.file(), None);
        assert!(err.to_string().contains("3 file(s) but 2"));
    }
}
