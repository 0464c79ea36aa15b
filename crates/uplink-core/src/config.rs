//! UploadConfig - TOML から読むアップロード設定
//!
//! ```toml
//! chunk_size = 65536
//! request_timeout_secs = 300
//! sibling_policy = "detach"
//!
//! [limits]
//! max_file_size = 10485760
//! accepted_types = ["image/*", "application/pdf"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::{ContractViolation, UploadableFile};

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// What happens to in-flight siblings once `upload_batch` has seen a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingPolicy {
    /// Siblings keep running to completion; nobody awaits them.
    #[default]
    Detach,
    /// Siblings are aborted.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Body chunk size handed to the transport; progress granularity.
    pub chunk_size: usize,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub sibling_policy: SiblingPolicy,
    pub limits: UploadLimits,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout_secs: None,
            connect_timeout_secs: None,
            sibling_policy: SiblingPolicy::default(),
            limits: UploadLimits::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl UploadConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: UploadConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be greater than 0".into()));
        }
        if self.request_timeout_secs == Some(0) || self.connect_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("timeouts must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn with_sibling_policy(mut self, policy: SiblingPolicy) -> Self {
        self.sibling_policy = policy;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Per-file acceptance rules, checked before anything is sent.
///
/// Both rules are off by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadLimits {
    pub max_file_size: Option<u64>,
    /// `type/subtype`, `type/*` or `*/*`. Empty accepts everything.
    pub accepted_types: Vec<String>,
}

impl UploadLimits {
    pub fn check(&self, file: &UploadableFile) -> Result<(), ContractViolation> {
        if let Some(limit) = self.max_file_size
            && file.size() > limit
        {
            return Err(ContractViolation::FileTooLarge {
                file: file.name.clone(),
                size: file.size(),
                limit,
            });
        }

        if !self.accepts(&file.content_type) {
            return Err(ContractViolation::ContentTypeNotAccepted {
                file: file.name.clone(),
                content_type: file.content_type.clone(),
            });
        }
        Ok(())
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        if self.accepted_types.is_empty() {
            return true;
        }
        // パラメータ（"; charset=utf-8" など）は比較しない
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let major = essence.split('/').next().unwrap_or_default();

        self.accepted_types.iter().any(|pattern| {
            let pattern = pattern.trim().to_ascii_lowercase();
            match pattern.strip_suffix("/*") {
                Some("*") => true,
                Some(pattern_major) => pattern_major == major,
                None => pattern == essence,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = UploadConfig::from_toml_str("").unwrap();
        assert_eq!(config, UploadConfig::default());
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.sibling_policy, SiblingPolicy::Detach);
    }

    #[test]
    fn parses_full_config() {
        let config = UploadConfig::from_toml_str(
            r#"
            chunk_size = 1024
            request_timeout_secs = 30
            sibling_policy = "abort"

            [limits]
            max_file_size = 2048
            accepted_types = ["image/*"]
            "#,
        )
        .unwrap();

        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout(), None);
        assert_eq!(config.sibling_policy, SiblingPolicy::Abort);
        assert_eq!(config.limits.max_file_size, Some(2048));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = UploadConfig::from_toml_str("chunk_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        let err = UploadConfig::from_toml_str(r#"sibling_policy = "cancel""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = UploadConfig::load("/no/such/uplink.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[rstest]
    #[case::anything(&[], "application/zip", true)]
    #[case::exact(&["image/png"], "image/png", true)]
    #[case::exact_miss(&["image/png"], "image/jpeg", false)]
    #[case::wildcard(&["image/*"], "image/jpeg", true)]
    #[case::wildcard_miss(&["image/*"], "video/mp4", false)]
    #[case::any(&["*/*"], "video/mp4", true)]
    #[case::case_and_params(&["text/plain"], "Text/Plain; charset=utf-8", true)]
    fn accepted_types(#[case] accepted: &[&str], #[case] content_type: &str, #[case] expected: bool) {
        let limits = UploadLimits {
            max_file_size: None,
            accepted_types: accepted.iter().map(|s| s.to_string()).collect(),
        };
        assert_eq!(limits.accepts(content_type), expected);
    }

    #[test]
    fn size_limit_is_inclusive() {
        let limits = UploadLimits {
            max_file_size: Some(4),
            accepted_types: vec![],
        };
        assert!(limits.check(&UploadableFile::new("ok.bin", "application/octet-stream", vec![0u8; 4])).is_ok());

        let err = limits
            .check(&UploadableFile::new("big.bin", "application/octet-stream", vec![0u8; 5]))
            .unwrap_err();
        assert_eq!(
            err,
            ContractViolation::FileTooLarge {
                file: "big.bin".to_string(),
                size: 5,
                limit: 4,
            }
        );
    }
}
