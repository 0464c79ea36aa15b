//! UploadTarget - 事前署名済みのアップロード先
//!
//! 外部の認可サービスが発行した、1 ファイル分の書き込み権限。
//! URL 以外に ID は持たず、1 回限り使用されます。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pre-signed destination for exactly one file.
///
/// `expires_at` and `headers` are optional metadata from the issuer. When the
/// expiry is known, the coordinator refuses an expired target without
/// touching the network; otherwise the destination decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Extra headers the issuer signed into the URL (e.g. `x-amz-acl`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl UploadTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expires_at: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Unknown expiry never counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
