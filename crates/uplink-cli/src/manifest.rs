//! Upload manifest: which local file goes to which pre-signed URL.
//!
//! ```toml
//! [[upload]]
//! path = "photos/a.png"
//! url = "https://bucket.s3.amazonaws.com/a.png?X-Amz-Signature=..."
//! expires_at = "2024-01-01T12:15:00Z"
//!
//! [[upload]]
//! path = "docs/b.pdf"
//! content_type = "application/pdf"
//! url = "https://bucket.s3.amazonaws.com/b.pdf?X-Amz-Signature=..."
//! headers = { "x-amz-acl" = "private" }
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use uplink_core::{UploadTarget, UploadableFile};

#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(rename = "upload", default)]
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(flatten)]
    pub target: UploadTarget,
}

impl Manifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let mut manifest: Manifest =
            toml::from_str(&raw).with_context(|| format!("parsing manifest {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for entry in &mut manifest.entries {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
        Ok(manifest)
    }

    /// Reads every file. Stops at the first unreadable one.
    pub async fn load_files(self) -> anyhow::Result<(Vec<UploadableFile>, Vec<UploadTarget>)> {
        let mut files = Vec::with_capacity(self.entries.len());
        let mut targets = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            files.push(UploadableFile::from_path(&entry.path, entry.content_type).await?);
            targets.push(entry.target);
        }
        Ok((files, targets))
    }
}
