//! UploadableFile - アップロード対象のファイル
//!
//! 名前・サイズ・Content-Type を持つ不変のバイト列。
//! `Bytes` は参照カウントなので、並行アップロードに渡してもコピーは発生しません。

use bytes::Bytes;
use std::path::Path;

use crate::domain::errors::ContractViolation;

pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadableFile {
    pub name: String,
    pub content_type: String,
    pub body: Bytes,
}

impl UploadableFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// Reads a file from disk.
    ///
    /// Without an explicit `content_type` the type is sniffed from the magic
    /// bytes, falling back to `application/octet-stream`. An unreadable path
    /// is a caller contract violation, not a transport failure.
    pub async fn from_path(
        path: impl AsRef<Path>,
        content_type: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let path = path.as_ref();
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| ContractViolation::UnreadableFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let content_type = content_type.unwrap_or_else(|| sniff_content_type(&body).to_string());

        Ok(Self::new(name, content_type, body))
    }

    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }
}

/// Best-effort content type from magic bytes.
pub fn sniff_content_type(body: &[u8]) -> &'static str {
    infer::get(body)
        .map(|kind| kind.mime_type())
        .unwrap_or(OCTET_STREAM)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn size_is_body_length() {
        let file = UploadableFile::new("a.png", "image/png", vec![0u8; 1024]);
        assert_eq!(file.size(), 1024);
    }

    #[test]
    fn sniffs_png() {
        assert_eq!(sniff_content_type(&PNG_MAGIC), "image/png");
        assert_eq!(sniff_content_type(b"plain words"), OCTET_STREAM);
    }

    #[tokio::test]
    async fn from_path_missing_file_is_contract_violation() {
        let err = UploadableFile::from_path("/definitely/not/here.bin", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ContractViolation::UnreadableFile { .. }));
    }

    #[tokio::test]
    async fn from_path_reads_name_and_sniffs_type() {
        let path = std::env::temp_dir().join(format!("uplink-{}.png", ulid::Ulid::new()));
        tokio::fs::write(&path, PNG_MAGIC).await.unwrap();

        let file = UploadableFile::from_path(&path, None).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(file.name.ends_with(".png"));
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.size(), 8);
    }

    #[tokio::test]
    async fn from_path_keeps_explicit_content_type() {
        let path = std::env::temp_dir().join(format!("uplink-{}.txt", ulid::Ulid::new()));
        tokio::fs::write(&path, b"hello").await.unwrap();

        let file = UploadableFile::from_path(&path, Some("text/plain".to_string()))
            .await
            .unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(file.content_type, "text/plain");
    }
}
