//! UploadTransport port - 1 回の PUT を実行する
//!
//! # 契約
//! - 呼び出し 1 回につきリクエスト 1 回（リトライしない）
//! - body はファイル全体、Content-Type はファイルの宣言値
//! - 2xx のみ成功、それ以外は TransportError
//! - 送信したバイト数を `ProgressTracker::advance` で報告する

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{ProgressTracker, TransportError, UploadTarget, UploadableFile};

#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn put(
        &self,
        target: &UploadTarget,
        file: &UploadableFile,
        progress: Arc<ProgressTracker>,
    ) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: UploadTransport + ?Sized> UploadTransport for Arc<T> {
    async fn put(
        &self,
        target: &UploadTarget,
        file: &UploadableFile,
        progress: Arc<ProgressTracker>,
    ) -> Result<(), TransportError> {
        (**self).put(target, file, progress).await
    }
}
