//! InMemoryTransport - 開発用・テスト用のアップロード先
//!
//! # 学習ポイント
//! - URL ごとに失敗・遅延を仕込める（期限切れ URL のシミュレーション）
//! - リクエスト履歴と同時実行数のピークを記録する
//! - チャンクごとに yield して、並行アップロードの進捗をインターリーブさせる

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::domain::{ProgressTracker, TransportError, UploadTarget, UploadableFile};
use crate::ports::UploadTransport;

/// An object accepted by the in-memory destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub body: Bytes,
    pub headers: BTreeMap<String, String>,
}

/// ```ignore
/// let transport = InMemoryTransport::new()
///     .with_failure("https://s/b.png", TransportError::Status { status: 403, body: "expired".into() })
///     .with_delay("https://s/a.png", Duration::from_millis(50));
/// ```
pub struct InMemoryTransport {
    chunk_size: usize,
    reports_progress: bool,
    failures: HashMap<String, TransportError>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    objects: tokio::sync::Mutex<HashMap<String, StoredObject>>,
    requests: tokio::sync::Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            reports_progress: true,
            failures: HashMap::new(),
            delays: HashMap::new(),
            default_delay: None,
            objects: tokio::sync::Mutex::new(HashMap::new()),
            requests: tokio::sync::Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Refuse uploads to `url` with `error` (after any configured delay).
    pub fn with_failure(mut self, url: impl Into<String>, error: TransportError) -> Self {
        self.failures.insert(url.into(), error);
        self
    }

    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// Behave like a transport that cannot observe byte counts.
    pub fn without_progress(mut self) -> Self {
        self.reports_progress = false;
        self
    }

    pub async fn object(&self, url: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(url).cloned()
    }

    pub async fn stored_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        urls.sort();
        urls
    }

    /// URLs in the order requests were issued.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }

    /// Uploads currently inside `put`.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn transfer(
        &self,
        target: &UploadTarget,
        file: &UploadableFile,
        progress: &ProgressTracker,
    ) -> Result<(), TransportError> {
        if let Some(delay) = self.delays.get(&target.url).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.get(&target.url) {
            return Err(error.clone());
        }

        for chunk in file.body.chunks(self.chunk_size) {
            if self.reports_progress {
                progress.advance(chunk.len() as u64);
            }
            tokio::task::yield_now().await;
        }

        self.objects.lock().await.insert(
            target.url.clone(),
            StoredObject {
                content_type: file.content_type.clone(),
                body: file.body.clone(),
                headers: target.headers.clone(),
            },
        );
        Ok(())
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UploadTransport for InMemoryTransport {
    async fn put(
        &self,
        target: &UploadTarget,
        file: &UploadableFile,
        progress: Arc<ProgressTracker>,
    ) -> Result<(), TransportError> {
        self.requests.lock().await.push(target.url.clone());

        let _guard = InFlightGuard::enter(&self.in_flight, &self.peak_in_flight);
        self.transfer(target, file, &progress).await
    }
}

/// Counts one in-flight upload until dropped, including when the upload
/// task is aborted mid-transfer.
struct InFlightGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(in_flight: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { in_flight }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
