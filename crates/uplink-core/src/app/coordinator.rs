//! UploadCoordinator - 事前署名 URL への並行アップロード
//!
//! # フロー（upload_batch）
//! 1. 契約チェック（files と targets の数、サイズ・Content-Type 制限）。通信前に失敗する
//! 2. (file, target) ごとに tokio タスクを spawn（同時実行数の上限なし）
//! 3. 完了順に結果を観測し、最初の失敗でただちに返す（fail-fast）
//! 4. 残りの兄弟タスクは SiblingPolicy に従う（Detach: 走らせ続ける / Abort: 中断）
//!
//! ファイル間で共有する可変状態はありません。各タスクが body と
//! ProgressTracker を専有します。

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::{SiblingPolicy, UploadConfig};
use crate::domain::{
    BatchId, BatchReport, ContractViolation, FileReport, FileState, ProgressCallback,
    ProgressTracker, TransferId, TransportError, UploadError, UploadTarget, UploadableFile,
};
use crate::ports::{Clock, IdGenerator, ProgressObserver, UploadTransport};

pub struct UploadCoordinator {
    transfers: TransferContext,
    ids: Arc<dyn IdGenerator>,
    config: UploadConfig,
}

/// What a spawned upload needs; cheap to clone into each task.
#[derive(Clone)]
struct TransferContext {
    transport: Arc<dyn UploadTransport>,
    clock: Arc<dyn Clock>,
}

struct TransferOutcome {
    state: FileState,
    result: Result<(), UploadError>,
}

struct SpawnedTransfer {
    file_name: String,
    tracker: Arc<ProgressTracker>,
    handle: JoinHandle<TransferOutcome>,
}

impl UploadCoordinator {
    pub(crate) fn new(
        transport: Arc<dyn UploadTransport>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: UploadConfig,
    ) -> Self {
        Self {
            transfers: TransferContext { transport, clock },
            ids,
            config,
        }
    }

    pub fn builder() -> super::CoordinatorBuilder {
        super::CoordinatorBuilder::new()
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Uploads one file to its target. Exactly one attempt, no retry.
    ///
    /// `on_progress` receives rounded percentages as they change; on success
    /// the last value is 100.
    pub async fn upload_single(
        &self,
        target: &UploadTarget,
        file: &UploadableFile,
        on_progress: Option<ProgressCallback>,
    ) -> Result<(), UploadError> {
        self.config.limits.check(file)?;
        let transfer_id = self.ids.generate_transfer_id();
        let tracker = Arc::new(ProgressTracker::new(Some(file.size()), on_progress));

        self.transfers
            .run(transfer_id, target, file, tracker)
            .instrument(info_span!("upload", transfer_id = %transfer_id, file = %file.name))
            .await
            .result
    }

    /// Uploads every `files[i]` to `targets[i]` concurrently.
    ///
    /// Resolves once all succeed; returns the first failure observed, without
    /// waiting for the rest. What happens to the rest is `config.sibling_policy`.
    pub async fn upload_batch(
        &self,
        files: Vec<UploadableFile>,
        targets: Vec<UploadTarget>,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<(), UploadError> {
        self.validate(&files, &targets)?;
        if files.is_empty() {
            return Ok(());
        }

        let batch_id = self.ids.generate_batch_id();
        let started = Instant::now();
        info!(batch_id = %batch_id, files = files.len(), "starting upload batch");

        let spawned = self.spawn_all(batch_id, files, targets, observer);
        let abort_handles: Vec<_> = spawned.iter().map(|s| s.handle.abort_handle()).collect();

        let mut pending: FuturesUnordered<_> = spawned
            .into_iter()
            .map(|s| async move {
                let joined = s.handle.await;
                (s.file_name, joined)
            })
            .collect();

        while let Some((file_name, joined)) = pending.next().await {
            if let Err(err) = settle(&file_name, joined).result {
                let remaining = pending.len();
                match self.config.sibling_policy {
                    SiblingPolicy::Abort => {
                        for handle in &abort_handles {
                            handle.abort();
                        }
                        warn!(batch_id = %batch_id, file = %file_name, remaining, "batch failed, aborting in-flight uploads");
                    }
                    SiblingPolicy::Detach => {
                        warn!(batch_id = %batch_id, file = %file_name, remaining, "batch failed, in-flight uploads left running");
                    }
                }
                return Err(err);
            }
        }

        info!(
            batch_id = %batch_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upload batch complete"
        );
        Ok(())
    }

    /// Like `upload_batch`, but waits for every upload and reports each one.
    ///
    /// Only contract violations are returned as `Err`; transfer failures are
    /// in the report so the caller can retry just `failed_indices()`.
    pub async fn upload_batch_settled(
        &self,
        files: Vec<UploadableFile>,
        targets: Vec<UploadTarget>,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<BatchReport, UploadError> {
        self.validate(&files, &targets)?;

        let batch_id = self.ids.generate_batch_id();
        info!(batch_id = %batch_id, files = files.len(), "starting settled upload batch");

        let spawned = self.spawn_all(batch_id, files, targets, observer);
        let mut reports = Vec::with_capacity(spawned.len());
        for (index, transfer) in spawned.into_iter().enumerate() {
            let outcome = settle(&transfer.file_name, transfer.handle.await);
            let error = outcome.result.as_ref().err().map(ToString::to_string);
            reports.push(FileReport {
                index,
                file_name: transfer.file_name,
                state: outcome.state,
                percent: transfer.tracker.last_percent(),
                error,
                failure: outcome.result.err(),
            });
        }

        let report = BatchReport {
            batch_id,
            files: reports,
        };
        let failed = report.failed_indices().len();
        info!(
            batch_id = %batch_id,
            complete = report.files.len() - failed,
            failed,
            "upload batch settled"
        );
        Ok(report)
    }

    fn validate(
        &self,
        files: &[UploadableFile],
        targets: &[UploadTarget],
    ) -> Result<(), ContractViolation> {
        if files.len() != targets.len() {
            return Err(ContractViolation::LengthMismatch {
                files: files.len(),
                targets: targets.len(),
            });
        }
        files.iter().try_for_each(|f| self.config.limits.check(f))
    }

    fn spawn_all(
        &self,
        batch_id: BatchId,
        files: Vec<UploadableFile>,
        targets: Vec<UploadTarget>,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Vec<SpawnedTransfer> {
        files
            .into_iter()
            .zip(targets)
            .map(|(file, target)| {
                let transfer_id = self.ids.generate_transfer_id();
                let callback = observer.clone().map(|observer| tagged(observer, file.name.clone()));
                let tracker = Arc::new(ProgressTracker::new(Some(file.size()), callback));

                let span = info_span!(
                    "upload",
                    batch_id = %batch_id,
                    transfer_id = %transfer_id,
                    file = %file.name
                );
                let transfers = self.transfers.clone();
                let task_tracker = tracker.clone();
                let file_name = file.name.clone();
                let handle = tokio::spawn(
                    async move { transfers.run(transfer_id, &target, &file, task_tracker).await }
                        .instrument(span),
                );

                SpawnedTransfer {
                    file_name,
                    tracker,
                    handle,
                }
            })
            .collect()
    }
}

impl TransferContext {
    async fn run(
        &self,
        transfer_id: TransferId,
        target: &UploadTarget,
        file: &UploadableFile,
        tracker: Arc<ProgressTracker>,
    ) -> TransferOutcome {
        let mut state = FileState::Pending;

        if target.is_expired_at(self.clock.now()) {
            let expired_at = target.expires_at.unwrap_or_else(|| self.clock.now());
            enter(&mut state, FileState::Failed, transfer_id);
            warn!(expired_at = %expired_at, "upload target already expired");
            return TransferOutcome {
                state,
                result: Err(UploadError::transport(
                    &file.name,
                    TransportError::ExpiredTarget { expired_at },
                )),
            };
        }

        enter(&mut state, FileState::Uploading, transfer_id);
        let started = Instant::now();

        match self.transport.put(target, file, tracker.clone()).await {
            Ok(()) => {
                tracker.finish();
                enter(&mut state, FileState::Complete, transfer_id);
                info!(
                    bytes = file.size(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "upload complete"
                );
                TransferOutcome {
                    state,
                    result: Ok(()),
                }
            }
            Err(e) => {
                enter(&mut state, FileState::Failed, transfer_id);
                warn!(error = %e, bytes_sent = tracker.bytes_sent(), "upload failed");
                TransferOutcome {
                    state,
                    result: Err(UploadError::transport(&file.name, e)),
                }
            }
        }
    }
}

fn enter(state: &mut FileState, next: FileState, transfer_id: TransferId) {
    match state.transition(next) {
        Some(next) => {
            debug!(transfer_id = %transfer_id, from = ?*state, to = ?next, "transfer state");
            *state = next;
        }
        None => warn!(transfer_id = %transfer_id, from = ?*state, to = ?next, "ignored invalid transfer state change"),
    }
}

/// Adapts a batch observer into a per-file callback carrying the file name.
fn tagged(observer: Arc<dyn ProgressObserver>, file_name: String) -> ProgressCallback {
    Arc::new(move |percent| observer.on_progress(&file_name, percent))
}

fn settle(file_name: &str, joined: Result<TransferOutcome, JoinError>) -> TransferOutcome {
    joined.unwrap_or_else(|e| {
        let reason = if e.is_cancelled() {
            "upload task was aborted".to_string()
        } else {
            format!("upload task panicked: {e}")
        };
        TransferOutcome {
            state: FileState::Failed,
            result: Err(UploadError::transport(
                file_name,
                TransportError::Interrupted(reason),
            )),
        }
    })
}
