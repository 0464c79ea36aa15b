//! ProgressObserver port - バッチ全体の進捗通知
//!
//! コールバックでもチャネルでも実装できるように trait にしています。
//! 実装は panic しないこと（panic した場合は呼び出し側の責任）。

/// Receives `(file_name, percent)` for every file in a batch.
///
/// Events for one file arrive in order; there is no ordering across files.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, file_name: &str, percent: u8);
}

impl<F> ProgressObserver for F
where
    F: Fn(&str, u8) + Send + Sync,
{
    fn on_progress(&self, file_name: &str, percent: u8) {
        self(file_name, percent)
    }
}
