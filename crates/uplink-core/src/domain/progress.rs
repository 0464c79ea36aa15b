//! Progress - 1 ファイル分の進捗計算
//!
//! # 不変条件
//! - percent は `round(sent * 100 / total)`、0..=100
//! - 同じファイルについて単調非減少、同じ値は 2 回通知しない
//! - total が不明なら途中経過は通知しない
//! - 成功時の最後の通知は必ず 100

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// One progress tick for a named file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub file_name: String,
    pub percent: u8,
}

/// Per-file progress callback.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Rounded percentage, half rounds up. `total == 0` counts as done.
pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let sent = sent.min(total) as u128;
    let total = total as u128;
    ((sent * 200 + total) / (total * 2)) as u8
}

/// Turns byte counts reported by a transport into percent callbacks.
///
/// The lock is held while the callback runs so a single file's events are
/// delivered strictly in order even if the transport reports from
/// different threads.
pub struct ProgressTracker {
    total: Option<u64>,
    state: Mutex<TrackerState>,
    callback: Option<ProgressCallback>,
}

#[derive(Default)]
struct TrackerState {
    sent: u64,
    last: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total: Option<u64>, callback: Option<ProgressCallback>) -> Self {
        Self {
            total,
            state: Mutex::new(TrackerState::default()),
            callback,
        }
    }

    /// A tracker that only counts bytes.
    pub fn silent(total: Option<u64>) -> Self {
        Self::new(total, None)
    }

    /// Records `bytes` more sent.
    pub fn advance(&self, bytes: u64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sent = state.sent.saturating_add(bytes);
        if let Some(total) = self.total {
            let percent = percent_of(state.sent, total);
            self.emit(&mut state, percent);
        }
    }

    /// Marks the transfer acknowledged. Emits 100 unless it was already reported.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.emit(&mut state, 100);
    }

    pub fn bytes_sent(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).sent
    }

    /// Last percentage delivered, 0 if nothing was reported yet.
    pub fn last_percent(&self) -> u8 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last
            .unwrap_or(0)
    }

    fn emit(&self, state: &mut TrackerState, percent: u8) {
        // 0 は開始時点と同じ値なので通知しない
        let unchanged = match state.last {
            Some(last) => percent <= last,
            None => percent == 0,
        };
        if unchanged {
            return;
        }
        state.last = Some(percent);
        if let Some(callback) = &self.callback {
            callback(percent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn recording() -> (ProgressCallback, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p));
        (callback, seen)
    }

    #[rstest]
    #[case::nothing(0, 1024, 0)]
    #[case::half_rounds_up(1, 200, 1)]
    #[case::below_half(1, 201, 0)]
    #[case::third(1, 3, 33)]
    #[case::two_thirds(2, 3, 67)]
    #[case::done(1024, 1024, 100)]
    #[case::overshoot(4096, 1024, 100)]
    #[case::empty_body(0, 0, 100)]
    fn percent_rounds(#[case] sent: u64, #[case] total: u64, #[case] expected: u8) {
        assert_eq!(percent_of(sent, total), expected);
    }

    #[test]
    fn percent_does_not_overflow_on_huge_sizes() {
        assert_eq!(percent_of(u64::MAX / 2, u64::MAX), 50);
    }

    #[test]
    fn emits_only_on_change() {
        let (callback, seen) = recording();
        let tracker = ProgressTracker::new(Some(1000), Some(callback));

        tracker.advance(1); // 0
        tracker.advance(1); // still 0
        tracker.advance(498); // 50
        tracker.advance(500); // 100
        tracker.finish();

        assert_eq!(*seen.lock().unwrap(), vec![50, 100]);
        assert_eq!(tracker.bytes_sent(), 1000);
    }

    #[test]
    fn tiny_first_chunk_does_not_report_zero() {
        let (callback, seen) = recording();
        let tracker = ProgressTracker::new(Some(1_000_000), Some(callback));

        tracker.advance(4_000);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(tracker.last_percent(), 0);

        tracker.advance(6_000);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn unknown_total_only_reports_completion() {
        let (callback, seen) = recording();
        let tracker = ProgressTracker::new(None, Some(callback));

        tracker.advance(10);
        tracker.advance(10);
        assert!(seen.lock().unwrap().is_empty());

        tracker.finish();
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[test]
    fn finish_after_partial_progress_ends_at_100() {
        let (callback, seen) = recording();
        let tracker = ProgressTracker::new(Some(3), Some(callback));

        tracker.advance(1);
        tracker.finish();

        assert_eq!(*seen.lock().unwrap(), vec![33, 100]);
        assert_eq!(tracker.last_percent(), 100);
    }

    #[test]
    fn silent_tracker_still_counts() {
        let tracker = ProgressTracker::silent(Some(10));
        tracker.advance(5);
        assert_eq!(tracker.last_percent(), 50);
    }
}
