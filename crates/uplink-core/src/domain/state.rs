//! State - ファイルごとのアップロード状態
//!
//! # 状態遷移
//! - pending → uploading
//! - uploading → complete | failed
//! - pending → failed（期限切れなど、通信前に失敗した場合）

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Pending,
    Uploading,
    Complete,
    Failed,
}

impl FileState {
    pub fn can_transition_to(self, next: FileState) -> bool {
        matches!(
            (self, next),
            (FileState::Pending, FileState::Uploading)
                | (FileState::Pending, FileState::Failed)
                | (FileState::Uploading, FileState::Complete)
                | (FileState::Uploading, FileState::Failed)
        )
    }

    /// Returns the new state, or `None` if the transition is not allowed.
    pub fn transition(self, next: FileState) -> Option<FileState> {
        self.can_transition_to(next).then_some(next)
    }
}
