//! CoordinatorBuilder - UploadCoordinator の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - trait object（Arc<dyn ...>）による差し替え

use std::sync::Arc;

use crate::config::{ConfigError, UploadConfig};
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator, UploadTransport};

use super::UploadCoordinator;

/// ```ignore
/// let coordinator = UploadCoordinator::builder()
///     .transport(HttpTransport::new(&config)?)
///     .config(config)
///     .build()?;
/// ```
///
/// Clock を省略すると SystemClock、IdGenerator を省略すると
/// その Clock を使う UlidGenerator になります。
pub struct CoordinatorBuilder {
    transport: Option<Arc<dyn UploadTransport>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: UploadConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no upload transport configured")]
    MissingTransport,

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            clock: None,
            ids: None,
            config: UploadConfig::default(),
        }
    }

    pub fn transport(mut self, transport: impl UploadTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    pub fn config(mut self, config: UploadConfig) -> Self {
        self.config = config;
        self
    }

    /// # 検証
    /// - transport が設定されていること
    /// - config が妥当であること（chunk_size > 0 など）
    pub fn build(self) -> Result<UploadCoordinator, BuildError> {
        let transport = self.transport.ok_or(BuildError::MissingTransport)?;
        self.config.validate()?;

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(clock.clone())),
        };

        Ok(UploadCoordinator::new(transport, clock, ids, self.config))
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
