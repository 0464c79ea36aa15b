//! uplink-core
//!
//! 事前署名 URL へのファイルアップロードを調整するライブラリ。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（UploadTarget, UploadableFile, progress, state, report, errors）
//! - **ports**: 抽象化レイヤー（UploadTransport, ProgressObserver, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（CoordinatorBuilder, UploadCoordinator）
//! - **impls**: 実装（HttpTransport, InMemoryTransport, ChannelObserver）
//! - **config**: TOML 設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{BuildError, CoordinatorBuilder, UploadCoordinator};
pub use config::{ConfigError, SiblingPolicy, UploadConfig, UploadLimits};
pub use domain::{
    BatchReport, ContractViolation, FileReport, FileState, ProgressEvent, TransportError,
    UploadError, UploadTarget, UploadableFile,
};
