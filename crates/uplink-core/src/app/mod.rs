//! App - アプリケーション層
//!
//! ports を組み合わせてアップロードの流れを実装します。
//!
//! # 主要コンポーネント
//! - **CoordinatorBuilder**: 構築とワイヤリング
//! - **UploadCoordinator**: 単体・バッチアップロード

pub mod builder;
pub mod coordinator;

pub use self::builder::{BuildError, CoordinatorBuilder};
pub use self::coordinator::UploadCoordinator;
