//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **HttpTransport**: reqwest による本番用 PUT
//! - **InMemoryTransport**: 開発用・テスト用（`--dry-run` でも使用）
//! - **ChannelObserver**: 進捗イベントを mpsc チャネルへ

pub mod channel_observer;
pub mod http_transport;
pub mod inmem_transport;

pub use self::channel_observer::ChannelObserver;
pub use self::http_transport::HttpTransport;
pub use self::inmem_transport::{InMemoryTransport, StoredObject};
