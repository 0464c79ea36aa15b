//! Ports - 抽象化レイヤー
//!
//! 外部システム（ストレージへの HTTP、時刻、ID 生成、進捗の受け手）への
//! インターフェースを trait として定義し、実装の詳細を隠蔽します。

pub mod clock;
pub mod id_generator;
pub mod observer;
pub mod transport;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::observer::ProgressObserver;
pub use self::transport::UploadTransport;
