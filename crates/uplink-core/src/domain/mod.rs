//! Domain model (targets, files, progress, state, reports, errors).

pub mod errors;
pub mod file;
pub mod ids;
pub mod progress;
pub mod report;
pub mod state;
pub mod target;

pub use self::errors::{ContractViolation, TransportError, UploadError};
pub use self::file::UploadableFile;
pub use self::ids::{BatchId, TransferId};
pub use self::progress::{ProgressCallback, ProgressEvent, ProgressTracker, percent_of};
pub use self::report::{BatchReport, FileReport};
pub use self::state::FileState;
pub use self::target::UploadTarget;
