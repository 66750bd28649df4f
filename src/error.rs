use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Rejected task input. Raised at capture time and when loading records from disk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title cannot be empty.")]
    EmptyTitle,
    #[error("Priority must be between 1 and 5, got {0}.")]
    PriorityOutOfRange(i64),
    #[error("Priority must be a number between 1 and 5, got {0:?}.")]
    PriorityNotANumber(String),
    #[error("Deadline format invalid. Correct format: yyyy-MM-dd HH:mm (got {0:?})")]
    InvalidDeadline(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(Uuid),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file does not contain valid task data: {0}")]
    Malformed(String),
    #[error("unsupported task file version {found} (this build reads version {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("invalid task {title:?}: {source}")]
    InvalidTask {
        title: String,
        #[source]
        source: ValidationError,
    },
    #[error("failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("notification channel closed")]
    ChannelClosed,
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Umbrella error for callers that drive several collaborators at once.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
