use apireg_engine::RegistryError;
use apireg_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task cancelled")]
    Cancelled,

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid name: {0}")]
    Name(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("linter {linter} failed: {reason}")]
    Lint { linter: String, reason: String },

    #[error("invalid style guide: {0}")]
    StyleGuide(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Join(String),

    #[error("task queue is closed")]
    QueueClosed,
}

impl From<tokio::task::JoinError> for TaskError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Join(e.to_string())
    }
}

pub type TaskResult<T> = Result<T, TaskError>;
