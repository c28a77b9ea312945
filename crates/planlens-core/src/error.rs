use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanlensError {
    #[error("invalid subtask id: {0}")]
    InvalidId(String),

    #[error("subtask not found: {0}")]
    SubtaskNotFound(String),
}
