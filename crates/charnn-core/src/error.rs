use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("input id {id} is out of range for a vocabulary of {nchars} characters")]
    InputOutOfRange { id: i64, nchars: i64 },

    #[error("snapshot parameter {name} does not match the model")]
    SnapshotMismatch { name: String },

    #[error("torch error: {0}")]
    Tch(#[from] tch::TchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
