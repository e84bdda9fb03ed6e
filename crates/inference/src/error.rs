use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("prime string must contain at least one character")]
    EmptyPrime,

    #[error("temperature must be a finite value greater than zero, got {0}")]
    InvalidTemperature(f64),

    #[error("logits contain no finite maximum; cannot form a distribution")]
    DegenerateDistribution,

    #[error(transparent)]
    Vocab(#[from] tokenizer::VocabError),

    #[error(transparent)]
    Model(#[from] charnn_core::ModelError),

    #[error("torch error: {0}")]
    Tch(#[from] tch::TchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
