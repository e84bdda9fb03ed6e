use std::fmt;

use thiserror::Error;

/// Where a non-finite value was caught inside a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceSite {
    /// Cross-entropy at this position of the forward unroll.
    Loss { position: usize },
    /// Gradient norm after the backward pass, before the optimizer step.
    Gradient,
}

impl fmt::Display for DivergenceSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergenceSite::Loss { position } => write!(f, "loss at position {}", position),
            DivergenceSite::Gradient => write!(f, "gradient norm"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("chunk size {chunk_size} must be smaller than the corpus length {corpus_len}")]
    ChunkTooLarge { chunk_size: usize, corpus_len: usize },

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("input chunk has {inputs} ids but target chunk has {targets}")]
    MismatchedChunk { inputs: usize, targets: usize },

    #[error("training diverged in chunk {chunk} (overall): {site} is {value}")]
    Diverged {
        /// 1-based count of chunks since the trainer was built, across epochs.
        chunk: usize,
        site: DivergenceSite,
        value: f64,
    },

    #[error(transparent)]
    Model(#[from] charnn_core::ModelError),

    #[error(transparent)]
    Vocab(#[from] tokenizer::VocabError),

    #[error("torch error: {0}")]
    Tch(#[from] tch::TchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrainError>;
