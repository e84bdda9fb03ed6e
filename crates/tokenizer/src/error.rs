use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocabError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot build a vocabulary from an empty corpus")]
    EmptyCorpus,

    #[error("character {ch:?} at position {position} is not in the vocabulary")]
    UnknownCharacter { ch: char, position: usize },

    #[error("id {id} is out of range for a vocabulary of {nchars} characters")]
    InvalidId { id: u32, nchars: usize },

    #[error("character {ch:?} appears more than once in the vocabulary")]
    DuplicateCharacter { ch: char },
}

pub type Result<T> = std::result::Result<T, VocabError>;
