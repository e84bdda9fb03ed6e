use std::path::Path;

use rand::Rng;
use tokenizer::{EncodedCorpus, Vocabulary};

use crate::error::{Result, TrainError};

/// Reads a UTF-8 corpus, optionally lowercasing it.
pub fn read_corpus(path: &Path, lowercase: bool) -> std::io::Result<String> {
    let text = std::fs::read_to_string(path)?;
    Ok(if lowercase { text.to_lowercase() } else { text })
}

pub struct TextDataset {
    corpus: EncodedCorpus,
}

impl TextDataset {
    pub fn new(vocab: &Vocabulary, text: &str) -> Result<Self> {
        Ok(Self::from_corpus(EncodedCorpus::new(vocab, text)?))
    }

    pub fn from_corpus(corpus: EncodedCorpus) -> Self {
        Self { corpus }
    }

    pub fn corpus(&self) -> &EncodedCorpus {
        &self.corpus
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    pub fn check_chunk_size(&self, chunk_size: usize) -> Result<()> {
        if chunk_size == 0 {
            return Err(TrainError::InvalidConfig("chunk_size must be at least 1".to_string()));
        }
        if chunk_size >= self.len() {
            return Err(TrainError::ChunkTooLarge {
                chunk_size,
                corpus_len: self.len(),
            });
        }
        Ok(())
    }

    /// Chunks drawn per epoch: `floor(len / chunk_size)`.
    pub fn chunks_per_epoch(&self, chunk_size: usize) -> usize {
        self.len() / chunk_size.max(1)
    }

    /// Contiguous `(x, y)` slices of `chunk_size` ids starting at a uniformly
    /// random offset in `[0, len - chunk_size)`.
    pub fn random_chunk<R: Rng>(&self, rng: &mut R, chunk_size: usize) -> Result<(&[u32], &[u32])> {
        self.check_chunk_size(chunk_size)?;

        let start = rng.gen_range(0..self.len() - chunk_size);
        let end = start + chunk_size;
        Ok((&self.corpus.x()[start..end], &self.corpus.y()[start..end]))
    }
}
