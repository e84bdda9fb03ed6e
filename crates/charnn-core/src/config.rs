use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of distinct characters (`nchars`). Always taken from the built vocabulary.
    pub vocab_size: i64,
    /// Width of the character embedding. `None` ties it to `vocab_size`.
    pub embed_dim: Option<i64>,
    /// Width of each GRU layer's hidden state.
    pub hidden_dim: i64,
    /// Number of stacked GRU layers.
    pub n_layers: i64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            vocab_size: 0,
            embed_dim: None,
            hidden_dim: 100,
            n_layers: 1,
        }
    }
}

impl ModelConfig {
    pub fn embed_dim(&self) -> i64 {
        self.embed_dim.unwrap_or(self.vocab_size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vocab_size <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "vocab_size must be positive, got {}",
                self.vocab_size
            )));
        }
        if self.embed_dim() <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "embed_dim must be positive, got {}",
                self.embed_dim()
            )));
        }
        if self.hidden_dim <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "hidden_dim must be positive, got {}",
                self.hidden_dim
            )));
        }
        if self.n_layers <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "n_layers must be at least 1, got {}",
                self.n_layers
            )));
        }
        Ok(())
    }
}
