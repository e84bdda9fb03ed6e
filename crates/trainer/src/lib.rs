pub mod dataset;
pub mod error;
pub mod train;

pub use dataset::TextDataset;
pub use error::{DivergenceSite, Result, TrainError};
pub use train::{ChunkReport, EpochReport, Trainer};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub learning_rate: f64,
    pub no_epochs: usize,
    pub chunk_size: usize,
    /// Seeds both parameter initialization and chunk sampling.
    pub seed: u64,
    /// Epochs between generated samples printed by the binary; 0 disables.
    pub sample_every: usize,
    /// Epochs between checkpoints; 0 saves only at the end.
    pub save_every: usize,
    pub checkpoint_dir: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.005,
            no_epochs: 20,
            chunk_size: 200,
            seed: 42,
            sample_every: 5,
            save_every: 10,
            checkpoint_dir: "./checkpoints".to_string(),
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.chunk_size == 0 {
            return Err(TrainError::InvalidConfig("chunk_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
