use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use charnn_core::{CharModel, ModelConfig};
use tch::Device;
use tokenizer::Vocabulary;

pub mod error;
pub mod generator;
pub mod sampling;

pub use error::GenerateError;
pub use generator::Generator;
pub use sampling::{GenerationConfig, Sampler};

/// Most recent `.ot` weight file in `dir`, by file name.
pub fn latest_checkpoint(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut checkpoints: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "ot"))
        .collect();

    checkpoints.sort();
    checkpoints.pop()
}

/// Loads the model config, vocabulary and latest weights written by the trainer.
pub fn load_model(dir: &Path, device: Device) -> Result<(CharModel, Vocabulary)> {
    let config_path = dir.join("config.json");
    let config_str = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read model config.json at {:?}", config_path))?;
    let config: ModelConfig = serde_json::from_str(&config_str)
        .context("Failed to parse model config.json")?;

    let vocab_path = dir.join("vocab.json");
    let vocab = Vocabulary::load(&vocab_path)
        .with_context(|| format!("Failed to load vocabulary at {:?}", vocab_path))?;
    anyhow::ensure!(
        vocab.len() as i64 == config.vocab_size,
        "vocabulary has {} characters but the model expects {}",
        vocab.len(),
        config.vocab_size
    );

    let mut model = CharModel::new(&config, device)?;
    let weights = latest_checkpoint(dir)
        .with_context(|| format!("No .ot checkpoint found in {:?}", dir))?;
    tracing::info!("Loading weights from {:?}", weights);
    model
        .load_weights(&weights)
        .with_context(|| format!("Failed to load weights from {:?}", weights))?;

    Ok((model, vocab))
}
