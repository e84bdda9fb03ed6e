use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tch::Device;

use charnn_core::{CharModel, ModelConfig};
use inference::{GenerationConfig, Generator};
use tokenizer::Vocabulary;
use trainer::dataset::{read_corpus, TextDataset};
use trainer::{Trainer, TrainerConfig, TrainError};

#[derive(Parser)]
#[command(author, version, about = "Train a character-level GRU language model", long_about = None)]
struct Cli {
    /// UTF-8 text file to learn from
    #[arg(short, long)]
    corpus: PathBuf,

    /// Directory with model_config.yaml, training_config.yaml and generation_config.yaml
    #[arg(long, default_value = "configs")]
    config_dir: PathBuf,

    #[arg(short, long)]
    epochs: Option<usize>,

    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    checkpoint_dir: Option<String>,

    /// Train on the corpus as-is instead of lowercasing it first
    #[arg(long)]
    keep_case: bool,
}

fn load_yaml_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() {
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    } else {
        Ok(T::default())
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // 1. Corpus and vocabulary
    let text = read_corpus(&cli.corpus, !cli.keep_case)
        .with_context(|| format!("Failed to read corpus {:?}", cli.corpus))?;
    let vocab = Vocabulary::build(&text)?;
    println!(
        "Corpus: {} characters, {} distinct",
        text.chars().count(),
        vocab.len()
    );

    // 2. Configs, with CLI overrides
    let mut model_config: ModelConfig = load_yaml_or_default(&cli.config_dir.join("model_config.yaml"))?;
    model_config.vocab_size = vocab.len() as i64;

    let mut trainer_config: TrainerConfig =
        load_yaml_or_default(&cli.config_dir.join("training_config.yaml"))?;
    if let Some(epochs) = cli.epochs {
        trainer_config.no_epochs = epochs;
    }
    if let Some(chunk_size) = cli.chunk_size {
        trainer_config.chunk_size = chunk_size;
    }
    if let Some(learning_rate) = cli.learning_rate {
        trainer_config.learning_rate = learning_rate;
    }
    if let Some(seed) = cli.seed {
        trainer_config.seed = seed;
    }
    if let Some(dir) = cli.checkpoint_dir {
        trainer_config.checkpoint_dir = dir;
    }

    let generation_config: GenerationConfig =
        load_yaml_or_default(&cli.config_dir.join("generation_config.yaml"))?;

    let device = Device::cuda_if_available();
    println!("Using device: {:?}", device);

    // 3. Model and trainer
    let dataset = TextDataset::new(&vocab, &text)?;
    let mut model = CharModel::seeded(&model_config, device, trainer_config.seed as i64)?;
    let mut trainer = Trainer::new(&mut model, &dataset, &vocab, trainer_config.clone())?;

    let history_path = Path::new(&trainer_config.checkpoint_dir).join("loss_history.json");
    let mut history = Vec::new();

    // 4. Train
    for epoch in 1..=trainer_config.no_epochs {
        let snapshot = trainer.snapshot();
        match trainer.run_epoch() {
            Ok(report) => {
                println!(
                    "Epoch {} | cost {:.4} | {:?}",
                    report.epoch, report.average_loss, report.sample
                );
                history.push(report);
            }
            Err(err @ TrainError::Diverged { .. }) => {
                warn!("Rolling back to the start of epoch {}", epoch);
                trainer.restore(&snapshot)?;
                trainer.save_checkpoint()?;
                write_history(&history_path, &history)?;
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        }

        if trainer_config.sample_every > 0 && epoch % trainer_config.sample_every == 0 {
            let mut generator = Generator::new(trainer.model(), &vocab, generation_config.seed);
            match generator.generate_with(&generation_config) {
                Ok(sample) => println!("---\n{}\n---", sample),
                Err(err) => warn!("Skipping sample: {}", err),
            }
        }

        if trainer_config.save_every > 0 && epoch % trainer_config.save_every == 0 {
            trainer.save_checkpoint()?;
        }
    }

    let checkpoint = trainer.save_checkpoint()?;
    write_history(&history_path, &history)?;
    println!("Training complete! Weights saved to {:?}", checkpoint);

    Ok(())
}

fn write_history(path: &Path, history: &[trainer::EpochReport]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(history)?)?;
    Ok(())
}
