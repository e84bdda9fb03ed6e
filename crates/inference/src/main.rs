use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use inference::{load_model, GenerationConfig, Generator};
use tch::Device;

#[derive(Parser)]
#[command(author, version, about = "Sample text from a trained character model", long_about = None)]
struct Cli {
    /// Directory holding config.json, vocab.json and checkpoint_epoch_*.ot
    #[arg(short, long, default_value = "checkpoints")]
    checkpoint_dir: PathBuf,

    /// YAML file with generation defaults
    #[arg(long, default_value = "configs/generation_config.yaml")]
    config: PathBuf,

    /// Text that seeds the hidden state
    #[arg(short, long)]
    prime: Option<String>,

    /// Number of characters to sample after the prime
    #[arg(short, long)]
    length: Option<usize>,

    /// Softmax temperature, greater than zero
    #[arg(short, long)]
    temperature: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,
}

fn load_generation_config(path: &Path) -> Result<GenerationConfig> {
    if path.exists() {
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    } else {
        Ok(GenerationConfig::default())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config = load_generation_config(&cli.config)?;
    if let Some(prime) = cli.prime {
        config.prime_string = prime;
    }
    if let Some(length) = cli.length {
        config.generation_length = length;
    }
    if let Some(temperature) = cli.temperature {
        config.temperature = temperature;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let device = Device::cuda_if_available();
    tracing::info!("Using device: {:?}", device);

    let (model, vocab) = load_model(&cli.checkpoint_dir, device)?;
    let mut generator = Generator::new(&model, &vocab, config.seed);
    let text = generator.generate_with(&config)?;

    println!("{}", text);
    Ok(())
}
