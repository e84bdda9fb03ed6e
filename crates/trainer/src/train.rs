use std::path::PathBuf;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tch::{nn, nn::OptimizerConfig, Kind, Tensor};

use charnn_core::{CharModel, ParamSnapshot};
use tokenizer::Vocabulary;

use crate::dataset::TextDataset;
use crate::error::{DivergenceSite, Result, TrainError};
use crate::TrainerConfig;

#[derive(Debug, Clone)]
pub struct ChunkReport {
    /// Summed (un-normalized) cross-entropy over the chunk.
    pub loss: f64,
    /// Argmax prediction at every position, for diagnostics only.
    pub predicted: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub average_loss: f64,
    pub chunks: usize,
    /// Greedy decoding of the epoch's last chunk.
    pub sample: String,
}

/// Truncated BPTT over randomly placed chunks, one Adam step per chunk.
///
/// Holds the only mutable borrow of the model for its lifetime. The hidden
/// state is reset to zero at the start of every chunk and never carried over.
pub struct Trainer<'a> {
    config: TrainerConfig,
    model: &'a mut CharModel,
    dataset: &'a TextDataset,
    vocab: &'a Vocabulary,
    optimizer: nn::Optimizer,
    rng: StdRng,
    epoch: usize,
    chunks_run: usize,
}

impl<'a> Trainer<'a> {
    pub fn new(
        model: &'a mut CharModel,
        dataset: &'a TextDataset,
        vocab: &'a Vocabulary,
        config: TrainerConfig,
    ) -> Result<Self> {
        config.validate()?;
        dataset.check_chunk_size(config.chunk_size)?;
        if model.config().vocab_size != vocab.len() as i64 {
            return Err(TrainError::InvalidConfig(format!(
                "model expects {} characters but the vocabulary has {}",
                model.config().vocab_size,
                vocab.len()
            )));
        }

        let optimizer = nn::Adam::default().build(model.var_store(), config.learning_rate)?;
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Self {
            config,
            model,
            dataset,
            vocab,
            optimizer,
            rng,
            epoch: 0,
            chunks_run: 0,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn model(&self) -> &CharModel {
        &*self.model
    }

    /// Number of completed epochs.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn random_chunk(&mut self, chunk_size: usize) -> Result<(&'a [u32], &'a [u32])> {
        let dataset: &'a TextDataset = self.dataset;
        dataset.random_chunk(&mut self.rng, chunk_size)
    }

    /// Unrolls the model over one chunk from a zero hidden state, sums the
    /// per-position cross-entropy, backpropagates through the whole chunk and
    /// takes one optimizer step.
    ///
    /// A non-finite loss or gradient aborts the chunk before the optimizer
    /// step, leaving the parameters as they were after the previous chunk.
    pub fn run_chunk(&mut self, x: &[u32], y: &[u32]) -> Result<ChunkReport> {
        if x.len() != y.len() || x.is_empty() {
            return Err(TrainError::MismatchedChunk {
                inputs: x.len(),
                targets: y.len(),
            });
        }

        let device = self.model.device();
        let mut hidden = self.model.init_hidden();
        let mut losses = Vec::with_capacity(x.len());
        let mut predicted = Vec::with_capacity(x.len());

        for (position, (&input, &target)) in x.iter().zip(y).enumerate() {
            let (logits, next) = self.model.step(input as i64, &hidden)?;
            hidden = next;

            let target = Tensor::from_slice(&[target as i64]).to_device(device);
            let step_loss = logits.cross_entropy_for_logits(&target);

            let value = step_loss.double_value(&[]);
            if !value.is_finite() {
                return Err(self.diverged(DivergenceSite::Loss { position }, value));
            }

            predicted.push(logits.argmax(-1, false).int64_value(&[0]) as u32);
            losses.push(step_loss);
        }

        let loss = Tensor::stack(&losses, 0).sum(Kind::Float);
        let chunk_loss = loss.double_value(&[]);

        self.optimizer.zero_grad();
        loss.backward();
        let grad_norm = self.apply_gradients()?;
        self.chunks_run += 1;

        debug!(
            "chunk {} | loss {:.4} | grad norm {:.4}",
            self.chunks_run, chunk_loss, grad_norm
        );

        Ok(ChunkReport {
            loss: chunk_loss,
            predicted,
        })
    }

    /// Runs `floor(len / chunk_size)` independently placed chunks and reports
    /// their mean loss.
    pub fn run_epoch(&mut self) -> Result<EpochReport> {
        let chunk_size = self.config.chunk_size;
        let chunks = self.dataset.chunks_per_epoch(chunk_size);

        let mut total_loss = 0.0;
        let mut last_predicted = Vec::new();
        for _ in 0..chunks {
            let (x, y) = self.random_chunk(chunk_size)?;
            let report = self.run_chunk(x, y)?;
            total_loss += report.loss;
            last_predicted = report.predicted;
        }

        self.epoch += 1;
        let report = EpochReport {
            epoch: self.epoch,
            average_loss: total_loss / chunks as f64,
            chunks,
            sample: self.vocab.decode_sequence(&last_predicted)?,
        };

        info!(
            "Epoch {} | {} chunks | average loss {:.4}",
            report.epoch, report.chunks, report.average_loss
        );
        Ok(report)
    }

    /// Runs the configured number of epochs.
    pub fn train(&mut self) -> Result<Vec<EpochReport>> {
        info!("Starting training with configuration: {:?}", self.config);
        (0..self.config.no_epochs).map(|_| self.run_epoch()).collect()
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        self.model.snapshot()
    }

    pub fn restore(&mut self, snapshot: &ParamSnapshot) -> Result<()> {
        self.model.restore(snapshot)?;
        Ok(())
    }

    /// Writes the weights, model config and vocabulary to the checkpoint dir.
    pub fn save_checkpoint(&self) -> Result<PathBuf> {
        let path = PathBuf::from(&self.config.checkpoint_dir);
        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }

        let filename = path.join(format!("checkpoint_epoch_{:05}.ot", self.epoch));
        self.model.save_weights(&filename)?;

        let config_json = serde_json::to_string_pretty(self.model.config())?;
        std::fs::write(path.join("config.json"), config_json)?;
        self.vocab.save(path.join("vocab.json"))?;

        info!("Saved checkpoint to {:?}", filename);
        Ok(filename)
    }

    /// Steps the optimizer on the accumulated gradients unless their norm is
    /// non-finite, in which case the gradients are cleared and nothing moves.
    fn apply_gradients(&mut self) -> Result<f64> {
        let grad_norm = self.grad_norm();
        if !grad_norm.is_finite() {
            self.optimizer.zero_grad();
            return Err(self.diverged(DivergenceSite::Gradient, grad_norm));
        }
        self.optimizer.step();
        Ok(grad_norm)
    }

    // Squared in f64: f32 squares overflow long before the gradients do.
    fn grad_norm(&self) -> f64 {
        self.model
            .var_store()
            .trainable_variables()
            .iter()
            .map(|var| var.grad())
            .filter(|grad| grad.defined())
            .map(|grad| {
                grad.to_kind(Kind::Double)
                    .pow_tensor_scalar(2.0)
                    .sum(Kind::Double)
                    .double_value(&[])
            })
            .sum::<f64>()
            .sqrt()
    }

    /// `chunk` counts chunks over the trainer's lifetime, not within the epoch.
    fn diverged(&self, site: DivergenceSite, value: f64) -> TrainError {
        warn!(
            "Non-finite {} in chunk {} (overall), during epoch {}",
            site,
            self.chunks_run + 1,
            self.epoch + 1
        );
        TrainError::Diverged {
            chunk: self.chunks_run + 1,
            site,
            value,
        }
    }
}
