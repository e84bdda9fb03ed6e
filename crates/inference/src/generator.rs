use charnn_core::CharModel;
use tokenizer::Vocabulary;
use tracing::debug;

use crate::error::{GenerateError, Result};
use crate::sampling::{check_temperature, GenerationConfig, Sampler};

/// Autoregressive text generation over a read-only model.
pub struct Generator<'a> {
    model: &'a CharModel,
    vocab: &'a Vocabulary,
    sampler: Sampler,
}

impl<'a> Generator<'a> {
    pub fn new(model: &'a CharModel, vocab: &'a Vocabulary, seed: u64) -> Self {
        Self {
            model,
            vocab,
            sampler: Sampler::seeded(seed),
        }
    }

    /// Primes the hidden state with every character of `prime` but the last,
    /// then samples `length` characters, feeding each back as the next input.
    /// The returned string starts with `prime`.
    pub fn generate(&mut self, prime: &str, length: usize, temperature: f64) -> Result<String> {
        check_temperature(temperature)?;
        let prime_ids = self.vocab.encode(prime)?;
        let (&last, head) = prime_ids.split_last().ok_or(GenerateError::EmptyPrime)?;

        let _guard = tch::no_grad_guard();

        let mut hidden = self.model.init_hidden();
        for &id in head {
            let (_, next) = self.model.step(id as i64, &hidden)?;
            hidden = next;
        }

        let mut output = String::from(prime);
        output.reserve(length);

        let mut current = last as i64;
        for _ in 0..length {
            let (logits, next) = self.model.step(current, &hidden)?;
            hidden = next;
            current = self.sampler.sample(&logits, temperature)?;
            output.push(self.vocab.decode(current as u32)?);
        }

        debug!(prime_len = prime_ids.len(), length, temperature, "generated sample");
        Ok(output)
    }

    pub fn generate_with(&mut self, config: &GenerationConfig) -> Result<String> {
        self.generate(&config.prime_string, config.generation_length, config.temperature)
    }
}
