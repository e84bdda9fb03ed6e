use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tch::{Kind, Tensor};

use crate::error::{GenerateError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub prime_string: String,
    pub generation_length: usize,
    pub temperature: f64,
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            prime_string: "a".to_string(),
            generation_length: 200,
            temperature: 0.8,
            seed: 42,
        }
    }
}

pub fn check_temperature(temperature: f64) -> Result<()> {
    if temperature.is_finite() && temperature > 0.0 {
        Ok(())
    } else {
        Err(GenerateError::InvalidTemperature(temperature))
    }
}

/// Normalized `exp(logits / temperature)`.
///
/// The maximum logit is subtracted first, which leaves the distribution
/// unchanged but keeps `exp` from overflowing at small temperatures.
pub fn temperature_distribution(logits: &[f64], temperature: f64) -> Result<Vec<f64>> {
    check_temperature(temperature)?;

    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() || logits.iter().any(|l| l.is_nan()) {
        return Err(GenerateError::DegenerateDistribution);
    }

    let weights: Vec<f64> = logits
        .iter()
        .map(|&l| ((l - max) / temperature).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / total).collect())
}

/// Inverse-CDF lookup: the first index whose cumulative probability exceeds
/// `u * total`, for `u` in `[0, 1)`. Zero-probability entries are never chosen.
pub fn sample_index(probs: &[f64], u: f64) -> usize {
    let target = u * probs.iter().sum::<f64>();
    let mut cumulative = 0.0;
    let mut last_positive = 0;

    for (i, &p) in probs.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        cumulative += p;
        last_positive = i;
        if target < cumulative {
            return i;
        }
    }
    // rounding left target at or past the final cumulative sum
    last_positive
}

pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

pub fn logits_to_vec(logits: &Tensor) -> Result<Vec<f64>> {
    Ok(Vec::<f64>::try_from(&logits.detach().to_kind(Kind::Double).view([-1]))?)
}

/// Temperature sampler over a seeded generator, one uniform draw per sample.
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn sample_probs(&mut self, probs: &[f64]) -> usize {
        let u: f64 = self.rng.gen();
        sample_index(probs, u)
    }

    /// logits: `[1, vocab_size]` or `[vocab_size]`.
    pub fn sample(&mut self, logits: &Tensor, temperature: f64) -> Result<i64> {
        let logits = logits_to_vec(logits)?;
        let probs = temperature_distribution(&logits, temperature)?;
        Ok(self.sample_probs(&probs) as i64)
    }
}
