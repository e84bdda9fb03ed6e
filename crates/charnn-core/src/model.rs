use std::path::Path;

use tch::{nn, Device, Kind, Tensor};

use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::gru::GruLayer;

/// Recurrent memory carried between steps: `[n_layers, 1, hidden_dim]`.
#[derive(Debug)]
pub struct HiddenState(Tensor);

impl HiddenState {
    pub fn tensor(&self) -> &Tensor {
        &self.0
    }

    pub fn size(&self) -> Vec<i64> {
        self.0.size()
    }

    /// Hidden state of the top layer, `[1, hidden_dim]`.
    pub fn top(&self) -> Tensor {
        self.0.get(self.0.size()[0] - 1)
    }
}

/// Embedding -> stacked GRU -> linear projection to vocabulary logits.
pub struct CharRnn {
    encoder: nn::Embedding,
    layers: Vec<GruLayer>,
    decoder: nn::Linear,
    device: Device,
    pub config: ModelConfig,
}

impl CharRnn {
    pub fn new(vs: &nn::Path, config: &ModelConfig) -> Self {
        let embed_dim = config.embed_dim();
        let encoder = nn::embedding(vs / "encoder", config.vocab_size, embed_dim, Default::default());

        let mut layers = Vec::new();
        for i in 0..config.n_layers {
            let input_dim = if i == 0 { embed_dim } else { config.hidden_dim };
            layers.push(GruLayer::new(&(vs / "gru" / i), input_dim, config.hidden_dim));
        }

        let decoder = nn::linear(vs / "decoder", config.hidden_dim, config.vocab_size, Default::default());

        Self {
            encoder,
            layers,
            decoder,
            device: vs.device(),
            config: config.clone(),
        }
    }

    pub fn init_hidden(&self) -> HiddenState {
        HiddenState(Tensor::zeros(
            &[self.config.n_layers, 1, self.config.hidden_dim],
            (Kind::Float, self.device),
        ))
    }

    /// One recurrence step. Returns logits `[1, vocab_size]` and the new hidden state.
    pub fn step(&self, input_id: i64, hidden: &HiddenState) -> Result<(Tensor, HiddenState)> {
        if input_id < 0 || input_id >= self.config.vocab_size {
            return Err(ModelError::InputOutOfRange {
                id: input_id,
                nchars: self.config.vocab_size,
            });
        }

        let input = Tensor::from_slice(&[input_id]).to_device(self.device);
        let mut x = input.apply(&self.encoder);

        let mut next = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            let h = layer.forward(&x, &hidden.0.get(i as i64));
            x = h.shallow_clone();
            next.push(h);
        }

        let logits = x.apply(&self.decoder);
        Ok((logits, HiddenState(Tensor::stack(&next, 0))))
    }
}

/// Deep copy of every parameter, keyed by its variable-store name.
pub struct ParamSnapshot {
    tensors: Vec<(String, Tensor)>,
}

impl ParamSnapshot {
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

/// The network together with the variable store that owns its parameters.
///
/// Parameters are only mutated through `&mut self` (the optimizer is built on
/// [`CharModel::var_store`] by a caller holding the exclusive borrow), so a
/// forward pass can never observe a half-applied update.
pub struct CharModel {
    vs: nn::VarStore,
    rnn: CharRnn,
}

impl CharModel {
    pub fn new(config: &ModelConfig, device: Device) -> Result<Self> {
        config.validate()?;
        let vs = nn::VarStore::new(device);
        let rnn = CharRnn::new(&vs.root(), config);
        Ok(Self { vs, rnn })
    }

    /// Seeds libtorch's generator before creating the parameters.
    pub fn seeded(config: &ModelConfig, device: Device, seed: i64) -> Result<Self> {
        tch::manual_seed(seed);
        Self::new(config, device)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.rnn.config
    }

    pub fn device(&self) -> Device {
        self.vs.device()
    }

    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    pub fn init_hidden(&self) -> HiddenState {
        self.rnn.init_hidden()
    }

    pub fn step(&self, input_id: i64, hidden: &HiddenState) -> Result<(Tensor, HiddenState)> {
        self.rnn.step(input_id, hidden)
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        let mut tensors: Vec<(String, Tensor)> = self
            .vs
            .variables()
            .into_iter()
            .map(|(name, t)| (name, t.detach().copy()))
            .collect();
        tensors.sort_by(|a, b| a.0.cmp(&b.0));
        ParamSnapshot { tensors }
    }

    /// Copies a snapshot back into the parameters. Every name and shape is
    /// checked before anything is written, so a mismatch leaves the model as is.
    pub fn restore(&mut self, snapshot: &ParamSnapshot) -> Result<()> {
        let mut variables = self.vs.variables();
        for (name, saved) in &snapshot.tensors {
            match variables.get(name) {
                Some(var) if var.size() == saved.size() => {}
                _ => return Err(ModelError::SnapshotMismatch { name: name.clone() }),
            }
        }
        if let Some(name) = variables
            .keys()
            .find(|name| !snapshot.tensors.iter().any(|(saved, _)| saved == *name))
        {
            return Err(ModelError::SnapshotMismatch { name: name.clone() });
        }

        for (name, saved) in &snapshot.tensors {
            if let Some(var) = variables.get_mut(name) {
                tch::no_grad(|| var.copy_(saved));
            }
        }
        Ok(())
    }

    /// True when no parameter holds a NaN or infinity.
    pub fn is_finite(&self) -> bool {
        self.vs
            .trainable_variables()
            .iter()
            .all(|t| t.sum(Kind::Double).double_value(&[]).is_finite())
    }

    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.vs.save(path)?;
        Ok(())
    }

    pub fn load_weights<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.vs.load(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(t: &Tensor) -> Vec<f64> {
        Vec::<f64>::try_from(&t.to_kind(Kind::Double).view([-1])).unwrap()
    }

    fn small_model(n_layers: i64) -> CharModel {
        let config = ModelConfig {
            vocab_size: 5,
            embed_dim: Some(3),
            hidden_dim: 4,
            n_layers,
        };
        CharModel::new(&config, Device::Cpu).unwrap()
    }

    fn scale_parameters(model: &CharModel, factor: f64) {
        for (_, mut var) in model.var_store().variables() {
            let scaled = var.detach() * factor;
            tch::no_grad(|| var.copy_(&scaled));
        }
    }

    #[test]
    fn init_hidden_is_zero() {
        let model = small_model(2);
        let hidden = model.init_hidden();
        assert_eq!(hidden.size(), vec![2, 1, 4]);
        assert!(values(hidden.tensor()).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn step_is_deterministic() {
        let model = small_model(1);
        let hidden = model.init_hidden();
        let (logits_a, hidden_a) = model.step(2, &hidden).unwrap();
        let (logits_b, hidden_b) = model.step(2, &hidden).unwrap();
        assert_eq!(values(&logits_a), values(&logits_b));
        assert_eq!(values(hidden_a.tensor()), values(hidden_b.tensor()));
    }

    #[test]
    fn hidden_shape_is_preserved() {
        let model = small_model(3);
        let mut hidden = model.init_hidden();
        for id in [0, 4, 1, 3, 2] {
            let (logits, next) = model.step(id, &hidden).unwrap();
            assert_eq!(logits.size(), vec![1, 5]);
            assert_eq!(next.size(), hidden.size());
            assert_eq!(next.top().size(), vec![1, 4]);
            hidden = next;
        }
    }

    #[test]
    fn out_of_range_input_is_rejected() {
        let model = small_model(1);
        let hidden = model.init_hidden();
        assert!(matches!(
            model.step(5, &hidden),
            Err(ModelError::InputOutOfRange { id: 5, nchars: 5 })
        ));
        assert!(model.step(-1, &hidden).is_err());
    }

    #[test]
    fn gates_saturate_without_nan() {
        let model = small_model(2);
        scale_parameters(&model, 1e4);

        let mut hidden = model.init_hidden();
        for id in [1, 3, 0, 4, 4, 2] {
            let (logits, next) = model.step(id, &hidden).unwrap();
            assert!(values(&logits).iter().all(|v| v.is_finite()));
            assert!(values(next.tensor()).iter().all(|v| (-1.0..=1.0).contains(v)));
            hidden = next;
        }
        assert!(model.is_finite());
    }

    #[test]
    fn restore_brings_back_snapshot() {
        let mut model = small_model(1);
        let hidden = model.init_hidden();
        let (before, _) = model.step(1, &hidden).unwrap();

        let snapshot = model.snapshot();
        assert_eq!(snapshot.len(), model.var_store().variables().len());
        scale_parameters(&model, f64::NAN);
        assert!(!model.is_finite());

        model.restore(&snapshot).unwrap();
        assert!(model.is_finite());
        let (after, _) = model.step(1, &hidden).unwrap();
        assert_eq!(values(&before), values(&after));
    }

    #[test]
    fn restore_rejects_snapshot_of_other_shape() {
        let deeper = small_model(2);
        let mut model = small_model(1);
        let hidden = model.init_hidden();
        let (before, _) = model.step(4, &hidden).unwrap();

        match model.restore(&deeper.snapshot()) {
            Err(ModelError::SnapshotMismatch { name }) => assert!(name.starts_with("gru.1.")),
            other => panic!("expected SnapshotMismatch, got {:?}", other),
        }

        let wider = CharModel::new(
            &ModelConfig {
                vocab_size: 5,
                embed_dim: Some(3),
                hidden_dim: 8,
                n_layers: 1,
            },
            Device::Cpu,
        )
        .unwrap();
        assert!(matches!(
            model.restore(&wider.snapshot()),
            Err(ModelError::SnapshotMismatch { .. })
        ));

        let (after, _) = model.step(4, &hidden).unwrap();
        assert_eq!(values(&before), values(&after));
    }

    #[test]
    fn weights_survive_save_and_load() {
        let model = small_model(2);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.ot");
        model.save_weights(&path).unwrap();

        let mut other = small_model(2);
        other.load_weights(&path).unwrap();

        let hidden = model.init_hidden();
        let (a, _) = model.step(3, &hidden).unwrap();
        let (b, _) = other.step(3, &hidden).unwrap();
        assert_eq!(values(&a), values(&b));
    }
}
