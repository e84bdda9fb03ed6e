use tch::{nn, Tensor};

/// A single GRU layer with explicit gate weights.
///
/// Each gate reads the concatenation of the layer input and the previous
/// hidden state; the reset gate is applied to the hidden state *before*
/// the candidate projection:
///
/// ```text
/// r  = σ(W_r·[x, h] + b_r)
/// z  = σ(W_z·[x, h] + b_z)
/// n  = tanh(W_n·[x, r⊙h] + b_n)
/// h' = (1 − z)⊙n + z⊙h
/// ```
#[derive(Debug)]
pub struct GruLayer {
    w_r: Tensor,
    b_r: Tensor,
    w_z: Tensor,
    b_z: Tensor,
    w_n: Tensor,
    b_n: Tensor,
}

impl GruLayer {
    pub fn new(vs: &nn::Path, input_dim: i64, hidden_dim: i64) -> Self {
        let bound = 1.0 / (hidden_dim as f64).sqrt();
        let init = nn::Init::Uniform {
            lo: -bound,
            up: bound,
        };
        let fan_in = input_dim + hidden_dim;

        Self {
            w_r: vs.var("w_r", &[hidden_dim, fan_in], init),
            b_r: vs.var("b_r", &[hidden_dim], init),
            w_z: vs.var("w_z", &[hidden_dim, fan_in], init),
            b_z: vs.var("b_z", &[hidden_dim], init),
            w_n: vs.var("w_n", &[hidden_dim, fan_in], init),
            b_n: vs.var("b_n", &[hidden_dim], init),
        }
    }

    /// x: [1, input_dim], h: [1, hidden_dim] -> [1, hidden_dim]
    pub fn forward(&self, x: &Tensor, h: &Tensor) -> Tensor {
        let xh = Tensor::cat(&[x, h], 1);
        let r = (xh.matmul(&self.w_r.tr()) + &self.b_r).sigmoid();
        let z = (xh.matmul(&self.w_z.tr()) + &self.b_z).sigmoid();

        let x_rh = Tensor::cat(&[x, &(&r * h)], 1);
        let n = (x_rh.matmul(&self.w_n.tr()) + &self.b_n).tanh();

        (-&z + 1.0) * &n + &z * h
    }
}
