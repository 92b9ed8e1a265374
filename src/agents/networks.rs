use ndarray::{Array1, Array2};
use rand::Rng;

use crate::agents::types::{ActorCriticParams, LinearParams};
use crate::device::Device;
use crate::rng::{KeyRng, PrngKey};

impl LinearParams {
    /// Uniform init in `±1/sqrt(in)`, zero bias.
    pub fn init(out_dim: usize, in_dim: usize, key: PrngKey, device: Device) -> Self {
        let mut rng = key.rng();
        let scale = 1.0 / (in_dim.max(1) as f32).sqrt();
        let weights = Array2::from_shape_fn((out_dim, in_dim), |_| rng.random_range(-scale..scale));
        Self {
            weights,
            bias: Array1::zeros(out_dim),
            device,
        }
    }

    pub fn zeros_like(&self) -> Self {
        Self {
            weights: Array2::zeros(self.weights.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
            device: self.device,
        }
    }

    pub fn forward(&self, x: &Array1<f32>) -> Array1<f32> {
        self.weights.dot(x) + &self.bias
    }

    /// Accumulate the gradient of `dot(d_out, W x + b)` with respect to `W` and `b`.
    pub fn accumulate_grad(&mut self, x: &Array1<f32>, d_out: &Array1<f32>) {
        for (mut row, d) in self.weights.rows_mut().into_iter().zip(d_out.iter()) {
            row.scaled_add(*d, x);
        }
        self.bias += d_out;
    }
}

impl ActorCriticParams {
    pub fn init(observation_dim: usize, num_actions: usize, key: PrngKey, device: Device) -> Self {
        let [actor_key, critic_key] = key.split_n::<2>();
        Self {
            actor: LinearParams::init(num_actions, observation_dim, actor_key, device),
            critic: LinearParams::init(1, observation_dim, critic_key, device),
        }
    }

    pub fn zeros_like(&self) -> Self {
        Self {
            actor: self.actor.zeros_like(),
            critic: self.critic.zeros_like(),
        }
    }

    pub fn value(&self, observation: &Array1<f32>) -> f32 {
        self.critic.forward(observation)[0]
    }
}

pub fn log_softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let log_sum = logits.mapv(|x| (x - max).exp()).sum().ln() + max;
    logits.mapv(|x| x - log_sum)
}

pub fn entropy(log_probs: &Array1<f32>) -> f32 {
    -log_probs.iter().map(|lp| lp.exp() * lp).sum::<f32>()
}

pub fn argmax(values: &Array1<f32>) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

/// Sample an index from a categorical distribution given its log-probabilities.
pub fn sample_categorical(log_probs: &Array1<f32>, rng: &mut KeyRng) -> usize {
    let u: f32 = rng.random();
    let mut cumulative = 0.0;
    for (i, lp) in log_probs.iter().enumerate() {
        cumulative += lp.exp();
        if u < cumulative {
            return i;
        }
    }
    // Rounding can leave the cumulative mass a hair under 1.
    log_probs.len() - 1
}
