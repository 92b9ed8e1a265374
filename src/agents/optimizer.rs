use ndarray::{Array, Dimension, Zip};
use serde::{Deserialize, Serialize};

use crate::agents::types::{ActorCriticParams, LinearParams};

/// First and second moment estimates, shaped like the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdamState {
    pub mu: ActorCriticParams,
    pub nu: ActorCriticParams,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adam {
    pub learning_rate: f32,
    pub b1: f32,
    pub b2: f32,
    pub eps: f32,
}

impl Adam {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            b1: 0.9,
            b2: 0.999,
            eps: 1e-8,
        }
    }

    pub fn init(&self, params: &ActorCriticParams) -> AdamState {
        AdamState {
            mu: params.zeros_like(),
            nu: params.zeros_like(),
            count: 0,
        }
    }

    /// Apply one update, returning the new parameters and optimizer state.
    pub fn update(
        &self,
        grads: &ActorCriticParams,
        state: AdamState,
        params: ActorCriticParams,
    ) -> (ActorCriticParams, AdamState) {
        let AdamState {
            mut mu,
            mut nu,
            count,
        } = state;
        let mut params = params;
        let count = count + 1;
        let step = Step::new(self, count);

        step.apply_linear(&mut params.actor, &grads.actor, &mut mu.actor, &mut nu.actor);
        step.apply_linear(&mut params.critic, &grads.critic, &mut mu.critic, &mut nu.critic);

        (params, AdamState { mu, nu, count })
    }
}

struct Step {
    learning_rate: f32,
    b1: f32,
    b2: f32,
    eps: f32,
    bias_correction1: f32,
    bias_correction2: f32,
}

impl Step {
    fn new(adam: &Adam, count: u64) -> Self {
        let t = count.min(i32::MAX as u64) as i32;
        Self {
            learning_rate: adam.learning_rate,
            b1: adam.b1,
            b2: adam.b2,
            eps: adam.eps,
            bias_correction1: 1.0 - adam.b1.powi(t),
            bias_correction2: 1.0 - adam.b2.powi(t),
        }
    }

    fn apply_linear(
        &self,
        param: &mut LinearParams,
        grad: &LinearParams,
        mu: &mut LinearParams,
        nu: &mut LinearParams,
    ) {
        self.apply(&mut param.weights, &grad.weights, &mut mu.weights, &mut nu.weights);
        self.apply(&mut param.bias, &grad.bias, &mut mu.bias, &mut nu.bias);
    }

    fn apply<D: Dimension>(
        &self,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
        mu: &mut Array<f32, D>,
        nu: &mut Array<f32, D>,
    ) {
        Zip::from(param)
            .and(grad)
            .and(mu)
            .and(nu)
            .for_each(|p, &g, m, v| {
                *m = self.b1 * *m + (1.0 - self.b1) * g;
                *v = self.b2 * *v + (1.0 - self.b2) * g * g;
                let m_hat = *m / self.bias_correction1;
                let v_hat = *v / self.bias_correction2;
                *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.eps);
            });
    }
}
