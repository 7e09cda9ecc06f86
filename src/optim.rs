//! Optimizers.
//!
//! Optimizer *state* (Adam moments) lives outside the model and is owned by the
//! training loop. Masked weight entries always receive a zero gradient, so their
//! moments stay zero and the update leaves them where they are.

use crate::{Error, Gradients, Made, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Optimizer choice for training.
pub enum Optimizer {
    /// Plain SGD.
    Sgd,
    /// Adam (bias-corrected).
    Adam { beta1: f32, beta2: f32, eps: f32 },
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::Adam {
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }
}

impl Optimizer {
    /// Validate optimizer hyperparameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Optimizer::Sgd => Ok(()),
            Optimizer::Adam { beta1, beta2, eps } => {
                for (name, beta) in [("beta1", beta1), ("beta2", beta2)] {
                    if !(beta.is_finite() && (0.0..1.0).contains(&beta)) {
                        return Err(Error::InvalidConfig(format!(
                            "adam {name} must be finite and in [0,1), got {beta}"
                        )));
                    }
                }
                if !(eps.is_finite() && eps > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "adam eps must be finite and > 0, got {eps}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Allocate optimizer state for `model`.
    pub fn state(self, model: &Made) -> Result<OptimizerState> {
        self.validate()?;

        Ok(match self {
            Optimizer::Sgd => OptimizerState::Sgd,
            Optimizer::Adam { beta1, beta2, eps } => OptimizerState::Adam(AdamState {
                beta1,
                beta2,
                eps,
                beta1_pow: 1.0,
                beta2_pow: 1.0,
                m: model.gradients(),
                v: model.gradients(),
            }),
        })
    }
}

#[derive(Debug, Clone)]
/// First and second moment estimates, shaped like the model's gradients.
pub struct AdamState {
    beta1: f32,
    beta2: f32,
    eps: f32,
    beta1_pow: f32,
    beta2_pow: f32,
    m: Gradients,
    v: Gradients,
}

#[derive(Debug, Clone)]
/// Owned optimizer state.
pub enum OptimizerState {
    Sgd,
    Adam(AdamState),
}

impl OptimizerState {
    /// Apply one optimizer step.
    ///
    /// `grads` may be overwritten with the update direction.
    pub fn step(&mut self, model: &mut Made, grads: &mut Gradients, lr: f32) {
        assert!(lr.is_finite() && lr > 0.0, "lr must be finite and > 0");

        match self {
            OptimizerState::Sgd => model.sgd_step(grads, lr),
            OptimizerState::Adam(state) => {
                state.direction(grads);
                model.sgd_step(grads, lr);
            }
        }
    }
}

impl AdamState {
    /// Update the moments and overwrite `grads` with `m_hat / (sqrt(v_hat) + eps)`.
    fn direction(&mut self, grads: &mut Gradients) {
        self.beta1_pow *= self.beta1;
        self.beta2_pow *= self.beta2;
        let corr1 = 1.0 - self.beta1_pow;
        let corr2 = 1.0 - self.beta2_pow;

        for layer_idx in 0..grads.num_layers() {
            adam_update(
                grads.d_weights_mut(layer_idx),
                self.m.d_weights_mut(layer_idx),
                self.v.d_weights_mut(layer_idx),
                (self.beta1, self.beta2, self.eps),
                (corr1, corr2),
            );
            adam_update(
                grads.d_biases_mut(layer_idx),
                self.m.d_biases_mut(layer_idx),
                self.v.d_biases_mut(layer_idx),
                (self.beta1, self.beta2, self.eps),
                (corr1, corr2),
            );
        }
    }
}

#[inline]
fn adam_update(
    g: &mut [f32],
    m: &mut [f32],
    v: &mut [f32],
    (beta1, beta2, eps): (f32, f32, f32),
    (corr1, corr2): (f32, f32),
) {
    debug_assert_eq!(g.len(), m.len());
    debug_assert_eq!(g.len(), v.len());

    for ((g, m), v) in g.iter_mut().zip(m.iter_mut()).zip(v.iter_mut()) {
        *m = beta1 * *m + (1.0 - beta1) * *g;
        *v = beta2 * *v + (1.0 - beta2) * *g * *g;
        *g = (*m / corr1) / ((*v / corr2).sqrt() + eps);
    }
}
