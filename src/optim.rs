//! Optimizers.
//!
//! Optimizer *state* (velocities, Adam moments) lives outside the model: the training
//! loop owns an `OptimizerState` and reuses it across steps and across `partial_fit`
//! calls. A step reads averaged mini-batch `Gradients` and writes the parameters in place.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Gradients, Mlp, Result};

/// Learning-rate floor below which the adaptive schedule gives up and stops training.
const ADAPTIVE_MIN_LR: f32 = 1e-6;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Learning-rate schedule for SGD.
pub enum LrSchedule {
    #[default]
    Constant,
    /// `lr = lr_init / (t + 1)^power_t`, where `t` counts samples seen; updated per epoch.
    InvScaling { power_t: f32 },
    /// Keep `lr_init` while training improves; divide by 5 on each plateau.
    Adaptive,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Optimizer choice for training.
pub enum Optimizer {
    /// SGD with (optionally Nesterov) momentum.
    Sgd {
        momentum: f32,
        nesterov: bool,
        schedule: LrSchedule,
    },
    /// Adam.
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
    /// SGD with Nesterov momentum 0.9 and a constant learning rate.
    pub fn sgd() -> Self {
        Optimizer::Sgd {
            momentum: 0.9,
            nesterov: true,
            schedule: LrSchedule::Constant,
        }
    }

    /// Validate optimizer hyperparameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Optimizer::Sgd {
                momentum, schedule, ..
            } => {
                if !(momentum.is_finite() && (0.0..=1.0).contains(&momentum)) {
                    return Err(Error::InvalidConfig(format!(
                        "momentum must be finite and in [0,1], got {momentum}"
                    )));
                }
                if let LrSchedule::InvScaling { power_t } = schedule {
                    if !(power_t.is_finite() && power_t >= 0.0) {
                        return Err(Error::InvalidConfig(format!(
                            "power_t must be finite and >= 0, got {power_t}"
                        )));
                    }
                }
                Ok(())
            }
            Optimizer::Adam { beta1, beta2, eps } => {
                if !(beta1.is_finite() && (0.0..1.0).contains(&beta1)) {
                    return Err(Error::InvalidConfig(format!(
                        "adam beta1 must be finite and in [0,1), got {beta1}"
                    )));
                }
                if !(beta2.is_finite() && (0.0..1.0).contains(&beta2)) {
                    return Err(Error::InvalidConfig(format!(
                        "adam beta2 must be finite and in [0,1), got {beta2}"
                    )));
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

    /// Allocate optimizer state for `model`, starting at learning rate `lr`.
    pub fn state(self, model: &Mlp, lr: f32) -> Result<OptimizerState> {
        self.validate()?;
        if !(lr.is_finite() && lr > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {lr}"
            )));
        }

        match self {
            Optimizer::Sgd {
                momentum,
                nesterov,
                schedule,
            } => {
                let (vw, vb) = zeros_like_params(model);
                Ok(OptimizerState::Sgd {
                    lr,
                    lr_init: lr,
                    momentum,
                    nesterov,
                    schedule,
                    v_weights: vw,
                    v_biases: vb,
                })
            }
            Optimizer::Adam { beta1, beta2, eps } => {
                let (mw, mb) = zeros_like_params(model);
                let (vw, vb) = zeros_like_params(model);
                Ok(OptimizerState::Adam {
                    lr,
                    beta1,
                    beta2,
                    eps,
                    t: 0,
                    beta1_pow: 1.0,
                    beta2_pow: 1.0,
                    m_weights: mw,
                    m_biases: mb,
                    v_weights: vw,
                    v_biases: vb,
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
/// Owned optimizer state.
pub enum OptimizerState {
    Sgd {
        lr: f32,
        lr_init: f32,
        momentum: f32,
        nesterov: bool,
        schedule: LrSchedule,
        v_weights: Vec<Vec<f32>>,
        v_biases: Vec<Vec<f32>>,
    },
    Adam {
        lr: f32,
        beta1: f32,
        beta2: f32,
        eps: f32,
        t: u64,
        beta1_pow: f32,
        beta2_pow: f32,
        m_weights: Vec<Vec<f32>>,
        m_biases: Vec<Vec<f32>>,
        v_weights: Vec<Vec<f32>>,
        v_biases: Vec<Vec<f32>>,
    },
}

impl OptimizerState {
    /// Current learning rate.
    pub fn learning_rate(&self) -> f32 {
        match self {
            OptimizerState::Sgd { lr, .. } | OptimizerState::Adam { lr, .. } => *lr,
        }
    }

    /// Apply one update to every parameter of `model` from the averaged batch `grads`.
    pub fn step(&mut self, model: &mut Mlp, grads: &Gradients) {
        assert_eq!(
            grads.num_layers(),
            model.num_layers(),
            "grads has {} layers, model has {} layers",
            grads.num_layers(),
            model.num_layers()
        );

        match self {
            OptimizerState::Sgd {
                lr,
                momentum,
                nesterov,
                v_weights,
                v_biases,
                ..
            } => {
                let (lr, momentum, nesterov) = (*lr, *momentum, *nesterov);
                for layer_idx in 0..model.num_layers() {
                    let layer = model.layer_mut(layer_idx).expect("layer idx must be valid");
                    sgd_update(
                        layer.weights_mut(),
                        &mut v_weights[layer_idx],
                        grads.d_weights(layer_idx),
                        lr,
                        momentum,
                        nesterov,
                    );
                    sgd_update(
                        layer.biases_mut(),
                        &mut v_biases[layer_idx],
                        grads.d_biases(layer_idx),
                        lr,
                        momentum,
                        nesterov,
                    );
                }
            }
            OptimizerState::Adam {
                lr,
                beta1,
                beta2,
                eps,
                t,
                beta1_pow,
                beta2_pow,
                m_weights,
                m_biases,
                v_weights,
                v_biases,
            } => {
                *t += 1;
                *beta1_pow *= *beta1;
                *beta2_pow *= *beta2;

                let moments = AdamMoments {
                    beta1: *beta1,
                    beta2: *beta2,
                    eps: *eps,
                    lr_t: *lr * (1.0 - *beta2_pow).sqrt() / (1.0 - *beta1_pow),
                };

                for layer_idx in 0..model.num_layers() {
                    let layer = model.layer_mut(layer_idx).expect("layer idx must be valid");
                    moments.update(
                        layer.weights_mut(),
                        &mut m_weights[layer_idx],
                        &mut v_weights[layer_idx],
                        grads.d_weights(layer_idx),
                    );
                    moments.update(
                        layer.biases_mut(),
                        &mut m_biases[layer_idx],
                        &mut v_biases[layer_idx],
                        grads.d_biases(layer_idx),
                    );
                }
            }
        }
    }

    /// End-of-epoch hook; `samples_seen` is the running count of training samples.
    pub fn iteration_ends(&mut self, samples_seen: u64) {
        if let OptimizerState::Sgd {
            lr,
            lr_init,
            schedule: LrSchedule::InvScaling { power_t },
            ..
        } = self
        {
            *lr = *lr_init / ((samples_seen + 1) as f32).powf(*power_t);
        }
    }

    /// Called when training stopped improving. Returns `true` if training should stop.
    ///
    /// Adaptive SGD divides its learning rate by 5 and keeps going until the rate falls
    /// below `1e-6`.
    pub fn trigger_stopping(&mut self) -> bool {
        match self {
            OptimizerState::Sgd {
                lr,
                schedule: LrSchedule::Adaptive,
                ..
            } => {
                if *lr <= ADAPTIVE_MIN_LR {
                    tracing::debug!(lr = *lr, "learning rate too small, stopping");
                    return true;
                }
                *lr /= 5.0;
                tracing::debug!(lr = *lr, "plateau reached, decreasing learning rate");
                false
            }
            OptimizerState::Sgd { .. } | OptimizerState::Adam { .. } => true,
        }
    }
}

#[inline]
fn sgd_update(
    params: &mut [f32],
    velocity: &mut [f32],
    grads: &[f32],
    lr: f32,
    momentum: f32,
    nesterov: bool,
) {
    debug_assert_eq!(params.len(), velocity.len());
    debug_assert_eq!(params.len(), grads.len());

    for ((p, v), &g) in params.iter_mut().zip(velocity.iter_mut()).zip(grads) {
        *v = momentum * *v - lr * g;
        *p += if nesterov {
            momentum * *v - lr * g
        } else {
            *v
        };
    }
}

struct AdamMoments {
    beta1: f32,
    beta2: f32,
    eps: f32,
    /// Bias-corrected step size for the current `t`.
    lr_t: f32,
}

impl AdamMoments {
    #[inline]
    fn update(&self, params: &mut [f32], m: &mut [f32], v: &mut [f32], grads: &[f32]) {
        debug_assert_eq!(params.len(), m.len());
        debug_assert_eq!(params.len(), v.len());
        debug_assert_eq!(params.len(), grads.len());

        for i in 0..params.len() {
            let g = grads[i];
            m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
            v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * (g * g);
            params[i] -= self.lr_t * m[i] / (v[i].sqrt() + self.eps);
        }
    }
}

fn zeros_like_params(model: &Mlp) -> (Vec<Vec<f32>>, Vec<Vec<f32>>) {
    model
        .layers()
        .iter()
        .map(|l| (vec![0.0; l.weights().len()], vec![0.0; l.out_dim()]))
        .unzip()
}
