//! Activation functions.
//!
//! A dense layer computes `z = W x + b` and then `y = activation(z)` element-wise.
//! Only the post-activation `y` is cached in `Scratch`, so every derivative here is
//! expressed in terms of `y`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Element-wise activation function.
pub enum Activation {
    /// `f(x) = x`. Always used on the output layer of a regressor.
    Identity,
    /// Logistic sigmoid `f(x) = 1 / (1 + exp(-x))`.
    Logistic,
    Tanh,
    #[default]
    ReLU,
}

impl Activation {
    #[inline]
    pub(crate) fn forward(self, x: f32) -> f32 {
        match self {
            Activation::Identity => x,
            Activation::Logistic => logistic(x),
            Activation::Tanh => x.tanh(),
            Activation::ReLU => x.max(0.0),
        }
    }

    /// Derivative with respect to the pre-activation, from the cached output `y`.
    #[inline]
    pub(crate) fn grad_from_output(self, y: f32) -> f32 {
        match self {
            Activation::Identity => 1.0,
            Activation::Logistic => y * (1.0 - y),
            Activation::Tanh => 1.0 - y * y,
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Glorot-uniform scale factor: the init bound is `sqrt(factor / (fan_in + fan_out))`.
    #[inline]
    pub(crate) fn glorot_factor(self) -> f32 {
        match self {
            Activation::Logistic => 2.0,
            Activation::Identity | Activation::Tanh | Activation::ReLU => 6.0,
        }
    }
}

#[inline]
fn logistic(x: f32) -> f32 {
    // Numerically stable.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}
