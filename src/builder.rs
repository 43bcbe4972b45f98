//! Model builder.
//!
//! `MlpBuilder` makes the network structure explicit (layer sizes + activations) and
//! draws every parameter from one RNG in layer order, so the same seed always produces
//! the same network.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Error, Layer, Mlp, Result};

#[derive(Debug, Clone, Copy)]
struct LayerSpec {
    out_dim: usize,
    activation: Activation,
    /// Activation whose Glorot factor scales the initial values.
    init: Activation,
}

/// Builder for an `Mlp`.
///
/// ```rust
/// use constrained_regression::{Activation, MlpBuilder};
///
/// # fn main() -> constrained_regression::Result<()> {
/// let mlp = MlpBuilder::new(3)?
///     .add_layer(8, Activation::ReLU)?
///     .add_layer(1, Activation::Identity)?
///     .build_with_seed(0)?;
/// assert_eq!(mlp.num_layers(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MlpBuilder {
    input_dim: usize,
    layers: Vec<LayerSpec>,
}

impl MlpBuilder {
    /// Start building an MLP that accepts inputs of length `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            layers: Vec::new(),
        })
    }

    /// Regression network: `hidden_layer_sizes` with `activation`, then an identity output
    /// layer of width `output_dim`.
    pub fn regressor(
        input_dim: usize,
        hidden_layer_sizes: &[usize],
        activation: Activation,
        output_dim: usize,
    ) -> Result<Self> {
        if hidden_layer_sizes.contains(&0) {
            return Err(Error::InvalidConfig(format!(
                "hidden_layer_sizes must be > 0, got {hidden_layer_sizes:?}"
            )));
        }

        let mut b = Self::new(input_dim)?;
        for &units in hidden_layer_sizes {
            b = b.add_layer(units, activation)?;
        }
        // The output layer is initialized at the hidden activation's scale.
        b = b.add_layer(output_dim, Activation::Identity)?;
        if let Some(last) = b.layers.last_mut() {
            last.init = activation;
        }
        Ok(b)
    }

    /// Add a dense layer with `out_dim` outputs.
    pub fn add_layer(mut self, out_dim: usize, activation: Activation) -> Result<Self> {
        if out_dim == 0 {
            return Err(Error::InvalidConfig("layer out_dim must be > 0".to_owned()));
        }

        self.layers.push(LayerSpec {
            out_dim,
            activation,
            init: activation,
        });
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Mlp> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Mlp> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig(
                "mlp must have at least one layer".to_owned(),
            ));
        }

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut in_dim = self.input_dim;
        for spec in self.layers {
            layers.push(Layer::glorot_with_rng(
                in_dim,
                spec.out_dim,
                spec.activation,
                spec.init,
                rng,
            )?);
            in_dim = spec.out_dim;
        }

        Ok(Mlp::from_layers(layers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regressor_layout_ends_in_identity() {
        let mlp = MlpBuilder::regressor(4, &[5, 3], Activation::Tanh, 2)
            .unwrap()
            .build_with_seed(1)
            .unwrap();

        assert_eq!(mlp.input_dim(), 4);
        assert_eq!(mlp.output_dim(), 2);
        assert_eq!(mlp.num_layers(), 3);
        assert_eq!(mlp.layer(0).unwrap().activation(), Activation::Tanh);
        assert_eq!(mlp.layer(2).unwrap().activation(), Activation::Identity);
    }

    #[test]
    fn output_layer_uses_the_hidden_init_scale() {
        // Logistic's factor 2 bounds the 4 -> 1 output layer by sqrt(2 / 5).
        let bound = (2.0_f32 / 5.0).sqrt();
        for seed in 0..20 {
            let mlp = MlpBuilder::regressor(3, &[4], Activation::Logistic, 1)
                .unwrap()
                .build_with_seed(seed)
                .unwrap();
            let out = mlp.layer(1).unwrap();
            assert_eq!(out.activation(), Activation::Identity);
            assert!(out.weights().iter().chain(out.biases()).all(|v| v.abs() <= bound));
        }
    }

    #[test]
    fn zero_hidden_units_are_rejected() {
        let err = MlpBuilder::regressor(4, &[5, 0], Activation::ReLU, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(msg) if msg.contains("hidden_layer_sizes")));
    }

    #[test]
    fn no_hidden_layers_is_a_linear_model() {
        let mlp = MlpBuilder::regressor(3, &[], Activation::ReLU, 1)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        assert_eq!(mlp.num_layers(), 1);
        assert_eq!(mlp.layer(0).unwrap().in_dim(), 3);
    }
}
