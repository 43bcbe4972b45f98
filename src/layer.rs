use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::{Activation, Error, Result};

/// Fully-connected layer `y = activation(W x + b)`.
#[derive(Debug, Clone)]
pub struct Layer {
    in_dim: usize,
    out_dim: usize,
    activation: Activation,
    /// Row-major matrix with shape (out_dim, in_dim).
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl Layer {
    /// Glorot-uniform initialization of both weights and biases.
    ///
    /// Values are drawn from `U(-b, b)` with `b = sqrt(factor / (in_dim + out_dim))`,
    /// where `factor` depends on `activation` (2 for logistic, 6 otherwise). Weights are
    /// drawn first (row by row), then biases, so a given seed always yields the same layer.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        Self::glorot_with_rng(in_dim, out_dim, activation, activation, rng)
    }

    /// Like [`Layer::new_with_rng`], but the Glorot factor comes from `init` instead of
    /// the layer's own activation.
    pub fn glorot_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        init: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }

        let bound = (init.glorot_factor() / (in_dim + out_dim) as f32).sqrt();
        let dist = Uniform::new(-bound, bound);

        let weights = (0..in_dim * out_dim).map(|_| dist.sample(rng)).collect();
        let biases = (0..out_dim).map(|_| dist.sample(rng)).collect();

        Ok(Self {
            in_dim,
            out_dim,
            activation,
            weights,
            biases,
        })
    }

    /// Build a layer from explicit parameters.
    ///
    /// Validates shapes and that every parameter is finite.
    pub fn from_parts(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidShape(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        if weights.len() != in_dim * out_dim {
            return Err(Error::InvalidShape(format!(
                "weights length {} does not match out_dim * in_dim ({out_dim} * {in_dim})",
                weights.len()
            )));
        }
        if biases.len() != out_dim {
            return Err(Error::InvalidShape(format!(
                "biases length {} does not match out_dim {out_dim}",
                biases.len()
            )));
        }
        let layer = Self {
            in_dim,
            out_dim,
            activation,
            weights,
            biases,
        };
        if !layer.is_finite() {
            return Err(Error::NonFiniteParameters);
        }
        Ok(layer)
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Row-major `(out_dim, in_dim)` weights.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    #[inline]
    pub fn biases_mut(&mut self) -> &mut [f32] {
        &mut self.biases
    }

    /// Weight connecting input `input` to unit `unit`.
    #[inline]
    pub fn weight(&self, input: usize, unit: usize) -> f32 {
        self.weights[unit * self.in_dim + input]
    }

    /// Weights leaving input `input`, one per unit (a column of the weight matrix).
    pub fn input_weights(&self, input: usize) -> impl Iterator<Item = f32> + '_ {
        assert!(input < self.in_dim, "input {input} out of range");
        self.weights
            .iter()
            .skip(input)
            .step_by(self.in_dim)
            .copied()
    }

    pub fn is_finite(&self) -> bool {
        self.weights.iter().chain(&self.biases).all(|v| v.is_finite())
    }

    /// Forward pass for a single sample.
    ///
    /// Shape contract:
    /// - `inputs.len() == self.in_dim`
    /// - `outputs.len() == self.out_dim`
    #[inline]
    pub fn forward(&self, inputs: &[f32], outputs: &mut [f32]) {
        debug_assert_eq!(inputs.len(), self.in_dim);
        debug_assert_eq!(outputs.len(), self.out_dim);

        for (o, out) in outputs.iter_mut().enumerate() {
            let row = &self.weights[o * self.in_dim..(o + 1) * self.in_dim];
            let mut sum = self.biases[o];
            for (&w, &x) in row.iter().zip(inputs) {
                sum = w.mul_add(x, sum);
            }
            *out = self.activation.forward(sum);
        }
    }

    /// Backward pass for a single sample.
    ///
    /// Accumulate semantics for parameters, overwrite semantics for inputs:
    /// - `d_weights` and `d_biases` are added to, so a mini-batch can be summed in place
    /// - `d_inputs` is overwritten
    ///
    /// `outputs` are the post-activation values produced by `forward` for the same
    /// `inputs`, and `d_outputs` is the upstream gradient dL/d(outputs).
    #[inline]
    pub fn backward(
        &self,
        inputs: &[f32],
        outputs: &[f32],
        d_outputs: &[f32],
        d_inputs: &mut [f32],
        d_weights: &mut [f32],
        d_biases: &mut [f32],
    ) {
        debug_assert_eq!(inputs.len(), self.in_dim);
        debug_assert_eq!(outputs.len(), self.out_dim);
        debug_assert_eq!(d_outputs.len(), self.out_dim);
        debug_assert_eq!(d_inputs.len(), self.in_dim);
        debug_assert_eq!(d_weights.len(), self.weights.len());
        debug_assert_eq!(d_biases.len(), self.out_dim);

        d_inputs.fill(0.0);

        for o in 0..self.out_dim {
            let d_z = d_outputs[o] * self.activation.grad_from_output(outputs[o]);
            d_biases[o] += d_z;

            let row = o * self.in_dim;
            for i in 0..self.in_dim {
                d_weights[row + i] = d_z.mul_add(inputs[i], d_weights[row + i]);
                d_inputs[i] = self.weights[row + i].mul_add(d_z, d_inputs[i]);
            }
        }
    }

    /// Clamp every weight leaving input `i` into `[min[i], max[i]]`.
    ///
    /// Biases are left untouched. Callers guarantee `min[i] <= max[i]` and no NaN.
    pub fn clamp_input_weights(&mut self, min: &[f32], max: &[f32]) {
        assert_eq!(min.len(), self.in_dim, "min bound len does not match in_dim");
        assert_eq!(max.len(), self.in_dim, "max bound len does not match in_dim");

        for row in self.weights.chunks_exact_mut(self.in_dim) {
            for ((w, &lo), &hi) in row.iter_mut().zip(min).zip(max) {
                *w = w.clamp(lo, hi);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn glorot_init_stays_within_bound() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = Layer::new_with_rng(4, 3, Activation::ReLU, &mut rng).unwrap();
        let bound = (6.0_f32 / 7.0).sqrt();
        assert!(
            layer
                .weights()
                .iter()
                .chain(layer.biases())
                .all(|v| v.abs() <= bound)
        );
    }

    #[test]
    fn from_parts_rejects_bad_shapes_and_non_finite() {
        assert!(Layer::from_parts(2, 1, Activation::Identity, vec![1.0], vec![0.0]).is_err());
        assert!(Layer::from_parts(2, 1, Activation::Identity, vec![1.0, 2.0], vec![]).is_err());
        assert_eq!(
            Layer::from_parts(1, 1, Activation::Identity, vec![f32::NAN], vec![0.0]).unwrap_err(),
            Error::NonFiniteParameters
        );
    }

    #[test]
    fn clamp_acts_on_input_columns() {
        // 2 units x 3 inputs.
        let mut layer = Layer::from_parts(
            3,
            2,
            Activation::Identity,
            vec![-1.0, 0.5, 9.0, 2.0, -3.0, -9.0],
            vec![-5.0, 5.0],
        )
        .unwrap();

        let inf = f32::INFINITY;
        layer.clamp_input_weights(&[0.0, -inf, -1.0], &[inf, 1.0, 1.0]);

        assert_eq!(layer.weights(), &[0.0_f32, 0.5, 1.0, 2.0, -3.0, -1.0]);
        assert_eq!(layer.biases(), &[-5.0_f32, 5.0]);
        assert_eq!(layer.input_weights(2).collect::<Vec<_>>(), vec![1.0, -1.0]);
        assert_eq!(layer.weight(1, 1), -3.0);
    }

    #[test]
    fn backward_accumulates_parameter_gradients() {
        let layer =
            Layer::from_parts(2, 1, Activation::Identity, vec![1.0, -1.0], vec![0.0]).unwrap();
        let mut out = [0.0_f32];
        let mut d_in = [0.0_f32; 2];
        let mut d_w = [0.0_f32; 2];
        let mut d_b = [0.0_f32; 1];

        for x in [[1.0_f32, 2.0], [3.0, 4.0]] {
            layer.forward(&x, &mut out);
            layer.backward(&x, &out, &[1.0], &mut d_in, &mut d_w, &mut d_b);
        }

        assert_eq!(d_w, [4.0, 6.0]);
        assert_eq!(d_b, [2.0]);
        assert_eq!(d_in, [1.0, -1.0]);
    }
}
