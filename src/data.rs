//! Contiguous dataset helpers.
//!
//! Feature matrices are stored row-major so a training step can walk a mini-batch as a
//! sequence of slices. `Inputs` holds X only (prediction); `Dataset` pairs X with targets.

use std::ops::Range;

use rand::Rng;
use rand::seq::index;

use crate::{Error, Result};

/// A collection of input samples (X).
///
/// Stored as a contiguous buffer with row-major layout:
/// - `inputs.len() == len * input_dim`
#[derive(Debug, Clone)]
pub struct Inputs {
    inputs: Vec<f32>,
    len: usize,
    input_dim: usize,
}

impl Inputs {
    /// Build inputs from a flat buffer with shape `(len, input_dim)`.
    pub fn from_flat(inputs: Vec<f32>, input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidData("input_dim must be > 0".to_owned()));
        }
        if !inputs.len().is_multiple_of(input_dim) {
            return Err(Error::InvalidData(format!(
                "inputs length {} is not divisible by input_dim {}",
                inputs.len(),
                input_dim
            )));
        }

        let len = inputs.len() / input_dim;

        Ok(Self {
            inputs,
            len,
            input_dim,
        })
    }

    /// Build inputs from per-sample rows (copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f32>]) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::InvalidData("inputs must not be empty".to_owned()));
        }

        let input_dim = inputs[0].len();
        if input_dim == 0 {
            return Err(Error::InvalidData("input_dim must be > 0".to_owned()));
        }

        for (i, row) in inputs.iter().enumerate() {
            if row.len() != input_dim {
                return Err(Error::InvalidData(format!(
                    "input row {i} has len {}, expected {input_dim}",
                    row.len()
                )));
            }
        }

        Ok(Self {
            inputs: inputs.concat(),
            len: inputs.len(),
            input_dim,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Returns the `idx`-th input row (shape: `(input_dim,)`).
    ///
    /// Panics if `idx >= len`.
    #[inline]
    pub fn input(&self, idx: usize) -> &[f32] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    /// Flat row-major view of all samples.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.inputs
    }

    /// Returns an error if any value is NaN or infinite.
    pub fn validate_finite(&self) -> Result<()> {
        if let Some(pos) = self.inputs.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidData(format!(
                "input contains a non-finite value at row {} column {}",
                pos / self.input_dim,
                pos % self.input_dim
            )));
        }
        Ok(())
    }
}

/// A supervised dataset: inputs (X) and targets (Y).
///
/// Stored as contiguous buffers with row-major layout:
/// - `inputs.len() == len * input_dim`
/// - `targets.len() == len * target_dim`
#[derive(Debug, Clone)]
pub struct Dataset {
    inputs: Inputs,
    targets: Vec<f32>,
    target_dim: usize,
}

impl Dataset {
    /// Build a dataset from flat buffers.
    ///
    /// `inputs` is `(len, input_dim)` and `targets` is `(len, target_dim)`.
    pub fn from_flat(
        inputs: Vec<f32>,
        targets: Vec<f32>,
        input_dim: usize,
        target_dim: usize,
    ) -> Result<Self> {
        let inputs = Inputs::from_flat(inputs, input_dim)?;
        if target_dim == 0 {
            return Err(Error::InvalidData("target_dim must be > 0".to_owned()));
        }

        if targets.len() != inputs.len() * target_dim {
            return Err(Error::InvalidData(format!(
                "targets length {} does not match len * target_dim ({} * {})",
                targets.len(),
                inputs.len(),
                target_dim
            )));
        }

        Ok(Self {
            inputs,
            targets,
            target_dim,
        })
    }

    /// Build a single-target dataset from a flat `(len, input_dim)` buffer and a target vector.
    pub fn from_flat_1d(inputs: Vec<f32>, targets: Vec<f32>, input_dim: usize) -> Result<Self> {
        Self::from_flat(inputs, targets, input_dim, 1)
    }

    /// Build a dataset from per-sample rows (copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }

        let inputs = Inputs::from_rows(inputs)?;
        let target_dim = targets.first().map(|t| t.len()).unwrap_or(0);
        if target_dim == 0 {
            return Err(Error::InvalidData("target_dim must be > 0".to_owned()));
        }
        for (i, row) in targets.iter().enumerate() {
            if row.len() != target_dim {
                return Err(Error::InvalidData(format!(
                    "target row {i} has len {}, expected {target_dim}",
                    row.len()
                )));
            }
        }

        Ok(Self {
            inputs,
            targets: targets.concat(),
            target_dim,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.inputs.input_dim()
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    #[inline]
    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    /// Returns the `idx`-th input row. Panics if `idx >= len`.
    #[inline]
    pub fn input(&self, idx: usize) -> &[f32] {
        self.inputs.input(idx)
    }

    /// Returns the `idx`-th target row. Panics if `idx >= len`.
    #[inline]
    pub fn target(&self, idx: usize) -> &[f32] {
        let start = idx * self.target_dim;
        &self.targets[start..start + self.target_dim]
    }

    /// Flat row-major view of all targets.
    #[inline]
    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    /// Checks that the dataset is non-empty and contains only finite values.
    pub fn validate_for_fit(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidData(
                "train dataset must not be empty".to_owned(),
            ));
        }
        self.inputs.validate_finite()?;
        if self.targets.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "targets must contain only finite values".to_owned(),
            ));
        }
        Ok(())
    }

    /// Copy the rows at `indices` (in the given order) into a new dataset.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        let mut inputs = Vec::with_capacity(indices.len() * self.input_dim());
        let mut targets = Vec::with_capacity(indices.len() * self.target_dim);
        for &idx in indices {
            inputs.extend_from_slice(self.input(idx));
            targets.extend_from_slice(self.target(idx));
        }
        Dataset {
            inputs: Inputs {
                inputs,
                len: indices.len(),
                input_dim: self.input_dim(),
            },
            targets,
            target_dim: self.target_dim,
        }
    }

    /// Hold out `fraction` of the samples (rounded, at least one) for validation.
    ///
    /// Validation rows are drawn with `rng`. Both halves keep the original relative order
    /// of their rows, so an order-sensitive training loop still sees the samples in the
    /// sequence they were given.
    ///
    /// Returns `(train, validation)`.
    pub fn split_validation<R: Rng + ?Sized>(
        &self,
        fraction: f32,
        rng: &mut R,
    ) -> Result<(Dataset, Dataset)> {
        if !(fraction.is_finite() && fraction > 0.0 && fraction < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "validation_fraction must be in (0, 1), got {fraction}"
            )));
        }
        let n = self.len();
        let n_val = ((n as f32) * fraction).round().max(1.0) as usize;
        if n_val >= n {
            return Err(Error::InvalidData(format!(
                "cannot hold out {n_val} of {n} samples for validation"
            )));
        }

        let mut is_val = vec![false; n];
        for idx in index::sample(rng, n, n_val).iter() {
            is_val[idx] = true;
        }

        let (val_idx, train_idx): (Vec<usize>, Vec<usize>) = (0..n).partition(|&i| is_val[i]);
        Ok((self.select(&train_idx), self.select(&val_idx)))
    }
}

/// Split `0..n` into consecutive ranges of at most `batch_size` samples.
///
/// The last batch holds the remainder. Panics if `batch_size == 0`.
pub fn batches(n: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    assert!(batch_size > 0, "batch_size must be > 0");
    (0..n)
        .step_by(batch_size)
        .map(move |start| start..(start + batch_size).min(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn dataset_from_flat_validates_shapes() {
        let ok = Dataset::from_flat(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0], 2, 1);
        assert!(ok.is_ok());

        let err = Dataset::from_flat(vec![0.0, 1.0, 2.0], vec![0.0], 2, 1);
        assert!(err.is_err());
    }

    #[test]
    fn non_finite_values_are_rejected_for_fit() {
        let data = Dataset::from_flat_1d(vec![0.0, f32::NAN], vec![1.0], 2).unwrap();
        assert!(matches!(
            data.validate_for_fit(),
            Err(Error::InvalidData(_))
        ));

        let data = Dataset::from_flat_1d(vec![0.0, 1.0], vec![f32::INFINITY], 2).unwrap();
        assert!(data.validate_for_fit().is_err());
    }

    #[test]
    fn batches_preserve_order_and_cover_everything() {
        let got: Vec<_> = batches(7, 3).collect();
        assert_eq!(got, vec![0..3, 3..6, 6..7]);

        let got: Vec<_> = batches(4, 10).collect();
        assert_eq!(got, vec![0..4]);
    }

    #[test]
    fn validation_split_keeps_relative_order() {
        let xs: Vec<f32> = (0..20).map(|i| i as f32).collect();
        let ys = xs.clone();
        let data = Dataset::from_flat_1d(xs, ys, 1).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let (train, val) = data.split_validation(0.2, &mut rng).unwrap();
        assert_eq!(train.len(), 16);
        assert_eq!(val.len(), 4);

        let train_x = train.inputs().as_slice();
        assert!(train_x.windows(2).all(|w| w[0] < w[1]));
        let val_x = val.inputs().as_slice();
        assert!(val_x.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn validation_split_rejects_degenerate_fractions() {
        let data = Dataset::from_flat_1d(vec![0.0, 1.0], vec![0.0, 1.0], 1).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(data.split_validation(0.0, &mut rng).is_err());
        assert!(data.split_validation(1.0, &mut rng).is_err());
        assert!(data.split_validation(0.9, &mut rng).is_err());
    }
}
