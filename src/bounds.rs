//! Per-feature coefficient bounds.
//!
//! A `CoefficientBounds` holds one `[min, max]` interval per input feature. For an MLP the
//! interval of feature `i` is broadcast over column `i` of the first weight matrix, so every
//! hidden unit's weight from that feature is kept inside it; deeper layers are never
//! constrained. For a linear model the interval applies to the feature's single
//! coefficient.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Mlp, Result};

/// Lower/upper coefficient bound per input feature.
///
/// Invariants, checked on construction: equal lengths, no NaN, `min[i] <= max[i]`.
/// Infinite values mean "unbounded on that side".
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientBounds {
    min: Vec<f32>,
    max: Vec<f32>,
}

impl CoefficientBounds {
    pub fn new(min: Vec<f32>, max: Vec<f32>) -> Result<Self> {
        if min.len() != max.len() {
            return Err(Error::InvalidBounds(format!(
                "min has {} entries but max has {}",
                min.len(),
                max.len()
            )));
        }
        if min.is_empty() {
            return Err(Error::InvalidBounds(
                "bounds must cover at least one feature".to_owned(),
            ));
        }
        for (i, (&lo, &hi)) in min.iter().zip(&max).enumerate() {
            if lo.is_nan() || hi.is_nan() {
                return Err(Error::InvalidBounds(format!("feature {i} has a NaN bound")));
            }
            if lo > hi {
                return Err(Error::InvalidBounds(format!(
                    "feature {i} has min {lo} greater than max {hi}"
                )));
            }
        }
        Ok(Self { min, max })
    }

    /// `(-inf, +inf)` for each of `n_features` features.
    pub fn unbounded(n_features: usize) -> Self {
        Self {
            min: vec![f32::NEG_INFINITY; n_features],
            max: vec![f32::INFINITY; n_features],
        }
    }

    /// Build bounds for `n_features` features from optional sides.
    ///
    /// A missing side defaults to `-inf` (min) or `+inf` (max). A provided side must have
    /// exactly `n_features` entries.
    pub fn from_options(
        n_features: usize,
        min: Option<&[f32]>,
        max: Option<&[f32]>,
    ) -> Result<Self> {
        let side = |values: Option<&[f32]>, default: f32, name: &str| -> Result<Vec<f32>> {
            match values {
                None => Ok(vec![default; n_features]),
                Some(v) if v.len() == n_features => Ok(v.to_vec()),
                Some(v) => Err(Error::InvalidShape(format!(
                    "{name} has {} entries, expected one per feature ({n_features})",
                    v.len()
                ))),
            }
        };
        Self::new(
            side(min, f32::NEG_INFINITY, "min_coef")?,
            side(max, f32::INFINITY, "max_coef")?,
        )
    }

    /// Same bounds with every lower bound raised to at least zero.
    ///
    /// Errors if a feature's upper bound is negative, since the interval would be empty.
    pub fn nonnegative(mut self) -> Result<Self> {
        for (i, (lo, &hi)) in self.min.iter_mut().zip(&self.max).enumerate() {
            if hi < 0.0 {
                return Err(Error::InvalidBounds(format!(
                    "feature {i} has max {hi} < 0, incompatible with nonnegative coefficients"
                )));
            }
            *lo = lo.max(0.0);
        }
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.min.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.is_empty()
    }

    #[inline]
    pub fn min(&self) -> &[f32] {
        &self.min
    }

    #[inline]
    pub fn max(&self) -> &[f32] {
        &self.max
    }

    /// True when no feature has a finite bound.
    pub fn is_unbounded(&self) -> bool {
        self.min.iter().all(|v| *v == f32::NEG_INFINITY)
            && self.max.iter().all(|v| *v == f32::INFINITY)
    }

    #[inline]
    pub fn clamp(&self, feature: usize, value: f32) -> f32 {
        value.clamp(self.min[feature], self.max[feature])
    }

    /// Returns true if `value` lies inside feature `feature`'s interval.
    #[inline]
    pub fn contains(&self, feature: usize, value: f32) -> bool {
        (self.min[feature]..=self.max[feature]).contains(&value)
    }
}

/// A projection applied to the network after every optimizer step.
pub trait WeightConstraint {
    /// Validate against the network input width before training starts.
    fn check(&self, input_dim: usize) -> Result<()>;

    /// Project the parameters back into the feasible set.
    fn apply(&self, mlp: &mut Mlp);
}

/// No-op constraint used by the plain regressor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconstrained;

impl WeightConstraint for Unconstrained {
    #[inline]
    fn check(&self, _input_dim: usize) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn apply(&self, _mlp: &mut Mlp) {}
}

impl WeightConstraint for CoefficientBounds {
    fn check(&self, input_dim: usize) -> Result<()> {
        if self.len() != input_dim {
            return Err(Error::InvalidShape(format!(
                "bounds cover {} features, data has {input_dim}",
                self.len()
            )));
        }
        Ok(())
    }

    #[inline]
    fn apply(&self, mlp: &mut Mlp) {
        mlp.first_layer_mut()
            .clamp_input_weights(&self.min, &self.max);
    }
}

/// JSON-friendly form: `null` stands for an infinite bound.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedBounds {
    pub min: Vec<Option<f32>>,
    pub max: Vec<Option<f32>>,
}

impl From<&CoefficientBounds> for SerializedBounds {
    fn from(b: &CoefficientBounds) -> Self {
        let finite = |v: &f32| v.is_finite().then_some(*v);
        Self {
            min: b.min.iter().map(finite).collect(),
            max: b.max.iter().map(finite).collect(),
        }
    }
}

impl TryFrom<SerializedBounds> for CoefficientBounds {
    type Error = Error;

    fn try_from(value: SerializedBounds) -> Result<Self> {
        CoefficientBounds::new(
            value
                .min
                .into_iter()
                .map(|v| v.unwrap_or(f32::NEG_INFINITY))
                .collect(),
            value
                .max
                .into_iter()
                .map(|v| v.unwrap_or(f32::INFINITY))
                .collect(),
        )
    }
}
