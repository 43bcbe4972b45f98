//! MLP regressors.
//!
//! [`ConstrainedMlpRegressor`] keeps the weights leaving each input feature inside that
//! feature's `[min, max]` interval for the whole of training. [`MlpRegressor`] is the same
//! model and loop with no projection step; it is the baseline the constrained model
//! reduces to when every bound is infinite and shuffling is off.

use crate::bounds::{CoefficientBounds, Unconstrained, WeightConstraint};
use crate::train::{FitMode, FitReport, FittedMlp, MlpParams, fit_stochastic};
use crate::{Dataset, Error, Inputs, Mlp, Result};

/// Multi-layer perceptron regressor trained with SGD or Adam.
#[derive(Debug, Clone, Default)]
pub struct MlpRegressor {
    params: MlpParams,
    fitted: Option<FittedMlp>,
    report: Option<FitReport>,
}

impl MlpRegressor {
    pub fn new(params: MlpParams) -> Self {
        Self {
            params,
            fitted: None,
            report: None,
        }
    }

    #[inline]
    pub fn params(&self) -> &MlpParams {
        &self.params
    }

    /// Mutable access for tuning between fits (e.g. flipping `warm_start`).
    #[inline]
    pub fn params_mut(&mut self) -> &mut MlpParams {
        &mut self.params
    }

    /// Train from scratch (or from the previous fit when `warm_start` is set).
    pub fn fit(&mut self, data: &Dataset) -> Result<&FitReport> {
        let result = fit_stochastic(
            &mut self.fitted,
            &self.params,
            data,
            &Unconstrained,
            self.params.shuffle,
            FitMode::Full,
        );
        if self.fitted.is_none() {
            self.report = None;
        }
        Ok(self.report.insert(result?))
    }

    /// One epoch over `data`, continuing from the current state.
    pub fn partial_fit(&mut self, data: &Dataset) -> Result<&FitReport> {
        let result = fit_stochastic(
            &mut self.fitted,
            &self.params,
            data,
            &Unconstrained,
            self.params.shuffle,
            FitMode::Incremental,
        );
        if self.fitted.is_none() {
            self.report = None;
        }
        Ok(self.report.insert(result?))
    }

    pub fn predict(&self, inputs: &Inputs) -> Result<Vec<f32>> {
        self.fitted()?.predict(inputs)
    }

    /// Coefficient of determination on `data`.
    pub fn score(&self, data: &Dataset) -> Result<f32> {
        self.fitted()?.score(data)
    }

    pub fn fitted(&self) -> Result<&FittedMlp> {
        self.fitted.as_ref().ok_or(Error::NotFitted)
    }

    pub fn mlp(&self) -> Result<&Mlp> {
        self.fitted().map(FittedMlp::mlp)
    }

    pub fn coefs(&self) -> Result<Vec<&[f32]>> {
        self.fitted().map(FittedMlp::coefs)
    }

    pub fn intercepts(&self) -> Result<Vec<&[f32]>> {
        self.fitted().map(FittedMlp::intercepts)
    }

    pub fn loss_curve(&self) -> Result<&[f32]> {
        self.fitted().map(FittedMlp::loss_curve)
    }

    pub fn n_iter(&self) -> Result<usize> {
        self.fitted().map(FittedMlp::n_iter)
    }

    /// Report of the latest `fit` / `partial_fit`.
    #[inline]
    pub fn report(&self) -> Option<&FitReport> {
        self.report.as_ref()
    }
}

/// MLP regressor whose first-layer weights respect per-feature coefficient bounds.
///
/// After every optimizer update the weight from input `i` to every hidden unit is clipped
/// into `[min_coef[i], max_coef[i]]`. Samples are visited in the order they were given, so
/// with a fixed seed the fit is reproducible.
///
/// ```
/// use constrained_regression::{ConstrainedMlpRegressor, Dataset, MlpParams};
///
/// # fn main() -> constrained_regression::Result<()> {
/// let xs: Vec<f32> = (0..40).map(|i| i as f32 / 40.0).collect();
/// let ys: Vec<f32> = xs.iter().map(|x| 3.0 * x).collect();
/// let data = Dataset::from_flat_1d(xs, ys, 1)?;
///
/// let mut model = ConstrainedMlpRegressor::new(MlpParams {
///     hidden_layer_sizes: vec![8],
///     max_iter: 50,
///     ..MlpParams::default()
/// });
/// model.fit(&data, Some(&[0.0]), None)?;
///
/// let first = model.mlp()?.layer(0).unwrap();
/// assert!(first.weights().iter().all(|w| *w >= 0.0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConstrainedMlpRegressor {
    params: MlpParams,
    bounds: Option<CoefficientBounds>,
    fitted: Option<FittedMlp>,
    report: Option<FitReport>,
}

impl ConstrainedMlpRegressor {
    pub fn new(params: MlpParams) -> Self {
        Self {
            params,
            bounds: None,
            fitted: None,
            report: None,
        }
    }

    #[inline]
    pub fn params(&self) -> &MlpParams {
        &self.params
    }

    #[inline]
    pub fn params_mut(&mut self) -> &mut MlpParams {
        &mut self.params
    }

    /// Fit with optional per-feature bounds.
    ///
    /// A missing `min_coef` means `-inf` for every feature, a missing `max_coef` means
    /// `+inf`. A provided side must have one entry per input feature.
    pub fn fit(
        &mut self,
        data: &Dataset,
        min_coef: Option<&[f32]>,
        max_coef: Option<&[f32]>,
    ) -> Result<&FitReport> {
        let bounds = CoefficientBounds::from_options(data.input_dim(), min_coef, max_coef)?;
        self.fit_with_bounds(data, bounds)
    }

    pub fn fit_with_bounds(
        &mut self,
        data: &Dataset,
        bounds: CoefficientBounds,
    ) -> Result<&FitReport> {
        bounds.check(data.input_dim())?;
        tracing::debug!(
            n_features = bounds.len(),
            unbounded = bounds.is_unbounded(),
            "fitting constrained mlp"
        );
        let result = fit_stochastic(
            &mut self.fitted,
            &self.params,
            data,
            &bounds,
            false,
            FitMode::Full,
        );
        self.settle(result, bounds)
    }

    /// One epoch over `data` under the bounds of the previous fit (unbounded if none).
    pub fn partial_fit(&mut self, data: &Dataset) -> Result<&FitReport> {
        let bounds = match &self.bounds {
            Some(b) => b.clone(),
            None => CoefficientBounds::unbounded(data.input_dim()),
        };
        let result = fit_stochastic(
            &mut self.fitted,
            &self.params,
            data,
            &bounds,
            false,
            FitMode::Incremental,
        );
        self.settle(result, bounds)
    }

    /// Pair the outcome of a fit with its bounds; a lost network takes its bounds with it.
    fn settle(
        &mut self,
        result: Result<FitReport>,
        bounds: CoefficientBounds,
    ) -> Result<&FitReport> {
        if self.fitted.is_none() {
            self.bounds = None;
            self.report = None;
        }
        let report = result?;
        self.bounds = Some(bounds);
        Ok(self.report.insert(report))
    }

    pub fn predict(&self, inputs: &Inputs) -> Result<Vec<f32>> {
        self.fitted()?.predict(inputs)
    }

    pub fn score(&self, data: &Dataset) -> Result<f32> {
        self.fitted()?.score(data)
    }

    pub fn fitted(&self) -> Result<&FittedMlp> {
        self.fitted.as_ref().ok_or(Error::NotFitted)
    }

    pub fn mlp(&self) -> Result<&Mlp> {
        self.fitted().map(FittedMlp::mlp)
    }

    pub fn coefs(&self) -> Result<Vec<&[f32]>> {
        self.fitted().map(FittedMlp::coefs)
    }

    pub fn intercepts(&self) -> Result<Vec<&[f32]>> {
        self.fitted().map(FittedMlp::intercepts)
    }

    pub fn loss_curve(&self) -> Result<&[f32]> {
        self.fitted().map(FittedMlp::loss_curve)
    }

    pub fn n_iter(&self) -> Result<usize> {
        self.fitted().map(FittedMlp::n_iter)
    }

    /// Bounds in force for the fitted model.
    #[inline]
    pub fn bounds(&self) -> Option<&CoefficientBounds> {
        self.bounds.as_ref()
    }

    #[inline]
    pub fn report(&self) -> Option<&FitReport> {
        self.report.as_ref()
    }

    /// Reassemble a fitted regressor after deserialization.
    #[cfg(feature = "serde")]
    pub(crate) fn from_fitted(
        params: MlpParams,
        bounds: CoefficientBounds,
        fitted: FittedMlp,
    ) -> Result<Self> {
        bounds.check(fitted.mlp().input_dim())?;
        Ok(Self {
            params,
            bounds: Some(bounds),
            fitted: Some(fitted),
            report: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Activation, Optimizer};

    fn data() -> Dataset {
        let xs: Vec<f32> = (0..30)
            .flat_map(|i| {
                let a = i as f32 / 30.0;
                [a, 1.0 - a]
            })
            .collect();
        let ys: Vec<f32> = xs.chunks(2).map(|r| r[0] - 2.0 * r[1]).collect();
        Dataset::from_flat_1d(xs, ys, 2).unwrap()
    }

    fn params() -> MlpParams {
        MlpParams {
            hidden_layer_sizes: vec![5],
            activation: Activation::Tanh,
            max_iter: 30,
            learning_rate_init: 0.01,
            ..MlpParams::default()
        }
    }

    #[test]
    fn unfitted_models_report_not_fitted() {
        let model = ConstrainedMlpRegressor::new(params());
        let inputs = Inputs::from_flat(vec![0.0, 0.0], 2).unwrap();
        assert_eq!(model.predict(&inputs).unwrap_err(), Error::NotFitted);
        assert!(model.mlp().is_err());
        assert!(model.bounds().is_none());

        let baseline = MlpRegressor::new(params());
        assert_eq!(baseline.score(&data()).unwrap_err(), Error::NotFitted);
    }

    #[test]
    fn bounds_hold_for_every_first_layer_weight() {
        let mut model = ConstrainedMlpRegressor::new(params());
        model
            .fit(&data(), Some(&[0.0, -0.1]), Some(&[0.2, 0.0]))
            .unwrap();

        let first = model.mlp().unwrap().layer(0).unwrap();
        assert!(first.input_weights(0).all(|w| (0.0..=0.2).contains(&w)));
        assert!(first.input_weights(1).all(|w| (-0.1..=0.0).contains(&w)));
        assert_eq!(model.bounds().unwrap().len(), 2);
    }

    #[test]
    fn bound_length_mismatch_is_rejected_before_training() {
        let mut model = ConstrainedMlpRegressor::new(params());
        let err = model.fit(&data(), Some(&[0.0]), None).unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
        assert!(model.fitted().is_err());
    }

    #[test]
    fn unbounded_matches_unshuffled_baseline() {
        for optimizer in [Optimizer::default(), Optimizer::sgd()] {
            let p = MlpParams {
                optimizer,
                shuffle: false,
                ..params()
            };
            let mut constrained = ConstrainedMlpRegressor::new(p.clone());
            let mut baseline = MlpRegressor::new(p);
            constrained.fit(&data(), None, None).unwrap();
            baseline.fit(&data()).unwrap();

            let a = constrained.mlp().unwrap();
            let b = baseline.mlp().unwrap();
            for (la, lb) in a.layers().iter().zip(b.layers()) {
                assert_eq!(la.weights(), lb.weights());
                assert_eq!(la.biases(), lb.biases());
            }
            assert_eq!(
                constrained.fitted().unwrap().loss_curve(),
                baseline.fitted().unwrap().loss_curve()
            );
        }
    }

    #[test]
    fn partial_fit_keeps_previous_bounds() {
        let mut model = ConstrainedMlpRegressor::new(params());
        model.fit(&data(), Some(&[0.0, 0.0]), None).unwrap();
        let n_iter = model.n_iter().unwrap();

        model.partial_fit(&data()).unwrap();
        assert_eq!(model.n_iter().unwrap(), n_iter + 1);
        assert_eq!(model.loss_curve().unwrap().len(), n_iter + 1);
        assert_eq!(model.coefs().unwrap().len(), 2);
        assert_eq!(model.intercepts().unwrap()[0].len(), 5);
        let first = model.mlp().unwrap().layer(0).unwrap();
        assert!(first.weights().iter().all(|w| *w >= 0.0));
    }

    #[test]
    fn divergent_fit_leaves_the_model_unfitted() {
        let mut model = ConstrainedMlpRegressor::new(params());
        model.fit(&data(), Some(&[0.0, 0.0]), None).unwrap();

        let xs: Vec<f32> = (0..20).flat_map(|i| [i as f32 * 1e6, 1e6]).collect();
        let ys: Vec<f32> = (0..20).map(|i| i as f32 * 1e6).collect();
        let huge = Dataset::from_flat_1d(xs, ys, 2).unwrap();
        *model.params_mut() = MlpParams {
            activation: Activation::Identity,
            optimizer: Optimizer::sgd(),
            learning_rate_init: 10.0,
            n_iter_no_change: 100,
            max_iter: 50,
            ..params()
        };

        let err = model.fit(&huge, None, None).unwrap_err();
        assert_eq!(err, Error::NonFiniteParameters);
        assert_eq!(model.fitted().unwrap_err(), Error::NotFitted);
        assert!(model.bounds().is_none());
        assert!(model.report().is_none());
        let inputs = Inputs::from_flat(vec![0.0, 0.0], 2).unwrap();
        assert_eq!(model.predict(&inputs).unwrap_err(), Error::NotFitted);

        let mut baseline = MlpRegressor::new(model.params().clone());
        assert_eq!(baseline.fit(&huge).unwrap_err(), Error::NonFiniteParameters);
        assert_eq!(baseline.fitted().unwrap_err(), Error::NotFitted);
    }

    #[test]
    fn partial_fit_on_fresh_model_is_unbounded() {
        let mut model = ConstrainedMlpRegressor::new(params());
        let report = model.partial_fit(&data()).unwrap();
        assert_eq!(report.n_iter, 1);
        assert!(model.bounds().unwrap().is_unbounded());
    }
}
