//! Mini-batch stochastic training.
//!
//! One loop drives both regressors. Each step runs forward/backward over a mini-batch,
//! applies the optimizer update to every parameter, and then hands the network to a
//! [`WeightConstraint`], which for the constrained regressor clips the first weight layer
//! into its coefficient bounds. Epoch bookkeeping (loss curve, plateau detection,
//! validation-based early stopping, learning-rate schedules) is shared.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bounds::WeightConstraint;
use crate::data::batches;
use crate::early_stop::{Monitor, NoImprovement};
use crate::{
    Activation, Dataset, Error, Inputs, Loss, Mlp, MlpBuilder, Optimizer, OptimizerState,
    Result, Trainer, metrics,
};

/// Upper limit of the automatic batch size.
const AUTO_BATCH_MAX: usize = 200;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchSize {
    /// `min(200, n_samples)`.
    #[default]
    Auto,
    /// Clipped into `[1, n_samples]` with a warning if out of range.
    Fixed(usize),
}

/// Cooperative stop signal, polled before every mini-batch.
///
/// Cloning shares the flag, so a clone can be handed to a signal handler or another
/// thread while the original goes into [`MlpParams::interrupt`].
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Re-arm the handle for another fit.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Hyperparameters of the MLP regressors.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct MlpParams {
    /// Width of each hidden layer; empty means a purely linear network.
    pub hidden_layer_sizes: Vec<usize>,
    /// Hidden-layer activation. The output layer is always identity.
    pub activation: Activation,
    pub optimizer: Optimizer,
    pub learning_rate_init: f32,
    /// L2 penalty on weights (not biases).
    pub alpha: f32,
    pub batch_size: BatchSize,
    /// Maximum number of epochs per `fit`.
    pub max_iter: usize,
    /// Minimum improvement of loss or validation score that resets the plateau counter.
    pub tol: f32,
    /// Number of stalled epochs tolerated before the optimizer is asked to stop.
    pub n_iter_no_change: usize,
    /// Hold out `validation_fraction` of the data and monitor R² on it.
    pub early_stopping: bool,
    pub validation_fraction: f32,
    pub loss: Loss,
    /// Seed for initialization, the validation split and (unconstrained only) shuffling.
    pub seed: u64,
    /// Shuffle samples each epoch. Ignored by the constrained regressor, which always
    /// trains in the order the samples were given.
    pub shuffle: bool,
    /// Keep the fitted network as the starting point of the next `fit`.
    pub warm_start: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub interrupt: Option<InterruptHandle>,
}

impl Default for MlpParams {
    fn default() -> Self {
        Self {
            hidden_layer_sizes: vec![100],
            activation: Activation::ReLU,
            optimizer: Optimizer::default(),
            learning_rate_init: 1e-3,
            alpha: 1e-4,
            batch_size: BatchSize::Auto,
            max_iter: 200,
            tol: 1e-4,
            n_iter_no_change: 10,
            early_stopping: false,
            validation_fraction: 0.1,
            loss: Loss::Mse,
            seed: 0,
            shuffle: true,
            warm_start: false,
            interrupt: None,
        }
    }
}

impl MlpParams {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_layer_sizes.contains(&0) {
            return Err(Error::InvalidConfig(format!(
                "hidden_layer_sizes must be > 0, got {:?}",
                self.hidden_layer_sizes
            )));
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidConfig("max_iter must be > 0".to_owned()));
        }
        if !(self.learning_rate_init.is_finite() && self.learning_rate_init > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning_rate_init must be finite and > 0, got {}",
                self.learning_rate_init
            )));
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "alpha must be finite and >= 0, got {}",
                self.alpha
            )));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "tol must be finite and >= 0, got {}",
                self.tol
            )));
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "validation_fraction must be in (0, 1), got {}",
                self.validation_fraction
            )));
        }
        self.optimizer.validate()
    }
}

/// Non-fatal conditions raised during a fit.
#[derive(Debug, Clone, PartialEq)]
pub enum FitWarning {
    /// `max_iter` epochs ran without the plateau rule stopping training.
    NotConverged { max_iter: usize },
    /// The interrupt handle was set; training stopped at a batch boundary.
    Interrupted,
    /// The requested batch size was outside `[1, n_samples]`.
    BatchSizeClipped { requested: usize, used: usize },
}

impl fmt::Display for FitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitWarning::NotConverged { max_iter } => write!(
                f,
                "stochastic optimizer: maximum iterations ({max_iter}) reached and the optimization hasn't converged yet"
            ),
            FitWarning::Interrupted => write!(f, "training interrupted by user"),
            FitWarning::BatchSizeClipped { requested, used } => write!(
                f,
                "got batch_size {requested} less than 1 or larger than sample size; clipped to {used}"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every allowed epoch ran.
    MaxIter,
    /// The plateau rule fired and the optimizer agreed to stop.
    NoImprovement,
    Interrupted,
    /// `partial_fit` ran its single epoch.
    SinglePass,
}

/// Summary of one `fit` / `partial_fit` call.
#[derive(Debug, Clone)]
pub struct FitReport {
    /// Epochs completed during this call.
    pub epochs: usize,
    /// Total epochs completed by the model (across warm starts and partial fits).
    pub n_iter: usize,
    /// Mean training loss of the last completed epoch.
    pub final_loss: f32,
    pub best_validation_score: Option<f32>,
    pub batch_size: usize,
    pub stop: StopReason,
    pub warnings: Vec<FitWarning>,
}

impl FitReport {
    pub fn converged(&self) -> bool {
        matches!(self.stop, StopReason::NoImprovement)
    }
}

/// Epoch-level bookkeeping that survives across `partial_fit` calls.
#[derive(Debug, Clone)]
pub struct TrainHistory {
    n_iter: usize,
    samples_seen: u64,
    loss: f32,
    loss_curve: Vec<f32>,
    validation_scores: Vec<f32>,
    tracker: NoImprovement,
}

impl TrainHistory {
    fn new(monitor: Monitor, tol: f32) -> Self {
        Self {
            n_iter: 0,
            samples_seen: 0,
            loss: f32::NAN,
            loss_curve: Vec::new(),
            validation_scores: Vec::new(),
            tracker: NoImprovement::new(monitor, tol),
        }
    }

    #[inline]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Total training samples processed (`n_iter * n_samples` for full epochs).
    #[inline]
    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    /// Mean training loss of the latest epoch (NaN before the first).
    #[inline]
    pub fn loss(&self) -> f32 {
        self.loss
    }

    #[inline]
    pub fn loss_curve(&self) -> &[f32] {
        &self.loss_curve
    }

    /// Validation R² per epoch; empty unless early stopping was on.
    #[inline]
    pub fn validation_scores(&self) -> &[f32] {
        &self.validation_scores
    }

    /// Lowest training loss seen, or `None` when the validation score is monitored.
    pub fn best_loss(&self) -> Option<f32> {
        (self.tracker.monitor() == Monitor::TrainingLoss && self.tracker.best().is_finite())
            .then(|| self.tracker.best())
    }

    pub fn best_validation_score(&self) -> Option<f32> {
        (self.tracker.monitor() == Monitor::ValidationScore && self.tracker.best().is_finite())
            .then(|| self.tracker.best())
    }

    /// Stalled epochs since the last improvement.
    #[inline]
    pub fn no_improvement_count(&self) -> usize {
        self.tracker.count()
    }
}

/// A trained network together with everything needed to keep training it.
#[derive(Debug, Clone)]
pub struct FittedMlp {
    mlp: Mlp,
    optimizer: OptimizerState,
    history: TrainHistory,
    rng: StdRng,
}

impl FittedMlp {
    /// Fresh optimizer state and history around a deserialized network.
    #[cfg(feature = "serde")]
    pub(crate) fn from_parts(
        mlp: Mlp,
        params: &MlpParams,
        n_iter: usize,
        loss_curve: Vec<f32>,
    ) -> Result<Self> {
        let optimizer = params.optimizer.state(&mlp, params.learning_rate_init)?;
        let mut history = TrainHistory::new(Monitor::TrainingLoss, params.tol);
        history.n_iter = n_iter;
        history.loss = loss_curve.last().copied().unwrap_or(f32::NAN);
        history.loss_curve = loss_curve;
        Ok(Self {
            mlp,
            optimizer,
            history,
            rng: StdRng::seed_from_u64(params.seed),
        })
    }

    #[inline]
    pub fn mlp(&self) -> &Mlp {
        &self.mlp
    }

    #[inline]
    pub fn history(&self) -> &TrainHistory {
        &self.history
    }

    #[inline]
    pub fn optimizer(&self) -> &OptimizerState {
        &self.optimizer
    }

    #[inline]
    pub fn n_iter(&self) -> usize {
        self.history.n_iter
    }

    #[inline]
    pub fn loss_curve(&self) -> &[f32] {
        &self.history.loss_curve
    }

    /// Weight matrix of every layer, row-major `(out_dim, in_dim)`.
    pub fn coefs(&self) -> Vec<&[f32]> {
        self.mlp.layers().iter().map(|l| l.weights()).collect()
    }

    /// Bias vector of every layer.
    pub fn intercepts(&self) -> Vec<&[f32]> {
        self.mlp.layers().iter().map(|l| l.biases()).collect()
    }

    pub fn predict(&self, inputs: &Inputs) -> Result<Vec<f32>> {
        self.mlp.predict(inputs)
    }

    /// R² of the predictions on `data`, averaged over outputs.
    pub fn score(&self, data: &Dataset) -> Result<f32> {
        if data.target_dim() != self.mlp.output_dim() {
            return Err(Error::InvalidShape(format!(
                "dataset target_dim {} does not match model output_dim {}",
                data.target_dim(),
                self.mlp.output_dim()
            )));
        }
        let preds = self.mlp.predict(data.inputs())?;
        metrics::r2_score(&preds, data.targets(), data.target_dim())
    }
}

/// How a call to [`fit_stochastic`] should treat existing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FitMode {
    /// Full fit: up to `max_iter` epochs, early stopping allowed.
    Full,
    /// One epoch, existing network and optimizer state reused.
    Incremental,
}

/// Train `state` (building it on first use) on `data` under `constraint`.
///
/// Input errors leave `state` untouched. Once training starts, `state` is only refilled
/// on success, so a failed fit leaves the estimator unfitted.
pub(crate) fn fit_stochastic<C: WeightConstraint + ?Sized>(
    state: &mut Option<FittedMlp>,
    params: &MlpParams,
    data: &Dataset,
    constraint: &C,
    shuffle: bool,
    mode: FitMode,
) -> Result<FitReport> {
    params.validate()?;
    data.validate_for_fit()?;
    constraint.check(data.input_dim())?;

    let incremental = mode == FitMode::Incremental;
    let early_stopping = params.early_stopping && !incremental;
    let first_pass = state.is_none() || (!params.warm_start && !incremental);

    if !first_pass {
        let mlp = &state.as_ref().ok_or(Error::NotFitted)?.mlp;
        if mlp.input_dim() != data.input_dim() || mlp.output_dim() != data.target_dim() {
            return Err(Error::InvalidShape(format!(
                "data is ({}, {}) but the fitted network is ({}, {})",
                data.input_dim(),
                data.target_dim(),
                mlp.input_dim(),
                mlp.output_dim()
            )));
        }
    }

    let monitor = if early_stopping {
        Monitor::ValidationScore
    } else {
        Monitor::TrainingLoss
    };

    let mut fitted = match state.take() {
        Some(mut fitted) if !first_pass => {
            if !incremental {
                fitted.optimizer = params.optimizer.state(&fitted.mlp, params.learning_rate_init)?;
            }
            if fitted.history.tracker.monitor() != monitor {
                fitted.history.tracker = NoImprovement::new(monitor, params.tol);
            }
            fitted
        }
        _ => {
            let mut rng = StdRng::seed_from_u64(params.seed);
            let mlp = MlpBuilder::regressor(
                data.input_dim(),
                &params.hidden_layer_sizes,
                params.activation,
                data.target_dim(),
            )?
            .build_with_rng(&mut rng)?;
            let optimizer = params.optimizer.state(&mlp, params.learning_rate_init)?;
            FittedMlp {
                mlp,
                optimizer,
                history: TrainHistory::new(monitor, params.tol),
                rng,
            }
        }
    };
    // The model is feasible from the start, even if no step ever runs.
    constraint.apply(&mut fitted.mlp);

    let (train, validation) = if early_stopping {
        let (train, val) = data.split_validation(params.validation_fraction, &mut fitted.rng)?;
        (std::borrow::Cow::Owned(train), Some(val))
    } else {
        (std::borrow::Cow::Borrowed(data), None)
    };

    let mut warnings = Vec::new();
    let batch_size = resolve_batch_size(params.batch_size, train.len(), &mut warnings);

    let mut report = run_epochs(
        &mut fitted,
        params,
        &train,
        validation.as_ref(),
        constraint,
        shuffle,
        batch_size,
        mode,
    )?;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;

    if fitted.history.best_validation_score().is_some() {
        report.best_validation_score = fitted.history.best_validation_score();
    }

    if !fitted.mlp.is_finite() {
        return Err(Error::NonFiniteParameters);
    }
    *state = Some(fitted);
    Ok(report)
}

fn resolve_batch_size(
    requested: BatchSize,
    n_samples: usize,
    warnings: &mut Vec<FitWarning>,
) -> usize {
    match requested {
        BatchSize::Auto => AUTO_BATCH_MAX.min(n_samples),
        BatchSize::Fixed(size) => {
            let used = size.clamp(1, n_samples);
            if used != size {
                let warning = FitWarning::BatchSizeClipped {
                    requested: size,
                    used,
                };
                tracing::warn!("{warning}");
                warnings.push(warning);
            }
            used
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_epochs<C: WeightConstraint + ?Sized>(
    fitted: &mut FittedMlp,
    params: &MlpParams,
    train: &Dataset,
    validation: Option<&Dataset>,
    constraint: &C,
    shuffle: bool,
    batch_size: usize,
    mode: FitMode,
) -> Result<FitReport> {
    let n_samples = train.len();
    let max_epochs = match mode {
        FitMode::Full => params.max_iter,
        FitMode::Incremental => 1,
    };

    let mut trainer = Trainer::new(&fitted.mlp);
    let mut order: Vec<usize> = (0..n_samples).collect();
    let mut best_snapshot: Option<Mlp> = None;
    let mut warnings = Vec::new();
    let mut stop = StopReason::MaxIter;
    let mut epochs = 0;

    'epochs: for _ in 0..max_epochs {
        if shuffle {
            order.shuffle(&mut fitted.rng);
        }

        let mut accumulated_loss = 0.0_f32;
        for batch in batches(n_samples, batch_size) {
            if params.interrupt.as_ref().is_some_and(InterruptHandle::is_interrupted) {
                tracing::warn!("{}", FitWarning::Interrupted);
                warnings.push(FitWarning::Interrupted);
                stop = StopReason::Interrupted;
                break 'epochs;
            }

            let rows = &order[batch];
            let batch_loss = batch_gradients(
                &fitted.mlp,
                &mut trainer,
                train,
                rows,
                params.loss,
                params.alpha,
            );
            accumulated_loss += batch_loss * rows.len() as f32;

            fitted.optimizer.step(&mut fitted.mlp, &trainer.grads);
            constraint.apply(&mut fitted.mlp);
        }

        epochs += 1;
        let history = &mut fitted.history;
        history.n_iter += 1;
        history.samples_seen += n_samples as u64;
        history.loss = accumulated_loss / n_samples as f32;
        history.loss_curve.push(history.loss);
        tracing::debug!(iteration = history.n_iter, loss = history.loss, "epoch finished");

        match validation {
            Some(val) => {
                let score = validation_score(&fitted.mlp, val)?;
                history.validation_scores.push(score);
                if history.tracker.observe(score) {
                    best_snapshot = Some(fitted.mlp.clone());
                }
            }
            None => {
                history.tracker.observe(history.loss);
            }
        }

        fitted.optimizer.iteration_ends(history.samples_seen);

        if history.tracker.exhausted(params.n_iter_no_change) {
            let subject = match history.tracker.monitor() {
                Monitor::ValidationScore => "validation score",
                Monitor::TrainingLoss => "training loss",
            };
            tracing::info!(
                tol = params.tol,
                n_iter_no_change = params.n_iter_no_change,
                "{subject} did not improve more than tol for n_iter_no_change consecutive epochs"
            );
            if fitted.optimizer.trigger_stopping() {
                stop = StopReason::NoImprovement;
                break;
            }
            history.tracker.reset_count();
        }

        if mode == FitMode::Incremental {
            stop = StopReason::SinglePass;
            break;
        }

        if history.n_iter == params.max_iter {
            let warning = FitWarning::NotConverged {
                max_iter: params.max_iter,
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
        }
    }

    if let Some(best) = best_snapshot {
        fitted.mlp = best;
    }

    Ok(FitReport {
        epochs,
        n_iter: fitted.history.n_iter,
        final_loss: fitted.history.loss,
        best_validation_score: None,
        batch_size,
        stop,
        warnings,
    })
}

/// Accumulate averaged gradients of one mini-batch into `trainer.grads`.
///
/// Returns the batch loss: mean per-sample loss plus the L2 term
/// `0.5 * alpha * ||W||^2 / batch_len`.
fn batch_gradients(
    mlp: &Mlp,
    trainer: &mut Trainer,
    data: &Dataset,
    rows: &[usize],
    loss: Loss,
    alpha: f32,
) -> f32 {
    trainer.grads.zero();

    let mut total = 0.0_f32;
    for &idx in rows {
        let input = data.input(idx);
        mlp.forward(input, &mut trainer.scratch);
        total += loss.backward(
            trainer.scratch.output(),
            data.target(idx),
            trainer.grads.d_output_mut(),
        );
        mlp.backward(input, &trainer.scratch, &mut trainer.grads);
    }

    let n = rows.len() as f32;
    trainer.grads.scale(1.0 / n);

    let mut sum_sq = 0.0_f32;
    if alpha > 0.0 {
        for (idx, layer) in mlp.layers().iter().enumerate() {
            let w = layer.weights();
            sum_sq += w.iter().map(|v| v * v).sum::<f32>();
            for (g, &wv) in trainer.grads.d_weights_mut(idx).iter_mut().zip(w) {
                *g += alpha * wv / n;
            }
        }
    }

    total / n + 0.5 * alpha * sum_sq / n
}

fn validation_score(mlp: &Mlp, val: &Dataset) -> Result<f32> {
    let preds = mlp.predict(val.inputs())?;
    metrics::r2_score(&preds, val.targets(), val.target_dim())
}
