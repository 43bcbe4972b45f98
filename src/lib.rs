//! Box-constrained regression.
//!
//! `constrained-regression` fits linear models and multi-layer perceptrons whose
//! input coefficients are kept inside per-feature `[min, max]` intervals. Typical uses are
//! sign constraints (a feature may only push the prediction up) and magnitude caps.
//!
//! - [`ConstrainedMlpRegressor`]: a dense network trained with SGD or Adam. After every
//!   optimizer update, the weights leaving input feature `i` (column `i` of the first
//!   weight matrix, for every hidden unit) are clipped into `[min[i], max[i]]`. Deeper
//!   layers and biases are not constrained.
//! - [`MlpRegressor`]: the same model and training loop without the projection. With all
//!   bounds infinite and shuffling off, both produce identical parameters.
//! - [`ConstrainedLinearRegression`]: projected coordinate descent for linear least
//!   squares, with a `nonnegative` shortcut; [`LinearRegression`] is the OLS baseline.
//!
//! # Panics vs `Result`
//!
//! - Low-level hot path (panics on misuse): [`Mlp::forward`], [`Mlp::backward`],
//!   [`Layer::clamp_input_weights`]. Shape mismatches are programmer error.
//! - Estimators and [`Mlp::predict`] validate inputs and return [`Result`].
//!
//! Non-fatal conditions (iteration budget exhausted, interruption, clipped batch size) are
//! returned as [`FitWarning`]s in the [`FitReport`] and logged through `tracing`.
//!
//! # Data layout
//!
//! - Scalars are `f32`.
//! - [`Dataset`] and [`Inputs`] store samples contiguously in row-major layout.
//! - Layer weights are row-major with shape `(out_dim, in_dim)`.
//!
//! # Quick start
//!
//! ```rust
//! use constrained_regression::{ConstrainedMlpRegressor, Dataset, MlpParams, Optimizer};
//!
//! # fn main() -> constrained_regression::Result<()> {
//! let rows: Vec<Vec<f32>> = (0..32)
//!     .map(|i| vec![i as f32 / 32.0, (i % 4) as f32 / 4.0])
//!     .collect();
//! let targets: Vec<Vec<f32>> = rows.iter().map(|r| vec![r[0] + 0.5 * r[1]]).collect();
//! let data = Dataset::from_rows(&rows, &targets)?;
//!
//! let mut model = ConstrainedMlpRegressor::new(MlpParams {
//!     hidden_layer_sizes: vec![6],
//!     optimizer: Optimizer::sgd(),
//!     learning_rate_init: 0.01,
//!     max_iter: 100,
//!     seed: 7,
//!     ..MlpParams::default()
//! });
//! let report = model.fit(&data, Some(&[0.0, 0.0]), None)?;
//! println!("stopped after {} epochs: {:?}", report.n_iter, report.stop);
//!
//! let first = model.mlp()?.layer(0).unwrap();
//! assert!(first.weights().iter().all(|w| *w >= 0.0));
//! # Ok(())
//! # }
//! ```
//!
//! # Driving training by hand
//!
//! Buffers are allocated once and reused across steps:
//!
//! ```rust
//! use constrained_regression::{Activation, CoefficientBounds, Loss, MlpBuilder, Optimizer};
//! use constrained_regression::bounds::WeightConstraint;
//!
//! # fn main() -> constrained_regression::Result<()> {
//! let mut mlp = MlpBuilder::regressor(3, &[8], Activation::Tanh, 1)?.build_with_seed(0)?;
//! let mut optimizer = Optimizer::sgd().state(&mlp, 1e-2)?;
//! let bounds = CoefficientBounds::new(vec![0.0; 3], vec![1.0; 3])?;
//!
//! let mut trainer = mlp.trainer();
//! let x = [0.1_f32, -0.2, 0.3];
//! let t = [0.5_f32];
//!
//! trainer.grads.zero();
//! let y = mlp.forward(&x, &mut trainer.scratch);
//! let _loss = Loss::Mse.backward(y, &t, trainer.grads.d_output_mut());
//! mlp.backward(&x, &trainer.scratch, &mut trainer.grads);
//! optimizer.step(&mut mlp, &trainer.grads);
//! bounds.apply(&mut mlp);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod bounds;
pub mod builder;
pub mod data;
pub mod early_stop;
pub mod error;
pub mod layer;
pub mod linear;
pub mod loss;
pub mod metrics;
pub mod mlp;
pub mod optim;
pub mod regressor;
pub mod train;

#[cfg(feature = "serde")]
pub mod serde_model;

pub use activation::Activation;
pub use bounds::{CoefficientBounds, Unconstrained, WeightConstraint};
pub use builder::MlpBuilder;
pub use data::{Dataset, Inputs};
pub use error::{Error, Result};
pub use layer::Layer;
pub use linear::{
    ConstrainedLinearRegression, LinearFit, LinearParams, LinearRegression,
    SelectiveDropLinearRegression,
};
pub use loss::Loss;
pub use mlp::{Gradients, Mlp, Scratch, Trainer};
pub use optim::{LrSchedule, Optimizer, OptimizerState};
pub use regressor::{ConstrainedMlpRegressor, MlpRegressor};
pub use train::{
    BatchSize, FitReport, FitWarning, FittedMlp, InterruptHandle, MlpParams, StopReason,
    TrainHistory,
};
