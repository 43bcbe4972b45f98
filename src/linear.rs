//! Linear regression with per-feature coefficient bounds.
//!
//! [`ConstrainedLinearRegression`] minimizes the squared error subject to
//! `min[i] <= coef[i] <= max[i]` by projected coordinate descent: each coordinate takes
//! its exact Newton step on the quadratic loss and is then clipped into its interval.
//! [`LinearRegression`] is the closed-form least-squares baseline.
//!
//! Both accumulate in `f64` and store `f32` coefficients.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bounds::CoefficientBounds;
use crate::train::FitWarning;
use crate::{Dataset, Error, Inputs, Result, metrics};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LinearParams {
    pub fit_intercept: bool,
    /// Floor every lower bound at zero.
    pub nonnegative: bool,
    /// Stop once no coefficient moves by more than this in a full sweep.
    pub tol: f64,
    /// Maximum number of coordinate sweeps.
    pub max_iter: usize,
}

impl Default for LinearParams {
    fn default() -> Self {
        Self {
            fit_intercept: true,
            nonnegative: false,
            tol: 1e-10,
            max_iter: 10_000,
        }
    }
}

impl LinearParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "tol must be finite and >= 0, got {}",
                self.tol
            )));
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidConfig("max_iter must be > 0".to_owned()));
        }
        Ok(())
    }
}

/// Fitted linear model `y = coef . x + intercept`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    coef: Vec<f32>,
    intercept: f32,
}

impl LinearFit {
    #[inline]
    pub fn coef(&self) -> &[f32] {
        &self.coef
    }

    #[inline]
    pub fn intercept(&self) -> f32 {
        self.intercept
    }

    pub fn predict(&self, inputs: &Inputs) -> Result<Vec<f32>> {
        if inputs.input_dim() != self.coef.len() {
            return Err(Error::InvalidShape(format!(
                "inputs have {} features, model has {}",
                inputs.input_dim(),
                self.coef.len()
            )));
        }
        Ok((0..inputs.len())
            .map(|idx| {
                let x = inputs.input(idx);
                let dot: f64 = x
                    .iter()
                    .zip(&self.coef)
                    .map(|(&a, &b)| f64::from(a) * f64::from(b))
                    .sum();
                (dot + f64::from(self.intercept)) as f32
            })
            .collect())
    }

    pub fn score(&self, data: &Dataset) -> Result<f32> {
        check_single_target(data)?;
        let preds = self.predict(data.inputs())?;
        metrics::r2_score(&preds, data.targets(), 1)
    }
}

/// Centered, column-major copy of the training data.
struct Design {
    columns: Vec<Vec<f64>>,
    y: Vec<f64>,
    x_mean: Vec<f64>,
    y_mean: f64,
}

impl Design {
    fn new(data: &Dataset, fit_intercept: bool) -> Self {
        let n = data.len();
        let p = data.input_dim();

        let mut columns = vec![Vec::with_capacity(n); p];
        for idx in 0..n {
            for (col, &v) in columns.iter_mut().zip(data.input(idx)) {
                col.push(f64::from(v));
            }
        }
        let mut y: Vec<f64> = data.targets().iter().map(|&v| f64::from(v)).collect();

        let mut x_mean = vec![0.0; p];
        let mut y_mean = 0.0;
        if fit_intercept {
            for (col, mean) in columns.iter_mut().zip(&mut x_mean) {
                *mean = col.iter().sum::<f64>() / n as f64;
                col.iter_mut().for_each(|v| *v -= *mean);
            }
            y_mean = y.iter().sum::<f64>() / n as f64;
            y.iter_mut().for_each(|v| *v -= y_mean);
        }

        Self {
            columns,
            y,
            x_mean,
            y_mean,
        }
    }

    fn finish(&self, beta: &[f64]) -> LinearFit {
        let shift: f64 = self.x_mean.iter().zip(beta).map(|(m, b)| m * b).sum();
        LinearFit {
            coef: beta.iter().map(|&b| b as f32).collect(),
            intercept: (self.y_mean - shift) as f32,
        }
    }
}

fn check_single_target(data: &Dataset) -> Result<()> {
    if data.target_dim() != 1 {
        return Err(Error::InvalidShape(format!(
            "linear regression expects a single target, got target_dim {}",
            data.target_dim()
        )));
    }
    Ok(())
}

/// Least-squares linear regression with box constraints on the coefficients.
///
/// ```
/// use constrained_regression::{ConstrainedLinearRegression, Dataset, LinearParams};
///
/// # fn main() -> constrained_regression::Result<()> {
/// // y = x0 - x1
/// let data = Dataset::from_rows(
///     &[vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 1.0], vec![1.0, 3.0]],
///     &[vec![-1.0], vec![1.0], vec![1.0], vec![-2.0]],
/// )?;
///
/// let mut model = ConstrainedLinearRegression::new(LinearParams {
///     nonnegative: true,
///     ..LinearParams::default()
/// });
/// model.fit(&data, None)?;
/// assert!(model.coef()?.iter().all(|c| *c >= 0.0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConstrainedLinearRegression {
    params: LinearParams,
    bounds: Option<CoefficientBounds>,
    fit: Option<LinearFit>,
    n_iter: usize,
    warnings: Vec<FitWarning>,
}

impl ConstrainedLinearRegression {
    pub fn new(params: LinearParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    #[inline]
    pub fn params(&self) -> &LinearParams {
        &self.params
    }

    /// Fit starting from all-zero coefficients (clipped into the bounds).
    ///
    /// `bounds = None` leaves every coefficient unbounded, apart from the zero floor that
    /// `nonnegative` adds.
    pub fn fit(&mut self, data: &Dataset, bounds: Option<&CoefficientBounds>) -> Result<()> {
        let zeros = vec![0.0; data.input_dim()];
        self.fit_from(data, bounds, &zeros)
    }

    /// Fit starting from `initial` coefficients (clipped into the bounds).
    pub fn fit_from(
        &mut self,
        data: &Dataset,
        bounds: Option<&CoefficientBounds>,
        initial: &[f32],
    ) -> Result<()> {
        self.params.validate()?;
        data.validate_for_fit()?;
        check_single_target(data)?;

        let p = data.input_dim();
        if initial.len() != p {
            return Err(Error::InvalidShape(format!(
                "initial coefficients have {} entries, data has {p} features",
                initial.len()
            )));
        }
        let mut bounds = match bounds {
            Some(b) if b.len() != p => {
                return Err(Error::InvalidShape(format!(
                    "bounds cover {} features, data has {p}",
                    b.len()
                )));
            }
            Some(b) => b.clone(),
            None => CoefficientBounds::unbounded(p),
        };
        if self.params.nonnegative {
            bounds = bounds.nonnegative()?;
        }

        let design = Design::new(data, self.params.fit_intercept);
        let (beta, n_iter, converged) = projected_coordinate_descent(
            &design,
            &bounds,
            initial,
            self.params.tol,
            self.params.max_iter,
        );

        self.warnings.clear();
        if !converged {
            let warning = FitWarning::NotConverged {
                max_iter: self.params.max_iter,
            };
            tracing::warn!("{warning}");
            self.warnings.push(warning);
        }
        tracing::debug!(n_iter, converged, "constrained linear fit finished");

        self.fit = Some(design.finish(&beta));
        self.bounds = Some(bounds);
        self.n_iter = n_iter;
        Ok(())
    }

    pub fn coef(&self) -> Result<&[f32]> {
        self.fitted().map(LinearFit::coef)
    }

    pub fn intercept(&self) -> Result<f32> {
        self.fitted().map(LinearFit::intercept)
    }

    pub fn predict(&self, inputs: &Inputs) -> Result<Vec<f32>> {
        self.fitted()?.predict(inputs)
    }

    pub fn score(&self, data: &Dataset) -> Result<f32> {
        self.fitted()?.score(data)
    }

    pub fn fitted(&self) -> Result<&LinearFit> {
        self.fit.as_ref().ok_or(Error::NotFitted)
    }

    /// Effective bounds of the last fit, including the `nonnegative` floor.
    #[inline]
    pub fn bounds(&self) -> Option<&CoefficientBounds> {
        self.bounds.as_ref()
    }

    /// Sweeps run by the last fit.
    #[inline]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    #[inline]
    pub fn warnings(&self) -> &[FitWarning] {
        &self.warnings
    }
}

/// Returns `(beta, sweeps, converged)`.
fn projected_coordinate_descent(
    design: &Design,
    bounds: &CoefficientBounds,
    initial: &[f32],
    tol: f64,
    max_iter: usize,
) -> (Vec<f64>, usize, bool) {
    let lo: Vec<f64> = bounds.min().iter().map(|&v| f64::from(v)).collect();
    let hi: Vec<f64> = bounds.max().iter().map(|&v| f64::from(v)).collect();

    let mut beta: Vec<f64> = initial
        .iter()
        .enumerate()
        .map(|(j, &v)| f64::from(v).clamp(lo[j], hi[j]))
        .collect();

    // residual = y - X beta
    let mut residual = design.y.clone();
    for (col, &b) in design.columns.iter().zip(&beta) {
        if b != 0.0 {
            residual.iter_mut().zip(col).for_each(|(r, x)| *r -= b * x);
        }
    }

    let curvature: Vec<f64> = design
        .columns
        .iter()
        .map(|col| col.iter().map(|x| x * x).sum())
        .collect();

    for sweep in 1..=max_iter {
        let mut max_delta = 0.0_f64;
        for (j, col) in design.columns.iter().enumerate() {
            if curvature[j] == 0.0 {
                continue;
            }
            let grad: f64 = -col.iter().zip(&residual).map(|(x, r)| x * r).sum::<f64>();
            let updated = (beta[j] - grad / curvature[j]).clamp(lo[j], hi[j]);
            let delta = updated - beta[j];
            if delta != 0.0 {
                residual
                    .iter_mut()
                    .zip(col)
                    .for_each(|(r, x)| *r -= delta * x);
                beta[j] = updated;
                max_delta = max_delta.max(delta.abs());
            }
        }
        if max_delta < tol {
            return (beta, sweep, true);
        }
    }
    (beta, max_iter, false)
}

/// Ordinary least squares via Cholesky on the normal equations.
#[derive(Debug, Clone)]
pub struct LinearRegression {
    fit_intercept: bool,
    fit: Option<LinearFit>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LinearRegression {
    pub fn new(fit_intercept: bool) -> Self {
        Self {
            fit_intercept,
            fit: None,
        }
    }

    pub fn fit(&mut self, data: &Dataset) -> Result<()> {
        data.validate_for_fit()?;
        check_single_target(data)?;

        let design = Design::new(data, self.fit_intercept);
        let columns: Vec<&[f64]> = design.columns.iter().map(Vec::as_slice).collect();
        let beta = least_squares(&columns, &design.y)?;
        self.fit = Some(design.finish(&beta));
        Ok(())
    }

    pub fn coef(&self) -> Result<&[f32]> {
        self.fitted().map(LinearFit::coef)
    }

    pub fn intercept(&self) -> Result<f32> {
        self.fitted().map(LinearFit::intercept)
    }

    pub fn predict(&self, inputs: &Inputs) -> Result<Vec<f32>> {
        self.fitted()?.predict(inputs)
    }

    pub fn score(&self, data: &Dataset) -> Result<f32> {
        self.fitted()?.score(data)
    }

    pub fn fitted(&self) -> Result<&LinearFit> {
        self.fit.as_ref().ok_or(Error::NotFitted)
    }
}

/// Least squares that drops bound-violating features until the rest fit inside their bounds.
///
/// Each round solves ordinary least squares on the active features. The feature whose
/// coefficient lies furthest outside its interval is then pinned at the value in its
/// interval closest to zero (zero itself when allowed) and the rest are refit. With no
/// violations on the first round the result is plain OLS.
///
/// ```
/// use constrained_regression::{Dataset, SelectiveDropLinearRegression};
///
/// # fn main() -> constrained_regression::Result<()> {
/// let data = Dataset::from_rows(
///     &[vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 1.0], vec![1.0, 3.0]],
///     &[vec![-1.0], vec![1.0], vec![1.0], vec![-2.0]],
/// )?;
///
/// let mut model = SelectiveDropLinearRegression::new(true, true);
/// model.fit(&data, None)?;
/// assert_eq!(model.dropped(), &[1]);
/// assert_eq!(model.coef()?[1], 0.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SelectiveDropLinearRegression {
    fit_intercept: bool,
    nonnegative: bool,
    bounds: Option<CoefficientBounds>,
    fit: Option<LinearFit>,
    dropped: Vec<usize>,
}

impl Default for SelectiveDropLinearRegression {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl SelectiveDropLinearRegression {
    pub fn new(fit_intercept: bool, nonnegative: bool) -> Self {
        Self {
            fit_intercept,
            nonnegative,
            bounds: None,
            fit: None,
            dropped: Vec::new(),
        }
    }

    pub fn fit(&mut self, data: &Dataset, bounds: Option<&CoefficientBounds>) -> Result<()> {
        data.validate_for_fit()?;
        check_single_target(data)?;

        let p = data.input_dim();
        let mut bounds = match bounds {
            Some(b) if b.len() != p => {
                return Err(Error::InvalidShape(format!(
                    "bounds cover {} features, data has {p}",
                    b.len()
                )));
            }
            Some(b) => b.clone(),
            None => CoefficientBounds::unbounded(p),
        };
        if self.nonnegative {
            bounds = bounds.nonnegative()?;
        }
        let lo: Vec<f64> = bounds.min().iter().map(|&v| f64::from(v)).collect();
        let hi: Vec<f64> = bounds.max().iter().map(|&v| f64::from(v)).collect();

        let design = Design::new(data, self.fit_intercept);
        let mut beta = vec![0.0_f64; p];
        let mut active: Vec<usize> = (0..p).collect();
        let mut dropped = Vec::new();

        loop {
            // target = y - contribution of the pinned features
            let mut target = design.y.clone();
            for &j in &dropped {
                let b = beta[j];
                if b != 0.0 {
                    target
                        .iter_mut()
                        .zip(&design.columns[j])
                        .for_each(|(t, x)| *t -= b * x);
                }
            }

            let columns: Vec<&[f64]> = active
                .iter()
                .map(|&j| design.columns[j].as_slice())
                .collect();
            let solution = least_squares(&columns, &target)?;
            for (&j, &b) in active.iter().zip(&solution) {
                beta[j] = b;
            }

            let worst = active
                .iter()
                .enumerate()
                .map(|(k, &j)| (k, (lo[j] - beta[j]).max(beta[j] - hi[j])))
                .filter(|&(_, violation)| violation > 0.0)
                .max_by(|a, b| a.1.total_cmp(&b.1));
            let Some((k, _)) = worst else {
                break;
            };
            let j = active.remove(k);
            beta[j] = 0.0_f64.clamp(lo[j], hi[j]);
            tracing::debug!(feature = j, pinned = beta[j], "dropping bound-violating feature");
            dropped.push(j);
        }

        dropped.sort_unstable();
        self.fit = Some(design.finish(&beta));
        self.bounds = Some(bounds);
        self.dropped = dropped;
        Ok(())
    }

    pub fn coef(&self) -> Result<&[f32]> {
        self.fitted().map(LinearFit::coef)
    }

    pub fn intercept(&self) -> Result<f32> {
        self.fitted().map(LinearFit::intercept)
    }

    pub fn predict(&self, inputs: &Inputs) -> Result<Vec<f32>> {
        self.fitted()?.predict(inputs)
    }

    pub fn score(&self, data: &Dataset) -> Result<f32> {
        self.fitted()?.score(data)
    }

    pub fn fitted(&self) -> Result<&LinearFit> {
        self.fit.as_ref().ok_or(Error::NotFitted)
    }

    #[inline]
    pub fn bounds(&self) -> Option<&CoefficientBounds> {
        self.bounds.as_ref()
    }

    /// Features pinned by the last fit, ascending.
    #[inline]
    pub fn dropped(&self) -> &[usize] {
        &self.dropped
    }
}

/// Least squares over `columns` (already centered when an intercept is fitted).
fn least_squares(columns: &[&[f64]], y: &[f64]) -> Result<Vec<f64>> {
    let p = columns.len();
    let mut gram = vec![0.0_f64; p * p];
    for i in 0..p {
        for j in 0..=i {
            let dot: f64 = columns[i].iter().zip(columns[j]).map(|(a, b)| a * b).sum();
            gram[i * p + j] = dot;
            gram[j * p + i] = dot;
        }
    }
    let rhs: Vec<f64> = columns
        .iter()
        .map(|col| col.iter().zip(y).map(|(x, y)| x * y).sum())
        .collect();
    cholesky_solve(&mut gram, rhs, p)
}

/// Solve `A x = b` for symmetric positive-definite `A` (row-major `n x n`, overwritten).
fn cholesky_solve(a: &mut [f64], mut b: Vec<f64>, n: usize) -> Result<Vec<f64>> {
    // Lower factor L stored in the lower triangle of `a`.
    for j in 0..n {
        let mut diag = a[j * n + j];
        for k in 0..j {
            diag -= a[j * n + k] * a[j * n + k];
        }
        if diag <= 1e-10 * a[j * n + j].abs().max(f64::MIN_POSITIVE) {
            return Err(Error::InvalidData(
                "design matrix is singular; features are collinear or constant".to_owned(),
            ));
        }
        let diag = diag.sqrt();
        a[j * n + j] = diag;
        for i in j + 1..n {
            let mut v = a[i * n + j];
            for k in 0..j {
                v -= a[i * n + k] * a[j * n + k];
            }
            a[i * n + j] = v / diag;
        }
    }

    // L y = b
    for i in 0..n {
        for k in 0..i {
            b[i] -= a[i * n + k] * b[k];
        }
        b[i] /= a[i * n + i];
    }
    // L^T x = y
    for i in (0..n).rev() {
        for k in i + 1..n {
            b[i] -= a[k * n + i] * b[k];
        }
        b[i] /= a[i * n + i];
    }
    Ok(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    /// y = 1.5 x0 - 2 x1 + 0.5 x2 + 3, with a little deterministic noise.
    fn correlated() -> Dataset {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for i in 0..50 {
            let t = i as f32 / 10.0;
            let x = [t.sin(), (1.3 * t).cos() + 0.2 * t, 0.1 * t * t];
            let noise = 0.01 * ((i * 7 % 11) as f32 - 5.0);
            xs.extend_from_slice(&x);
            ys.push(1.5 * x[0] - 2.0 * x[1] + 0.5 * x[2] + 3.0 + noise);
        }
        Dataset::from_flat_1d(xs, ys, 3).unwrap()
    }

    #[test]
    fn unbounded_fit_matches_least_squares() {
        let data = correlated();
        let mut ols = LinearRegression::default();
        ols.fit(&data).unwrap();

        let mut model = ConstrainedLinearRegression::default();
        model.fit(&data, None).unwrap();
        assert!(model.warnings().is_empty());

        for (a, b) in model.coef().unwrap().iter().zip(ols.coef().unwrap()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-3);
        }
        assert_abs_diff_eq!(
            model.intercept().unwrap(),
            ols.intercept().unwrap(),
            epsilon = 1e-3
        );
        assert!(model.coef().unwrap().iter().any(|c| *c < 0.0));
    }

    #[test]
    fn ols_recovers_exact_coefficients() {
        let rows: Vec<Vec<f32>> = (0..10)
            .map(|i| vec![i as f32, (i * i % 7) as f32])
            .collect();
        let targets: Vec<Vec<f32>> = rows.iter().map(|r| vec![2.0 * r[0] - r[1] + 1.0]).collect();
        let data = Dataset::from_rows(&rows, &targets).unwrap();

        let mut ols = LinearRegression::default();
        ols.fit(&data).unwrap();
        assert_abs_diff_eq!(ols.coef().unwrap()[0], 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(ols.coef().unwrap()[1], -1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(ols.intercept().unwrap(), 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(ols.score(&data).unwrap(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn nonnegative_floors_every_coefficient() {
        let data = correlated();
        let mut model = ConstrainedLinearRegression::new(LinearParams {
            nonnegative: true,
            ..LinearParams::default()
        });
        model.fit(&data, None).unwrap();

        let coef = model.coef().unwrap();
        assert!(coef.iter().all(|c| *c >= 0.0));
        assert!(model.bounds().unwrap().min().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn explicit_bounds_are_respected() {
        let data = correlated();
        let bounds = CoefficientBounds::new(vec![0.0, -1.0, -5.0], vec![1.0, 5.0, 5.0]).unwrap();
        let mut model = ConstrainedLinearRegression::default();
        model.fit(&data, Some(&bounds)).unwrap();

        let coef = model.coef().unwrap();
        for (i, c) in coef.iter().enumerate() {
            assert!(bounds.contains(i, *c), "coef {i} = {c} outside bounds");
        }
    }

    #[test]
    fn initial_coefficients_are_clipped_first() {
        let data = correlated();
        let bounds = CoefficientBounds::new(vec![0.0; 3], vec![0.5; 3]).unwrap();
        let mut model = ConstrainedLinearRegression::default();
        model
            .fit_from(&data, Some(&bounds), &[10.0, -10.0, 0.25])
            .unwrap();
        assert!(model.coef().unwrap().iter().all(|c| (0.0..=0.5).contains(c)));
    }

    #[test]
    fn tight_iteration_budget_warns() {
        let data = correlated();
        let mut model = ConstrainedLinearRegression::new(LinearParams {
            max_iter: 1,
            tol: 0.0,
            ..LinearParams::default()
        });
        model.fit(&data, None).unwrap();
        assert_eq!(model.n_iter(), 1);
        assert_eq!(
            model.warnings(),
            &[FitWarning::NotConverged { max_iter: 1 }]
        );
    }

    #[test]
    fn shape_errors() {
        let data = correlated();
        let mut model = ConstrainedLinearRegression::default();
        let bounds = CoefficientBounds::unbounded(2);
        assert!(matches!(
            model.fit(&data, Some(&bounds)),
            Err(Error::InvalidShape(_))
        ));
        assert!(matches!(
            model.fit_from(&data, None, &[0.0]),
            Err(Error::InvalidShape(_))
        ));

        let two_targets =
            Dataset::from_rows(&[vec![1.0], vec![2.0]], &[vec![1.0, 0.0], vec![2.0, 0.0]])
                .unwrap();
        assert!(matches!(
            LinearRegression::default().fit(&two_targets),
            Err(Error::InvalidShape(_))
        ));
        let inputs = Inputs::from_flat(vec![0.0; 3], 3).unwrap();
        assert_eq!(model.predict(&inputs).unwrap_err(), Error::NotFitted);
    }

    #[test]
    fn selective_drop_without_violations_is_least_squares() {
        let data = correlated();
        let mut ols = LinearRegression::default();
        ols.fit(&data).unwrap();

        let mut model = SelectiveDropLinearRegression::default();
        model.fit(&data, None).unwrap();
        assert!(model.dropped().is_empty());
        assert_eq!(model.coef().unwrap(), ols.coef().unwrap());
        assert_eq!(model.intercept().unwrap(), ols.intercept().unwrap());
    }

    #[test]
    fn selective_drop_pins_violators_and_refits_the_rest() {
        let data = correlated();
        // OLS puts x1 near -2, far outside [-0.5, 0.5].
        let bounds =
            CoefficientBounds::new(vec![-5.0, -0.5, -5.0], vec![5.0, 0.5, 5.0]).unwrap();
        let mut model = SelectiveDropLinearRegression::default();
        model.fit(&data, Some(&bounds)).unwrap();

        assert!(model.dropped().contains(&1));
        let coef = model.coef().unwrap();
        assert_eq!(coef[1], 0.0);
        for (i, c) in coef.iter().enumerate() {
            assert!(bounds.contains(i, *c), "coef {i} = {c} outside bounds");
        }
    }

    #[test]
    fn selective_drop_pins_at_the_bound_nearest_zero() {
        let data = correlated();
        let bounds =
            CoefficientBounds::new(vec![-5.0, 1.0, -5.0], vec![5.0, 2.0, 5.0]).unwrap();
        let mut model = SelectiveDropLinearRegression::new(true, false);
        model.fit(&data, Some(&bounds)).unwrap();

        assert!(model.dropped().contains(&1));
        assert_eq!(model.coef().unwrap()[1], 1.0);
        assert_eq!(model.bounds().unwrap(), &bounds);
    }

    #[test]
    fn collinear_features_are_singular_for_ols() {
        let rows: Vec<Vec<f32>> = (0..6).map(|i| vec![i as f32, 2.0 * i as f32]).collect();
        let targets: Vec<Vec<f32>> = (0..6).map(|i| vec![i as f32]).collect();
        let data = Dataset::from_rows(&rows, &targets).unwrap();
        assert!(matches!(
            LinearRegression::default().fit(&data),
            Err(Error::InvalidData(_))
        ));
    }
}
