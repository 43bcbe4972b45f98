//! Regression metrics.
//!
//! Metrics take flat row-major buffers of equal length: predictions `(len, dim)` and
//! targets `(len, dim)`. They are evaluation helpers and never take part in backprop.

use crate::{Error, Result};

fn check_lengths(pred: &[f32], target: &[f32], dim: usize) -> Result<()> {
    if dim == 0 {
        return Err(Error::InvalidShape("dim must be > 0".to_owned()));
    }
    if pred.len() != target.len() {
        return Err(Error::InvalidShape(format!(
            "pred len {} does not match target len {}",
            pred.len(),
            target.len()
        )));
    }
    if pred.is_empty() || !pred.len().is_multiple_of(dim) {
        return Err(Error::InvalidShape(format!(
            "buffer len {} is not a non-empty multiple of dim {dim}",
            pred.len()
        )));
    }
    Ok(())
}

/// Mean squared error over every element.
pub fn mean_squared_error(pred: &[f32], target: &[f32]) -> Result<f32> {
    check_lengths(pred, target, 1)?;
    let sum: f64 = pred
        .iter()
        .zip(target)
        .map(|(&p, &t)| f64::from(p - t).powi(2))
        .sum();
    Ok((sum / pred.len() as f64) as f32)
}

/// Mean absolute error over every element.
pub fn mean_absolute_error(pred: &[f32], target: &[f32]) -> Result<f32> {
    check_lengths(pred, target, 1)?;
    let sum: f64 = pred
        .iter()
        .zip(target)
        .map(|(&p, &t)| f64::from(p - t).abs())
        .sum();
    Ok((sum / pred.len() as f64) as f32)
}

/// Coefficient of determination, averaged uniformly over the `dim` outputs.
///
/// For an output whose targets are constant, the score is `1.0` on a perfect fit and
/// `0.0` otherwise.
pub fn r2_score(pred: &[f32], target: &[f32], dim: usize) -> Result<f32> {
    check_lengths(pred, target, dim)?;
    let n = pred.len() / dim;

    let mut total = 0.0_f64;
    for d in 0..dim {
        let column = |buf: &[f32]| {
            buf.iter()
                .skip(d)
                .step_by(dim)
                .map(|&v| f64::from(v))
                .collect::<Vec<_>>()
        };
        let p = column(pred);
        let t = column(target);

        let mean = t.iter().sum::<f64>() / n as f64;
        let ss_res: f64 = p.iter().zip(&t).map(|(p, t)| (t - p).powi(2)).sum();
        let ss_tot: f64 = t.iter().map(|t| (t - mean).powi(2)).sum();

        total += if ss_tot == 0.0 {
            if ss_res == 0.0 { 1.0 } else { 0.0 }
        } else {
            1.0 - ss_res / ss_tot
        };
    }
    Ok((total / dim as f64) as f32)
}
