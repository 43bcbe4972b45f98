use constrained_regression::{
    CoefficientBounds, ConstrainedLinearRegression, Dataset, LinearParams, LinearRegression,
    SelectiveDropLinearRegression,
};

fn main() -> constrained_regression::Result<()> {
    // y = 1.5*x0 - 0.8*x1 + 0.3*x2 + 4
    let rows: Vec<Vec<f32>> = (0..40)
        .map(|i| {
            let t = i as f32 / 8.0;
            vec![t.sin(), (0.7 * t).cos(), t]
        })
        .collect();
    let targets: Vec<Vec<f32>> = rows
        .iter()
        .map(|x| vec![1.5 * x[0] - 0.8 * x[1] + 0.3 * x[2] + 4.0])
        .collect();
    let data = Dataset::from_rows(&rows, &targets)?;

    let mut ols = LinearRegression::default();
    ols.fit(&data)?;
    println!("ols:         coef={:?} intercept={:.4}", ols.coef()?, ols.intercept()?);

    let mut nonneg = ConstrainedLinearRegression::new(LinearParams {
        nonnegative: true,
        ..LinearParams::default()
    });
    nonneg.fit(&data, None)?;
    println!(
        "nonnegative: coef={:?} intercept={:.4} sweeps={}",
        nonneg.coef()?,
        nonneg.intercept()?,
        nonneg.n_iter()
    );

    let bounds = CoefficientBounds::new(vec![0.0, -0.5, 0.0], vec![1.0, 0.0, 1.0])?;
    let mut boxed = ConstrainedLinearRegression::default();
    boxed.fit(&data, Some(&bounds))?;
    println!(
        "boxed:       coef={:?} intercept={:.4} r2={:.4}",
        boxed.coef()?,
        boxed.intercept()?,
        boxed.score(&data)?
    );
    for warning in boxed.warnings() {
        println!("warning: {warning}");
    }

    let mut dropper = SelectiveDropLinearRegression::new(true, true);
    dropper.fit(&data, None)?;
    println!(
        "drop:        coef={:?} intercept={:.4} dropped={:?}",
        dropper.coef()?,
        dropper.intercept()?,
        dropper.dropped()
    );
    Ok(())
}
