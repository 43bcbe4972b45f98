use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

use constrained_regression::{
    Activation, ConstrainedMlpRegressor, Dataset, MlpParams, MlpRegressor,
};

fn main() -> constrained_regression::Result<()> {
    // Task: y = 2*x0 + x1 - 0.5*x2 + noise, fit with the first two inputs forced to have
    // nonnegative weights and the third left free.
    let mut rng = StdRng::seed_from_u64(1);
    let dist = Uniform::new(-1.0_f32, 1.0_f32);
    let noise = Uniform::new(-0.05_f32, 0.05_f32);

    let mut make = |n: usize| -> constrained_regression::Result<Dataset> {
        let mut xs = Vec::with_capacity(3 * n);
        let mut ys = Vec::with_capacity(n);
        for _ in 0..n {
            let x = [dist.sample(&mut rng), dist.sample(&mut rng), dist.sample(&mut rng)];
            xs.extend_from_slice(&x);
            ys.push(2.0 * x[0] + x[1] - 0.5 * x[2] + noise.sample(&mut rng));
        }
        Dataset::from_flat_1d(xs, ys, 3)
    };
    let train = make(256)?;
    let test = make(64)?;

    let params = MlpParams {
        hidden_layer_sizes: vec![16],
        activation: Activation::Tanh,
        learning_rate_init: 0.01,
        max_iter: 300,
        seed: 7,
        ..MlpParams::default()
    };

    let mut constrained = ConstrainedMlpRegressor::new(params.clone());
    let report = constrained.fit(&train, Some(&[0.0, 0.0, f32::NEG_INFINITY]), None)?;
    println!(
        "constrained: epochs={} loss={:.6} stop={:?} warnings={}",
        report.n_iter,
        report.final_loss,
        report.stop,
        report.warnings.len()
    );

    let mut baseline = MlpRegressor::new(params);
    let report = baseline.fit(&train)?;
    println!(
        "baseline:    epochs={} loss={:.6} stop={:?}",
        report.n_iter, report.final_loss, report.stop
    );

    println!(
        "test r2: constrained={:.4} baseline={:.4}",
        constrained.score(&test)?,
        baseline.score(&test)?
    );

    let first = constrained.mlp()?.layer(0).expect("network has a first layer");
    for feature in 0..3 {
        let (lo, hi) = first
            .input_weights(feature)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), w| {
                (lo.min(w), hi.max(w))
            });
        println!("feature {feature}: first-layer weights in [{lo:.4}, {hi:.4}]");
    }
    Ok(())
}
