#[cfg(not(feature = "serde"))]
fn main() {
    println!("enable the `serde` feature: cargo run --example save_load_json --features serde");
}

#[cfg(feature = "serde")]
fn main() -> constrained_regression::Result<()> {
    use constrained_regression::{ConstrainedMlpRegressor, Dataset, MlpParams};

    let xs = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let ys = vec![vec![0.0], vec![0.5], vec![1.0], vec![1.5]];
    let train = Dataset::from_rows(&xs, &ys)?;

    let mut model = ConstrainedMlpRegressor::new(MlpParams {
        hidden_layer_sizes: vec![8],
        max_iter: 200,
        learning_rate_init: 0.01,
        ..MlpParams::default()
    });
    model.fit(&train, Some(&[0.0, 0.0]), Some(&[1.0, 1.0]))?;

    let path = "target/tmp_constrained_mlp.json";
    model.save_json(path)?;

    let loaded = ConstrainedMlpRegressor::load_json(path)?;
    println!(
        "saved and loaded model: {path} (r2={:.4})",
        loaded.score(&train)?
    );
    Ok(())
}
