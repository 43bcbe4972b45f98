use criterion::{Criterion, black_box, criterion_group, criterion_main};

use constrained_regression::{
    Activation, CoefficientBounds, ConstrainedLinearRegression, ConstrainedMlpRegressor, Dataset,
    MlpBuilder, MlpParams, loss,
};

fn synthetic(len: usize, input_dim: usize) -> Dataset {
    let inputs: Vec<f32> = (0..len * input_dim)
        .map(|i| ((i * 37 % 101) as f32 / 101.0) - 0.5)
        .collect();
    let targets: Vec<f32> = inputs
        .chunks(input_dim)
        .map(|row| row.iter().enumerate().map(|(j, x)| (j % 3) as f32 * x).sum())
        .collect();
    Dataset::from_flat_1d(inputs, targets, input_dim).unwrap()
}

fn mlp_forward_bench(c: &mut Criterion) {
    let mlp = MlpBuilder::regressor(128, &[256, 256], Activation::ReLU, 1)
        .unwrap()
        .build_with_seed(0)
        .unwrap();
    let mut scratch = mlp.scratch();
    let input = vec![0.1_f32; mlp.input_dim()];

    c.bench_function("mlp_forward_128_256_256_1", |b| {
        b.iter(|| {
            let out = mlp.forward(black_box(&input), &mut scratch);
            black_box(out);
        })
    });
}

fn mlp_backward_bench(c: &mut Criterion) {
    let mlp = MlpBuilder::regressor(128, &[256, 256], Activation::ReLU, 1)
        .unwrap()
        .build_with_seed(0)
        .unwrap();
    let mut scratch = mlp.scratch();
    let mut grads = mlp.gradients();
    let input = vec![0.1_f32; mlp.input_dim()];
    let target = vec![0.0_f32; mlp.output_dim()];

    mlp.forward(&input, &mut scratch);
    loss::mse_backward(scratch.output(), &target, grads.d_output_mut());

    c.bench_function("mlp_backward_128_256_256_1", |b| {
        b.iter(|| {
            let d_input = mlp.backward(black_box(&input), black_box(&scratch), &mut grads);
            black_box(d_input);
        })
    });
}

fn constrained_fit_bench(c: &mut Criterion) {
    let data = synthetic(512, 16);
    let min_coef = vec![0.0_f32; 16];
    let params = MlpParams {
        hidden_layer_sizes: vec![32],
        max_iter: 5,
        ..MlpParams::default()
    };

    c.bench_function("constrained_mlp_fit_512x16_5_epochs", |b| {
        b.iter(|| {
            let mut model = ConstrainedMlpRegressor::new(params.clone());
            let report = model.fit(black_box(&data), Some(&min_coef), None).unwrap();
            black_box(report.final_loss);
        })
    });
}

fn constrained_linear_bench(c: &mut Criterion) {
    let data = synthetic(2048, 16);
    let bounds = CoefficientBounds::new(vec![0.0; 16], vec![1.5; 16]).unwrap();

    c.bench_function("constrained_linear_fit_2048x16", |b| {
        b.iter(|| {
            let mut model = ConstrainedLinearRegression::default();
            model.fit(black_box(&data), Some(&bounds)).unwrap();
            black_box(model.coef().unwrap()[0]);
        })
    });
}

criterion_group!(
    benches,
    mlp_forward_bench,
    mlp_backward_bench,
    constrained_fit_bench,
    constrained_linear_bench
);
criterion_main!(benches);
