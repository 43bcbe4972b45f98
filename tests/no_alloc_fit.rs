use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use constrained_regression::{
    Activation, BatchSize, ConstrainedMlpRegressor, Dataset, MlpParams, Optimizer,
};

struct CountingAlloc {
    allocs: AtomicUsize,
    reallocs: AtomicUsize,
    deallocs: AtomicUsize,
}

impl CountingAlloc {
    const fn new() -> Self {
        Self {
            allocs: AtomicUsize::new(0),
            reallocs: AtomicUsize::new(0),
            deallocs: AtomicUsize::new(0),
        }
    }

    fn reset(&self) {
        self.allocs.store(0, Ordering::Relaxed);
        self.reallocs.store(0, Ordering::Relaxed);
        self.deallocs.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self) -> AllocSnapshot {
        AllocSnapshot {
            allocs: self.allocs.load(Ordering::Relaxed),
            reallocs: self.reallocs.load(Ordering::Relaxed),
            deallocs: self.deallocs.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AllocSnapshot {
    allocs: usize,
    reallocs: usize,
    deallocs: usize,
}

impl AllocSnapshot {
    fn events(self) -> usize {
        self.allocs + self.reallocs
    }
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.deallocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.reallocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static ALLOC: CountingAlloc = CountingAlloc::new();

fn make_dataset(len: usize, input_dim: usize) -> Dataset {
    let inputs = vec![0.1_f32; len * input_dim];
    let targets = vec![0.0_f32; len];
    Dataset::from_flat(inputs, targets, input_dim, 1).unwrap()
}

fn one_epoch(data: &Dataset, params: &MlpParams, min_coef: &[f32]) -> AllocSnapshot {
    let mut model = ConstrainedMlpRegressor::new(params.clone());
    ALLOC.reset();
    model.fit(data, Some(min_coef), None).unwrap();
    ALLOC.snapshot()
}

// Single test in this binary: the counter is process-global.
#[test]
fn constrained_epoch_does_not_allocate_per_step() {
    let input_dim = 32;
    let batch_size = 16;

    let params = MlpParams {
        hidden_layer_sizes: vec![64],
        activation: Activation::Tanh,
        optimizer: Optimizer::sgd(),
        learning_rate_init: 1e-2,
        batch_size: BatchSize::Fixed(batch_size),
        max_iter: 1,
        ..MlpParams::default()
    };
    let min_coef = vec![0.0_f32; input_dim];

    let train_small = make_dataset(batch_size, input_dim);
    let train_large = make_dataset(batch_size * 64, input_dim);

    // Warm up lazily-initialized statics (logging callsites) outside the measurement.
    one_epoch(&train_small, &params, &min_coef);

    let small = one_epoch(&train_small, &params, &min_coef);
    let large = one_epoch(&train_large, &params, &min_coef);

    assert_eq!(
        small.events(),
        large.events(),
        "expected allocation event count to be independent of steps.\n\
small: {small:?}\n\
large: {large:?}"
    );
}
