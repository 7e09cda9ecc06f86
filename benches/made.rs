use criterion::{Criterion, black_box, criterion_group, criterion_main};

use made::{MadeBuilder, loss};

fn made_784() -> made::Made {
    MadeBuilder::new(784)
        .and_then(|b| b.hidden_width(500))
        .and_then(|b| b.build_with_seed(0))
        .unwrap()
}

fn made_forward_bench(c: &mut Criterion) {
    let made = made_784();
    let mut scratch = made.scratch();
    let input = vec![1.0_f32; made.input_dim()];

    c.bench_function("made_forward_784_500", |b| {
        b.iter(|| {
            let out = made.forward(black_box(&input), &mut scratch);
            black_box(out);
        })
    });
}

fn made_forward_batch_bench(c: &mut Criterion) {
    let made = made_784();
    let batch = 32;
    let mut scratch = made.batch_scratch(batch);
    let inputs = vec![1.0_f32; batch * made.input_dim()];

    c.bench_function("made_forward_batch_32x784_500", |b| {
        b.iter(|| {
            let out = made.forward_batch(black_box(&inputs), &mut scratch);
            black_box(out);
        })
    });
}

fn made_backward_bench(c: &mut Criterion) {
    let made = made_784();
    let mut scratch = made.scratch();
    let mut grads = made.gradients();
    let input = vec![1.0_f32; made.input_dim()];

    let probs = made.forward(&input, &mut scratch).to_vec();
    loss::binary_cross_entropy_backward(&probs, &input, grads.d_output_mut());

    c.bench_function("made_backward_784_500", |b| {
        b.iter(|| {
            let d_input = made.backward(black_box(&input), black_box(&scratch), &mut grads);
            black_box(d_input);
        })
    });
}

fn made_sample_bench(c: &mut Criterion) {
    let made = MadeBuilder::new(64)
        .and_then(|b| b.hidden_width(128))
        .and_then(|b| b.build_with_seed(0))
        .unwrap();

    c.bench_function("made_sample_16x64_128", |b| {
        b.iter(|| black_box(made.sample_with_seed(16, 0).unwrap()))
    });
}

criterion_group!(
    benches,
    made_forward_bench,
    made_forward_batch_bench,
    made_backward_bench,
    made_sample_bench
);
criterion_main!(benches);
