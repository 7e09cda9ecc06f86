use rand::SeedableRng;
use rand::rngs::StdRng;

use made::{Dataset, FitConfig, MadeBuilder, Optimizer, Sampler, Shuffle};

#[test]
fn sample_returns_n_by_d_binary_rows() {
    let made = MadeBuilder::new(10)
        .unwrap()
        .hidden_width(20)
        .unwrap()
        .build_with_seed(0)
        .unwrap();
    for n in [1, 3, 16] {
        let samples = made.sample_with_seed(n, n as u64).unwrap();
        assert_eq!(samples.len(), n * 10);
        assert!(samples.iter().all(|&v| v == 0.0 || v == 1.0));
    }
}

#[test]
fn sampler_can_be_abandoned_and_restarted() {
    let made = MadeBuilder::new(5).unwrap().build_with_seed(1).unwrap();
    let mut rng = StdRng::seed_from_u64(0);

    let mut partial = Sampler::new(&made, 4).unwrap();
    partial.step(&mut rng);
    partial.step(&mut rng);
    assert_eq!(partial.position(), 2);
    drop(partial);

    let mut full = Sampler::new(&made, 4).unwrap();
    full.run(&mut rng);
    assert!(full.is_done());
    assert_eq!(full.finish().unwrap().len(), 20);
}

#[test]
fn trained_model_samples_the_training_pattern() {
    // A single repeated pattern is easy to memorize.
    let pattern = [1.0_f32, 0.0, 1.0, 1.0, 0.0, 0.0];
    let rows: Vec<Vec<f32>> = (0..16).map(|_| pattern.to_vec()).collect();
    let train = Dataset::from_rows(&rows).unwrap();

    let mut made = MadeBuilder::new(6)
        .unwrap()
        .hidden_width(32)
        .unwrap()
        .build_with_seed(3)
        .unwrap();
    made.fit(
        &train,
        None,
        FitConfig {
            epochs: 300,
            lr: 5e-2,
            batch_size: 16,
            shuffle: Shuffle::None,
            optimizer: Optimizer::default(),
        },
    )
    .unwrap();

    let samples = made.sample_with_seed(20, 7).unwrap();
    let matches = samples.chunks_exact(6).filter(|s| *s == pattern).count();
    assert!(matches >= 18, "only {matches}/20 samples matched the pattern");
}
