//! Demo: fit MADE to 4x4 "bars" images and print ancestral samples.
//!
//! Every training image is either a set of horizontal bars or a set of vertical
//! bars, never a mix, so a good model only samples those two families.
//! Set `RUST_LOG=debug` to see the layer connectivity.

use log::info;

use made::{Dataset, FitConfig, MadeBuilder, Optimizer, Shuffle};

const SIDE: usize = 4;

fn bars_dataset() -> made::Result<Dataset> {
    let mut rows = Vec::new();
    for bits in 0..(1u32 << SIDE) {
        let mut horizontal = vec![0.0_f32; SIDE * SIDE];
        let mut vertical = vec![0.0_f32; SIDE * SIDE];
        for r in 0..SIDE {
            for c in 0..SIDE {
                if bits & (1 << r) != 0 {
                    horizontal[r * SIDE + c] = 1.0;
                }
                if bits & (1 << c) != 0 {
                    vertical[r * SIDE + c] = 1.0;
                }
            }
        }
        rows.push(horizontal);
        rows.push(vertical);
    }
    Dataset::from_rows(&rows)
}

fn render(sample: &[f32]) -> String {
    sample
        .chunks(SIDE)
        .map(|row| {
            row.iter()
                .map(|&v| if v > 0.5 { '#' } else { '.' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_bars(sample: &[f32]) -> bool {
    let rows_uniform = sample
        .chunks(SIDE)
        .all(|row| row.iter().all(|&v| v == row[0]));
    let cols_uniform = (0..SIDE).all(|c| (0..SIDE).all(|r| sample[r * SIDE + c] == sample[c]));
    rows_uniform || cols_uniform
}

fn main() -> made::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let train = bars_dataset()?;
    let mut made = MadeBuilder::new(SIDE * SIDE)?
        .hidden_width(128)?
        .encoder_layers(1)?
        .decoder_layers(1)?
        .build_with_seed(0)?;

    let report = made.fit(
        &train,
        Some(&train),
        FitConfig {
            epochs: 300,
            lr: 1e-2,
            batch_size: 8,
            shuffle: Shuffle::Seeded(0),
            optimizer: Optimizer::default(),
        },
    )?;
    let eval = made.evaluate(&train)?;
    info!(
        "final train loss {:.4}, nll {:.3} nats (uniform over the {} patterns is {:.3})",
        report.final_loss(),
        eval.nll,
        train.len(),
        (train.len() as f32).ln()
    );

    let count = 8;
    let samples = made.sample_with_seed(count, 1)?;
    let valid = samples
        .chunks(SIDE * SIDE)
        .filter(|s| is_bars(s))
        .count();
    for (i, sample) in samples.chunks(SIDE * SIDE).enumerate() {
        println!("sample {i}:\n{}\n", render(sample));
    }
    println!("{valid}/{count} samples are valid bar patterns");

    Ok(())
}
