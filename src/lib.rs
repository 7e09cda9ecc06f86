//! MADE: Masked Autoencoder for Distribution Estimation.
//!
//! A feed-forward autoencoder over binary vectors whose weight matrices are gated by
//! fixed connectivity masks, so that output `i` depends only on inputs
//! `1..i-1`. The outputs are then the conditionals of an autoregressive model
//! `p(x) = Π_i p(x_i | x_<i)`, which gives exact likelihoods in one forward pass and
//! ancestral sampling in `D` passes.
//!
//! # How the masks are built
//!
//! - Every unit carries a connectivity id ([`connectivity`]). Inputs and outputs
//!   use `1..=D`; hidden units draw ids uniformly from `[1, D-1]`.
//! - Between two layers, [`mask::build_mask`] connects source `j` to destination
//!   `k` when `dest[k] >= source[j]`, or `dest[k] > source[j]` into the output
//!   layer.
//! - Masks and ids are fixed at construction. Only weights and biases train.
//!
//! # Panics vs `Result`
//!
//! - Low-level hot path (panics on misuse): [`Made::forward`], [`Made::encode`],
//!   [`Made::decode`], [`Made::forward_batch`], [`Made::backward`].
//! - Construction, training, evaluation, sampling and [`Made::predict_into`]
//!   validate inputs and return [`Result`].
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`; samples are vectors of `0.0` / `1.0`.
//! - Layer weights and masks are row-major with shape `(out_dim, in_dim)`.
//! - Batches are flat row-major buffers `(batch_size, input_dim)`.
//!
//! # Quick start
//!
//! ```rust
//! use made::{Dataset, FitConfig, MadeBuilder};
//!
//! # fn main() -> made::Result<()> {
//! let rows = vec![
//!     vec![1.0, 1.0, 0.0, 0.0],
//!     vec![0.0, 0.0, 1.0, 1.0],
//!     vec![1.0, 1.0, 1.0, 1.0],
//! ];
//! let train = Dataset::from_rows(&rows)?;
//!
//! let mut made = MadeBuilder::new(4)?
//!     .hidden_width(32)?
//!     .build_with_seed(0)?;
//!
//! made.fit(&train, None, FitConfig { epochs: 5, ..FitConfig::default() })?;
//!
//! let samples = made.sample_with_seed(2, 0)?;
//! assert_eq!(samples.len(), 2 * 4);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod connectivity;
pub mod data;
pub mod error;
pub mod layer;
pub mod loss;
pub mod made;
pub mod mask;
pub(crate) mod matmul;
pub mod optim;
pub mod sample;
pub mod train;

#[cfg(feature = "serde")]
pub mod serde_model;

pub use activation::Activation;
pub use builder::MadeBuilder;
pub use connectivity::{generate_hidden_ids, identity_ids};
pub use data::Dataset;
pub use error::{Error, Result};
pub use layer::{LayerIds, MaskedLayer};
pub use made::{BatchScratch, Gradients, Made, Scratch, Trainer};
pub use mask::{Mask, MaskMode, build_mask};
pub use optim::{Optimizer, OptimizerState};
pub use sample::Sampler;
pub use train::{EpochReport, EvalReport, FitConfig, FitReport, Shuffle};

/// Build a network with `hidden_layer_count` encoder layers of width `hidden_width`
/// followed by the output layer.
pub fn build_network(
    input_dim: usize,
    hidden_width: usize,
    hidden_layer_count: usize,
    seed: u64,
) -> Result<Made> {
    MadeBuilder::new(input_dim)?
        .hidden_width(hidden_width)?
        .encoder_layers(hidden_layer_count)?
        .build_with_seed(seed)
}
