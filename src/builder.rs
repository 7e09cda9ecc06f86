//! Model builder.
//!
//! `MadeBuilder` fixes the input dimensionality `D`, the hidden width, and how many
//! hidden layers sit in the encoder and in the decoder. Building threads
//! connectivity ids through the stack:
//!
//! - layer 0 reads the input ids `1..=D` and draws its own hidden ids
//! - every further hidden layer reads its predecessor's ids and draws new ones
//! - the output layer reads the last hidden ids, uses `1..=D` as its own ids and
//!   masks strictly
//!
//! Hidden layers use ReLU; the output layer uses a sigmoid.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::connectivity::identity_ids;
use crate::mask::MaskMode;
use crate::{Activation, Error, LayerIds, Made, MaskedLayer, Result};

const DEFAULT_HIDDEN_WIDTH: usize = 128;

#[derive(Debug, Clone)]
/// Builder for a `Made`.
///
/// ```rust
/// use made::MadeBuilder;
///
/// # fn main() -> made::Result<()> {
/// let made = MadeBuilder::new(16)?
///     .hidden_width(64)?
///     .encoder_layers(2)?
///     .build_with_seed(0)?;
/// assert_eq!(made.num_layers(), 3);
/// # Ok(())
/// # }
/// ```
pub struct MadeBuilder {
    input_dim: usize,
    hidden_width: usize,
    encoder_layers: usize,
    decoder_layers: usize,
}

impl MadeBuilder {
    /// Start building a model over binary vectors of length `input_dim`.
    ///
    /// One encoder layer, no decoder hidden layers, hidden width 128.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim <= 1 {
            return Err(Error::InvalidConfig(format!(
                "input_dim must be > 1, got {input_dim}"
            )));
        }
        Ok(Self {
            input_dim,
            hidden_width: DEFAULT_HIDDEN_WIDTH,
            encoder_layers: 1,
            decoder_layers: 0,
        })
    }

    /// Width of every hidden layer.
    pub fn hidden_width(mut self, width: usize) -> Result<Self> {
        if width == 0 {
            return Err(Error::InvalidConfig("hidden width must be > 0".to_owned()));
        }
        self.hidden_width = width;
        Ok(self)
    }

    /// Number of hidden layers in the encoder. The last one produces the latent.
    pub fn encoder_layers(mut self, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidConfig(
                "encoder must have at least one layer".to_owned(),
            ));
        }
        self.encoder_layers = count;
        Ok(self)
    }

    /// Number of hidden layers in the decoder, before the output layer.
    pub fn decoder_layers(mut self, count: usize) -> Result<Self> {
        self.decoder_layers = count;
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Made> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG for both hidden ids and weights.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Made> {
        let identity = identity_ids(self.input_dim);
        let hidden_count = self.encoder_layers + self.decoder_layers;

        let mut layers = Vec::with_capacity(hidden_count + 1);
        let mut prev_ids = identity.clone();
        for idx in 0..hidden_count {
            let layer = MaskedLayer::new_with_rng(
                prev_ids.len(),
                &prev_ids,
                self.hidden_width,
                LayerIds::Generate {
                    input_dim: self.input_dim,
                },
                MaskMode::Hidden,
                Activation::ReLU,
                rng,
            )?;
            debug!(
                "hidden layer {idx}: {} -> {}, ids in [{}, {}], {} of {} weights live",
                layer.in_dim(),
                layer.out_dim(),
                layer.ids().iter().min().copied().unwrap_or(0),
                layer.ids().iter().max().copied().unwrap_or(0),
                layer.mask().count_ones(),
                layer.weights().len()
            );
            prev_ids = layer.ids().to_vec();
            layers.push(layer);
        }

        let output = MaskedLayer::new_with_rng(
            prev_ids.len(),
            &prev_ids,
            self.input_dim,
            LayerIds::Explicit(identity),
            MaskMode::Output,
            Activation::Sigmoid,
            rng,
        )?;
        debug!(
            "output layer: {} -> {}, {} of {} weights live",
            output.in_dim(),
            output.out_dim(),
            output.mask().count_ones(),
            output.weights().len()
        );
        layers.push(output);

        Made::from_layers(layers, self.encoder_layers)
    }
}
