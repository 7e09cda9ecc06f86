use std::ops::Range;

use crate::connectivity::identity_ids;
use crate::mask::{Mask, MaskMode, build_mask};
use crate::matmul::add_inputs_times_weights_t;
use crate::{Activation, Error, MaskedLayer, Result, loss};

/// Masked autoencoder: an encoder stack followed by a decoder stack of masked layers.
///
/// Output `i` is a Bernoulli probability for `x_i` that depends on `x_1 .. x_{i-1}`
/// only. The masks alone guarantee this, whatever the weights are.
#[derive(Debug, Clone)]
pub struct Made {
    input_dim: usize,
    /// Number of leading layers that form the encoder.
    encoder_len: usize,
    layers: Vec<MaskedLayer>,
}

/// Reusable buffers for `Made::forward`.
///
/// Holds every layer output of the most recent pass, so both the latent and the
/// probabilities can be read back.
#[derive(Debug, Clone)]
pub struct Scratch {
    layer_outputs: Vec<Vec<f32>>,
    latent_idx: usize,
}

/// Reusable buffers for `Made::forward_batch`.
///
/// Layer outputs are flat row-major `(batch_size, out_dim)` buffers.
#[derive(Debug, Clone)]
pub struct BatchScratch {
    batch_size: usize,
    layer_outputs: Vec<Vec<f32>>,
    masked_weights: Vec<Vec<f32>>,
    latent_idx: usize,
}

/// Parameter gradients for a `Made` (overwrite semantics).
///
/// Allocate once via `Made::gradients()` and reuse across training steps.
#[derive(Debug, Clone)]
pub struct Gradients {
    d_weights: Vec<Vec<f32>>,
    d_biases: Vec<Vec<f32>>,

    // Gradient w.r.t. each layer output; the last entry holds the loss gradient
    // w.r.t. the output logits.
    d_layer_outputs: Vec<Vec<f32>>,

    d_input: Vec<f32>,
}

impl Made {
    /// Assemble a network from already-built layers, checking the id chain.
    ///
    /// Every mask must equal the one derived from its predecessor's ids, hidden ids
    /// must lie in `[1, D-1]`, hidden layers must use ReLU, and the last layer must
    /// be a sigmoid output-mode layer with identity ids.
    pub(crate) fn from_layers(layers: Vec<MaskedLayer>, encoder_len: usize) -> Result<Self> {
        let Some(last) = layers.last() else {
            return Err(Error::InvalidConfig(
                "made must have at least one layer".to_owned(),
            ));
        };
        if encoder_len == 0 || encoder_len >= layers.len() {
            return Err(Error::InvalidConfig(format!(
                "encoder length {encoder_len} must be in 1..{}",
                layers.len()
            )));
        }

        let input_dim = last.out_dim();
        if input_dim <= 1 {
            return Err(Error::InvalidConfig(format!(
                "input_dim must be > 1, got {input_dim}"
            )));
        }
        let identity = identity_ids(input_dim);
        if last.mode() != MaskMode::Output || last.ids() != identity.as_slice() {
            return Err(Error::InvalidShape(
                "last layer must be output-mode with identity ids".to_owned(),
            ));
        }
        if last.activation() != Activation::Sigmoid {
            return Err(Error::InvalidData(format!(
                "last layer must use a sigmoid, got {:?}",
                last.activation()
            )));
        }

        let mut prev_ids: &[usize] = &identity;
        for (idx, layer) in layers.iter().enumerate() {
            if layer.in_dim() != prev_ids.len() {
                return Err(Error::InvalidShape(format!(
                    "layer {idx} in_dim {} does not match previous width {}",
                    layer.in_dim(),
                    prev_ids.len()
                )));
            }
            let is_last = idx + 1 == layers.len();
            if !is_last {
                if layer.mode() != MaskMode::Hidden {
                    return Err(Error::InvalidShape(format!(
                        "layer {idx} is not the last layer but uses output-mode masking"
                    )));
                }
                if layer.activation() != Activation::ReLU {
                    return Err(Error::InvalidData(format!(
                        "hidden layer {idx} must use ReLU, got {:?}",
                        layer.activation()
                    )));
                }
                if let Some(&bad) = layer.ids().iter().find(|&&m| m == 0 || m >= input_dim) {
                    return Err(Error::InvalidData(format!(
                        "layer {idx} has hidden id {bad} outside [1, {}]",
                        input_dim - 1
                    )));
                }
            }
            if *layer.mask() != build_mask(prev_ids, layer.ids(), layer.mode()) {
                return Err(Error::InvalidData(format!(
                    "layer {idx} mask does not match its connectivity ids"
                )));
            }
            prev_ids = layer.ids();
        }

        Ok(Self {
            input_dim,
            encoder_len,
            layers,
        })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Width of the first hidden layer.
    #[inline]
    pub fn hidden_width(&self) -> usize {
        self.layers[0].out_dim()
    }

    /// Width of the encoder output.
    #[inline]
    pub fn latent_dim(&self) -> usize {
        self.layers[self.encoder_len - 1].out_dim()
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn encoder_len(&self) -> usize {
        self.encoder_len
    }

    #[inline]
    pub fn layers(&self) -> &[MaskedLayer] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&MaskedLayer> {
        self.layers.get(idx)
    }

    /// Mutable access to a layer's trainable parameters. Ids and mask stay fixed.
    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut MaskedLayer> {
        self.layers.get_mut(idx)
    }

    pub fn scratch(&self) -> Scratch {
        Scratch::new(self)
    }

    pub fn batch_scratch(&self, batch_size: usize) -> BatchScratch {
        BatchScratch::new(self, batch_size)
    }

    pub fn gradients(&self) -> Gradients {
        Gradients::new(self)
    }

    /// Convenience constructor: allocate all training buffers.
    #[inline]
    pub fn trainer(&self) -> Trainer {
        Trainer::new(self)
    }

    /// End-to-end reachability: entry `(i, j)` is set when some path connects
    /// input `j` to output `i`.
    ///
    /// Always strictly lower triangular.
    pub fn connectivity(&self) -> Mask {
        let mut reach = self.layers[0].mask().clone();
        for layer in &self.layers[1..] {
            reach = layer
                .mask()
                .compose(&reach)
                .expect("layer shapes are validated at construction");
        }
        reach
    }

    /// Run the encoder on a single sample and return the latent vector.
    ///
    /// Shape contract:
    /// - `input.len() == self.input_dim()`
    /// - `scratch` must be built for this `Made`
    pub fn encode<'a>(&self, input: &[f32], scratch: &'a mut Scratch) -> &'a [f32] {
        self.check_input(input.len());
        self.check_scratch(scratch);
        self.run_layers(0..self.encoder_len, input, scratch);
        scratch.latent()
    }

    /// Run the decoder on a latent vector and return per-dimension probabilities.
    ///
    /// Shape contract:
    /// - `latent.len() == self.latent_dim()`
    pub fn decode<'a>(&self, latent: &[f32], scratch: &'a mut Scratch) -> &'a [f32] {
        assert_eq!(
            latent.len(),
            self.latent_dim(),
            "latent len {} does not match model latent_dim {}",
            latent.len(),
            self.latent_dim()
        );
        self.check_scratch(scratch);
        self.run_layers(self.encoder_len..self.layers.len(), latent, scratch);
        scratch.output()
    }

    /// Forward pass for a single sample.
    ///
    /// Returns the probabilities; the latent stays readable via `scratch.latent()`.
    pub fn forward<'a>(&self, input: &[f32], scratch: &'a mut Scratch) -> &'a [f32] {
        self.check_input(input.len());
        self.check_scratch(scratch);
        self.run_layers(0..self.layers.len(), input, scratch);
        scratch.output()
    }

    /// Shape-checked forward pass that copies the probabilities into `out`.
    pub fn predict_into(&self, input: &[f32], scratch: &mut Scratch, out: &mut [f32]) -> Result<()> {
        if input.len() != self.input_dim {
            return Err(Error::InvalidShape(format!(
                "input len {} does not match model input_dim {}",
                input.len(),
                self.input_dim
            )));
        }
        if out.len() != self.input_dim {
            return Err(Error::InvalidShape(format!(
                "output len {} does not match model input_dim {}",
                out.len(),
                self.input_dim
            )));
        }
        if scratch.layer_outputs.len() != self.layers.len() {
            return Err(Error::InvalidShape(
                "scratch was not built for this model".to_owned(),
            ));
        }
        out.copy_from_slice(self.forward(input, scratch));
        Ok(())
    }

    /// Log-likelihood `ln p(x)` of a binary vector under the model, in nats.
    pub fn log_prob(&self, input: &[f32], scratch: &mut Scratch) -> f32 {
        let probs = self.forward(input, scratch);
        loss::log_likelihood(probs, input)
    }

    /// Forward pass over a flat row-major batch `(batch_size, input_dim)`.
    ///
    /// Returns `(reconstruction, latent)`, both flat row-major.
    pub fn forward_batch<'a>(
        &self,
        inputs: &[f32],
        scratch: &'a mut BatchScratch,
    ) -> (&'a [f32], &'a [f32]) {
        let batch = scratch.batch_size;
        assert_eq!(
            inputs.len(),
            batch * self.input_dim,
            "inputs len {} does not match batch_size * input_dim ({batch} * {})",
            inputs.len(),
            self.input_dim
        );
        assert_eq!(
            scratch.layer_outputs.len(),
            self.layers.len(),
            "batch scratch has {} layer outputs, model has {} layers",
            scratch.layer_outputs.len(),
            self.layers.len()
        );

        for (idx, layer) in self.layers.iter().enumerate() {
            layer.masked_weights_into(&mut scratch.masked_weights[idx]);
            let weights = &scratch.masked_weights[idx];

            let (left, right) = scratch.layer_outputs.split_at_mut(idx);
            let prev: &[f32] = if idx == 0 { inputs } else { &left[idx - 1] };
            let out = &mut right[0];
            assert_eq!(
                out.len(),
                batch * layer.out_dim(),
                "batch scratch layer {idx} len {} does not match batch_size * out_dim",
                out.len()
            );

            for row in out.chunks_exact_mut(layer.out_dim()) {
                row.copy_from_slice(layer.biases());
            }
            add_inputs_times_weights_t(batch, layer.in_dim(), layer.out_dim(), prev, weights, out);
            let act = layer.activation();
            for v in out.iter_mut() {
                *v = act.forward(*v);
            }
        }

        let scratch: &'a BatchScratch = scratch;
        (scratch.output(), scratch.latent())
    }

    /// Backward pass for a single sample, using the internal `d_output` buffer.
    ///
    /// You must call `forward` first using the same `input` and `scratch`, then write
    /// the gradient w.r.t. the output logits into `grads.d_output_mut()`, as
    /// `loss::binary_cross_entropy_backward` does. The output sigmoid is not
    /// differentiated again here.
    ///
    /// Returns dL/d(input).
    pub fn backward<'a>(
        &self,
        input: &[f32],
        scratch: &Scratch,
        grads: &'a mut Gradients,
    ) -> &'a [f32] {
        self.check_input(input.len());
        self.check_scratch(scratch);
        assert_eq!(
            grads.d_weights.len(),
            self.layers.len(),
            "grads has {} layers, model has {} layers",
            grads.d_weights.len(),
            self.layers.len()
        );

        let last = self.layers.len() - 1;
        for idx in (0..self.layers.len()).rev() {
            let layer = &self.layers[idx];
            let layer_input: &[f32] = if idx == 0 {
                input
            } else {
                &scratch.layer_outputs[idx - 1]
            };
            let layer_output: &[f32] = &scratch.layer_outputs[idx];

            // `d_inputs` of this layer is `d_outputs` of the previous one.
            let (left, right) = grads.d_layer_outputs.split_at_mut(idx);
            let d_inputs: &mut [f32] = if idx == 0 {
                &mut grads.d_input
            } else {
                &mut left[idx - 1]
            };
            if idx == last {
                layer.backward_from_pre_activation(
                    layer_input,
                    &right[0],
                    d_inputs,
                    &mut grads.d_weights[idx],
                    &mut grads.d_biases[idx],
                );
            } else {
                layer.backward(
                    layer_input,
                    layer_output,
                    &right[0],
                    d_inputs,
                    &mut grads.d_weights[idx],
                    &mut grads.d_biases[idx],
                );
            }
        }

        &grads.d_input
    }

    /// Applies an SGD update to all layers.
    #[inline]
    pub fn sgd_step(&mut self, grads: &Gradients, lr: f32) {
        assert!(
            lr.is_finite() && lr > 0.0,
            "learning rate must be finite and > 0"
        );
        assert_eq!(
            self.layers.len(),
            grads.d_weights.len(),
            "grads has {} layers, model has {} layers",
            grads.d_weights.len(),
            self.layers.len()
        );

        for (idx, layer) in self.layers.iter_mut().enumerate() {
            layer.sgd_step(&grads.d_weights[idx], &grads.d_biases[idx], lr);
        }
    }

    fn run_layers(&self, range: Range<usize>, input: &[f32], scratch: &mut Scratch) {
        let start = range.start;
        for idx in range {
            let layer = &self.layers[idx];
            if idx == start {
                layer.forward(input, &mut scratch.layer_outputs[idx]);
            } else {
                // Borrow the previous output immutably and the current output mutably.
                let (left, right) = scratch.layer_outputs.split_at_mut(idx);
                layer.forward(&left[idx - 1], &mut right[0]);
            }
        }
    }

    #[inline]
    fn check_input(&self, len: usize) {
        assert_eq!(
            len, self.input_dim,
            "input len {len} does not match model input_dim {}",
            self.input_dim
        );
    }

    #[inline]
    fn check_scratch(&self, scratch: &Scratch) {
        assert_eq!(
            scratch.layer_outputs.len(),
            self.layers.len(),
            "scratch has {} layer outputs, model has {} layers",
            scratch.layer_outputs.len(),
            self.layers.len()
        );
        for (idx, (out, layer)) in scratch.layer_outputs.iter().zip(&self.layers).enumerate() {
            assert_eq!(
                out.len(),
                layer.out_dim(),
                "scratch layer {idx} output len {} does not match layer out_dim {}",
                out.len(),
                layer.out_dim()
            );
        }
    }
}

/// Reusable buffers for training a specific `Made`.
#[derive(Debug, Clone)]
pub struct Trainer {
    pub scratch: Scratch,
    pub grads: Gradients,
}

impl Trainer {
    pub fn new(made: &Made) -> Self {
        Self {
            scratch: Scratch::new(made),
            grads: Gradients::new(made),
        }
    }
}

impl Scratch {
    pub fn new(made: &Made) -> Self {
        Self {
            layer_outputs: made
                .layers
                .iter()
                .map(|layer| vec![0.0; layer.out_dim()])
                .collect(),
            latent_idx: made.encoder_len - 1,
        }
    }

    /// Probabilities from the most recent forward/decode.
    #[inline]
    pub fn output(&self) -> &[f32] {
        self.layer_outputs
            .last()
            .expect("scratch must have at least one layer output")
    }

    /// Latent from the most recent forward/encode.
    #[inline]
    pub fn latent(&self) -> &[f32] {
        &self.layer_outputs[self.latent_idx]
    }
}

impl BatchScratch {
    /// Panics if `batch_size == 0`.
    pub fn new(made: &Made, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");
        Self {
            batch_size,
            layer_outputs: made
                .layers
                .iter()
                .map(|layer| vec![0.0; batch_size * layer.out_dim()])
                .collect(),
            masked_weights: made
                .layers
                .iter()
                .map(|layer| vec![0.0; layer.weights().len()])
                .collect(),
            latent_idx: made.encoder_len - 1,
        }
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[inline]
    pub fn output(&self) -> &[f32] {
        self.layer_outputs
            .last()
            .expect("scratch must have at least one layer output")
    }

    #[inline]
    pub fn latent(&self) -> &[f32] {
        &self.layer_outputs[self.latent_idx]
    }
}

impl Gradients {
    pub fn new(made: &Made) -> Self {
        let mut d_weights = Vec::with_capacity(made.layers.len());
        let mut d_biases = Vec::with_capacity(made.layers.len());
        let mut d_layer_outputs = Vec::with_capacity(made.layers.len());

        for layer in &made.layers {
            d_weights.push(vec![0.0; layer.in_dim() * layer.out_dim()]);
            d_biases.push(vec![0.0; layer.out_dim()]);
            d_layer_outputs.push(vec![0.0; layer.out_dim()]);
        }

        Self {
            d_weights,
            d_biases,
            d_layer_outputs,
            d_input: vec![0.0; made.input_dim],
        }
    }

    /// Mutable view of the loss gradient w.r.t. the output logits.
    #[inline]
    pub fn d_output_mut(&mut self) -> &mut [f32] {
        self.d_layer_outputs
            .last_mut()
            .expect("made must have at least one layer")
    }

    #[inline]
    pub fn d_input(&self) -> &[f32] {
        &self.d_input
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.d_weights.len()
    }

    #[inline]
    pub fn d_weights(&self, layer_idx: usize) -> &[f32] {
        &self.d_weights[layer_idx]
    }

    #[inline]
    pub fn d_biases(&self, layer_idx: usize) -> &[f32] {
        &self.d_biases[layer_idx]
    }

    #[inline]
    pub fn d_weights_mut(&mut self, layer_idx: usize) -> &mut [f32] {
        &mut self.d_weights[layer_idx]
    }

    #[inline]
    pub fn d_biases_mut(&mut self, layer_idx: usize) -> &mut [f32] {
        &mut self.d_biases[layer_idx]
    }

    /// Zero all parameter gradients.
    pub fn zero(&mut self) {
        for g in self.d_weights.iter_mut().chain(self.d_biases.iter_mut()) {
            g.fill(0.0);
        }
    }

    /// `self += other` over parameter gradients.
    pub fn accumulate(&mut self, other: &Gradients) {
        assert_eq!(
            self.d_weights.len(),
            other.d_weights.len(),
            "gradient layer counts differ"
        );
        let pairs = self
            .d_weights
            .iter_mut()
            .zip(&other.d_weights)
            .chain(self.d_biases.iter_mut().zip(&other.d_biases));
        for (acc, g) in pairs {
            for (a, &b) in acc.iter_mut().zip(g) {
                *a += b;
            }
        }
    }

    /// Multiply all parameter gradients by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for g in self.d_weights.iter_mut().chain(self.d_biases.iter_mut()) {
            for v in g.iter_mut() {
                *v *= factor;
            }
        }
    }
}
