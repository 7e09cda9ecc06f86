use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::connectivity::generate_hidden_ids;
use crate::mask::{Mask, MaskMode, build_mask};
use crate::{Activation, Error, Result};

/// Where a layer's own connectivity ids come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerIds {
    /// Draw hidden ids uniformly from `[1, input_dim - 1]`.
    Generate { input_dim: usize },
    /// Use exactly these ids (length must equal `out_dim`).
    Explicit(Vec<usize>),
}

/// Dense affine layer whose weights are gated by a fixed connectivity mask.
#[derive(Debug, Clone)]
pub struct MaskedLayer {
    in_dim: usize,
    out_dim: usize,
    activation: Activation,
    mode: MaskMode,
    ids: Vec<usize>,
    /// Shape (out_dim, in_dim), never trained.
    mask: Mask,
    /// Row-major matrix with shape (out_dim, in_dim).
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl MaskedLayer {
    /// Build a layer and initialize its weights from `rng`.
    ///
    /// `prev_ids` are the connectivity ids of the layer feeding this one, so
    /// `prev_ids.len()` must equal `in_dim`.
    ///
    /// Weights are drawn from `N(0, 2 / (in_dim + out_dim))`; biases start at zero.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        prev_ids: &[usize],
        out_dim: usize,
        ids: LayerIds,
        mode: MaskMode,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        let ids = match ids {
            LayerIds::Generate { input_dim } => generate_hidden_ids(out_dim, input_dim, rng)?,
            LayerIds::Explicit(ids) => ids,
        };
        validate_dims(in_dim, prev_ids, out_dim, &ids)?;

        let std = (2.0 / (in_dim + out_dim) as f32).sqrt();
        let normal = Normal::new(0.0_f32, std)
            .map_err(|e| Error::InvalidConfig(format!("weight init std {std}: {e}")))?;
        let weights = (0..in_dim * out_dim).map(|_| normal.sample(rng)).collect();

        Ok(Self {
            in_dim,
            out_dim,
            activation,
            mode,
            mask: build_mask(prev_ids, &ids, mode),
            ids,
            weights,
            biases: vec![0.0; out_dim],
        })
    }

    /// Rebuild a layer from stored ids and parameters.
    ///
    /// The mask is recomputed from `prev_ids` and `ids`; it is never read from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        in_dim: usize,
        prev_ids: &[usize],
        out_dim: usize,
        ids: Vec<usize>,
        mode: MaskMode,
        activation: Activation,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Result<Self> {
        validate_dims(in_dim, prev_ids, out_dim, &ids)?;
        if weights.len() != in_dim * out_dim {
            return Err(Error::InvalidShape(format!(
                "weights length {} does not match out_dim * in_dim ({out_dim} * {in_dim})",
                weights.len()
            )));
        }
        if biases.len() != out_dim {
            return Err(Error::InvalidShape(format!(
                "biases length {} does not match out_dim {out_dim}",
                biases.len()
            )));
        }
        if weights.iter().chain(&biases).any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "layer parameters must be finite".to_owned(),
            ));
        }

        Ok(Self {
            in_dim,
            out_dim,
            activation,
            mode,
            mask: build_mask(prev_ids, &ids, mode),
            ids,
            weights,
            biases,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn mode(&self) -> MaskMode {
        self.mode
    }

    /// This layer's connectivity ids, one per output unit.
    #[inline]
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    #[inline]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Raw trainable weights. Entries under a zero mask never reach the output.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    #[inline]
    pub fn biases_mut(&mut self) -> &mut [f32] {
        &mut self.biases
    }

    /// Write `weights ⊙ mask` into `out`.
    #[inline]
    pub fn masked_weights_into(&self, out: &mut [f32]) {
        assert_eq!(
            out.len(),
            self.weights.len(),
            "masked weight buffer len {} does not match weights len {}",
            out.len(),
            self.weights.len()
        );
        for ((o, &w), &m) in out.iter_mut().zip(&self.weights).zip(self.mask.as_slice()) {
            *o = w * m;
        }
    }

    /// Forward pass for a single sample.
    ///
    /// Computes `outputs = activation(inputs · (W ⊙ M)^T + b)`.
    ///
    /// Shape contract:
    /// - `inputs.len() == self.in_dim`
    /// - `outputs.len() == self.out_dim`
    #[inline]
    pub fn forward(&self, inputs: &[f32], outputs: &mut [f32]) {
        debug_assert_eq!(inputs.len(), self.in_dim);
        debug_assert_eq!(outputs.len(), self.out_dim);

        let mask = self.mask.as_slice();
        for o in 0..self.out_dim {
            let mut sum = self.biases[o];
            let row = o * self.in_dim;
            for i in 0..self.in_dim {
                let w = self.weights[row + i] * mask[row + i];
                sum = w.mul_add(inputs[i], sum);
            }
            outputs[o] = self.activation.forward(sum);
        }
    }

    /// Backward pass for a single sample.
    ///
    /// Overwrite semantics: `d_inputs`, `d_weights` and `d_biases` are overwritten.
    /// `d_weights` is zero wherever the mask is zero.
    ///
    /// Inputs:
    /// - `inputs`: the same inputs passed to `forward`
    /// - `outputs`: the outputs previously produced by `forward` (post-activation)
    /// - `d_outputs`: upstream gradient dL/d(outputs)
    #[inline]
    pub fn backward(
        &self,
        inputs: &[f32],
        outputs: &[f32],
        d_outputs: &[f32],
        d_inputs: &mut [f32],
        d_weights: &mut [f32],
        d_biases: &mut [f32],
    ) {
        debug_assert_eq!(outputs.len(), self.out_dim);
        debug_assert_eq!(d_outputs.len(), self.out_dim);
        debug_assert_eq!(d_biases.len(), self.out_dim);

        // Stage dL/dz in `d_biases`; it is exactly the bias gradient.
        for ((d_z, &d_y), &y) in d_biases.iter_mut().zip(d_outputs).zip(outputs) {
            *d_z = d_y * self.activation.grad_from_output(y);
        }
        self.backward_affine(inputs, d_inputs, d_weights, d_biases);
    }

    /// Backward pass given dL/dz, the gradient w.r.t. the pre-activation.
    ///
    /// Used for the output layer, whose loss gradient already includes the sigmoid.
    #[inline]
    pub fn backward_from_pre_activation(
        &self,
        inputs: &[f32],
        d_pre_activation: &[f32],
        d_inputs: &mut [f32],
        d_weights: &mut [f32],
        d_biases: &mut [f32],
    ) {
        debug_assert_eq!(d_pre_activation.len(), self.out_dim);
        debug_assert_eq!(d_biases.len(), self.out_dim);

        d_biases.copy_from_slice(d_pre_activation);
        self.backward_affine(inputs, d_inputs, d_weights, d_biases);
    }

    /// `d_z` is read from `d_biases`.
    #[inline]
    fn backward_affine(
        &self,
        inputs: &[f32],
        d_inputs: &mut [f32],
        d_weights: &mut [f32],
        d_z: &[f32],
    ) {
        debug_assert_eq!(inputs.len(), self.in_dim);
        debug_assert_eq!(d_inputs.len(), self.in_dim);
        debug_assert_eq!(d_weights.len(), self.weights.len());

        d_inputs.fill(0.0);

        let mask = self.mask.as_slice();
        for (o, &d_z) in d_z.iter().enumerate() {
            let row = o * self.in_dim;
            for i in 0..self.in_dim {
                let m = mask[row + i];
                d_weights[row + i] = d_z * inputs[i] * m;
                d_inputs[i] = (self.weights[row + i] * m).mul_add(d_z, d_inputs[i]);
            }
        }
    }

    /// `param -= lr * d_param`.
    #[inline]
    pub(crate) fn sgd_step(&mut self, d_weights: &[f32], d_biases: &[f32], lr: f32) {
        debug_assert_eq!(d_weights.len(), self.weights.len());
        debug_assert_eq!(d_biases.len(), self.biases.len());

        for (w, &g) in self.weights.iter_mut().zip(d_weights) {
            *w -= lr * g;
        }
        for (b, &g) in self.biases.iter_mut().zip(d_biases) {
            *b -= lr * g;
        }
    }
}

fn validate_dims(in_dim: usize, prev_ids: &[usize], out_dim: usize, ids: &[usize]) -> Result<()> {
    if in_dim == 0 || out_dim == 0 {
        return Err(Error::InvalidConfig(format!(
            "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
        )));
    }
    if prev_ids.len() != in_dim {
        return Err(Error::InvalidShape(format!(
            "predecessor ids length {} does not match in_dim {in_dim}",
            prev_ids.len()
        )));
    }
    if ids.len() != out_dim {
        return Err(Error::InvalidShape(format!(
            "layer ids length {} does not match out_dim {out_dim}",
            ids.len()
        )));
    }
    Ok(())
}
