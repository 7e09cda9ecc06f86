//! Model checkpoints (feature: `serde`).
//!
//! A versioned JSON format for `Made`. Connectivity ids and parameters are stored;
//! masks are not. Loading rebuilds every mask from the stored ids and runs the same
//! chain checks as construction, so a checkpoint with out-of-range hidden ids or a
//! broken layer chain is rejected instead of yielding a non-autoregressive model.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::connectivity::identity_ids;
use crate::mask::MaskMode;
use crate::{Activation, Error, Made, MaskedLayer, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedMade {
    pub format_version: u32,
    pub encoder_layers: usize,
    pub layers: Vec<SerializedLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLayer {
    pub in_dim: usize,
    pub out_dim: usize,
    pub activation: SerializedActivation,
    pub output_mode: bool,
    pub ids: Vec<usize>,
    /// Row-major (out_dim, in_dim), raw (unmasked) values.
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializedActivation {
    Relu,
    Sigmoid,
}

impl From<Activation> for SerializedActivation {
    fn from(value: Activation) -> Self {
        match value {
            Activation::ReLU => SerializedActivation::Relu,
            Activation::Sigmoid => SerializedActivation::Sigmoid,
        }
    }
}

impl From<SerializedActivation> for Activation {
    fn from(value: SerializedActivation) -> Self {
        match value {
            SerializedActivation::Relu => Activation::ReLU,
            SerializedActivation::Sigmoid => Activation::Sigmoid,
        }
    }
}

impl From<&Made> for SerializedMade {
    fn from(model: &Made) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            encoder_layers: model.encoder_len(),
            layers: model.layers().iter().map(SerializedLayer::from).collect(),
        }
    }
}

impl From<&MaskedLayer> for SerializedLayer {
    fn from(layer: &MaskedLayer) -> Self {
        Self {
            in_dim: layer.in_dim(),
            out_dim: layer.out_dim(),
            activation: layer.activation().into(),
            output_mode: layer.mode() == MaskMode::Output,
            ids: layer.ids().to_vec(),
            weights: layer.weights().to_vec(),
            biases: layer.biases().to_vec(),
        }
    }
}

impl TryFrom<SerializedMade> for Made {
    type Error = Error;

    fn try_from(value: SerializedMade) -> std::result::Result<Self, Self::Error> {
        if value.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::Checkpoint(format!(
                "unsupported model format_version {}; expected {}",
                value.format_version, MODEL_FORMAT_VERSION
            )));
        }
        let Some(last) = value.layers.last() else {
            return Err(Error::Checkpoint(
                "serialized model must have at least one layer".to_owned(),
            ));
        };

        let mut prev_ids = identity_ids(last.out_dim);
        let mut layers = Vec::with_capacity(value.layers.len());
        for (i, layer) in value.layers.into_iter().enumerate() {
            let mode = if layer.output_mode {
                MaskMode::Output
            } else {
                MaskMode::Hidden
            };
            let ids = layer.ids.clone();
            let l = MaskedLayer::from_parts(
                layer.in_dim,
                &prev_ids,
                layer.out_dim,
                layer.ids,
                mode,
                layer.activation.into(),
                layer.weights,
                layer.biases,
            )
            .map_err(|e| Error::InvalidData(format!("layer {i} invalid: {e}")))?;
            layers.push(l);
            prev_ids = ids;
        }

        Made::from_layers(layers, value.encoder_layers)
    }
}

impl Made {
    /// Serialize the model to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&SerializedMade::from(self))
            .map_err(|e| Error::Checkpoint(format!("failed to serialize model: {e}")))
    }

    /// Parse a model from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedMade = serde_json::from_str(s)
            .map_err(|e| Error::Checkpoint(format!("failed to parse model json: {e}")))?;
        ser.try_into()
    }

    /// Save the model to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, s)
            .map_err(|e| Error::Checkpoint(format!("failed to write {}: {e}", p.display())))
    }

    /// Load a model from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::Checkpoint(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::MadeBuilder;

    fn made() -> Made {
        MadeBuilder::new(5)
            .unwrap()
            .hidden_width(8)
            .unwrap()
            .decoder_layers(1)
            .unwrap()
            .build_with_seed(17)
            .unwrap()
    }

    #[test]
    fn json_roundtrip_preserves_structure_and_outputs() {
        let original = made();
        let json = original.to_json_string_pretty().unwrap();
        let loaded = Made::from_json_str(&json).unwrap();

        assert_eq!(loaded.encoder_len(), original.encoder_len());
        for (a, b) in original.layers().iter().zip(loaded.layers()) {
            assert_eq!(a.ids(), b.ids());
            assert_eq!(a.mask(), b.mask());
        }

        let x = [1.0_f32, 0.0, 1.0, 1.0, 0.0];
        let p_a = original.forward(&x, &mut original.scratch()).to_vec();
        let p_b = loaded.forward(&x, &mut loaded.scratch()).to_vec();
        for (a, b) in p_a.iter().zip(&p_b) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_hidden_id_that_sees_every_input() {
        let mut ser = SerializedMade::from(&made());
        ser.layers[0].ids[0] = 5;
        let err = Made::try_from(ser).unwrap_err();
        assert!(format!("{err}").contains("hidden id 5"));
    }

    #[test]
    fn rejects_non_strict_output_layer() {
        let mut ser = SerializedMade::from(&made());
        ser.layers.last_mut().unwrap().output_mode = false;
        assert!(Made::try_from(ser).is_err());
    }

    #[test]
    fn rejects_layers_with_the_wrong_activation() {
        let mut ser = SerializedMade::from(&made());
        ser.layers.last_mut().unwrap().activation = SerializedActivation::Relu;
        assert!(Made::try_from(ser).is_err());

        let mut ser = SerializedMade::from(&made());
        ser.layers[0].activation = SerializedActivation::Sigmoid;
        assert!(Made::try_from(ser).is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let bad = r#"{"format_version":999,"encoder_layers":1,"layers":[]}"#;
        let err = Made::from_json_str(bad).unwrap_err();
        assert!(format!("{err}").contains("format_version"));
    }
}
