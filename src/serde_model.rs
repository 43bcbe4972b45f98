//! Model serialization/deserialization (feature: `serde`).
//!
//! A versioned JSON format for a fitted [`ConstrainedMlpRegressor`]: hyperparameters,
//! coefficient bounds (infinite sides stored as `null`), the network parameters and the
//! training curve. Optimizer moments are not stored; a loaded model continues training
//! with fresh optimizer state.
//!
//! Internal `Mlp`/`Layer` structs are not serialized directly, and everything read back
//! is validated (dimensions, parameter lengths, finiteness, bounds width).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bounds::{CoefficientBounds, SerializedBounds};
use crate::train::FittedMlp;
use crate::{Activation, ConstrainedMlpRegressor, Error, Layer, Mlp, MlpParams, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedModel {
    pub format_version: u32,
    pub params: MlpParams,
    pub bounds: SerializedBounds,
    pub n_iter: usize,
    pub loss_curve: Vec<f32>,
    pub layers: Vec<SerializedLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLayer {
    pub in_dim: usize,
    pub out_dim: usize,
    pub activation: Activation,
    /// Row-major (out_dim, in_dim).
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl From<&Layer> for SerializedLayer {
    fn from(layer: &Layer) -> Self {
        Self {
            in_dim: layer.in_dim(),
            out_dim: layer.out_dim(),
            activation: layer.activation(),
            weights: layer.weights().to_vec(),
            biases: layer.biases().to_vec(),
        }
    }
}

impl SerializedModel {
    fn from_regressor(model: &ConstrainedMlpRegressor) -> Result<Self> {
        let fitted = model.fitted()?;
        let bounds = model.bounds().ok_or(Error::NotFitted)?;
        Ok(Self {
            format_version: MODEL_FORMAT_VERSION,
            params: model.params().clone(),
            bounds: SerializedBounds::from(bounds),
            n_iter: fitted.n_iter(),
            loss_curve: fitted.loss_curve().to_vec(),
            layers: fitted.mlp().layers().iter().map(SerializedLayer::from).collect(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported model format_version {}; expected {}",
                self.format_version, MODEL_FORMAT_VERSION
            )));
        }
        if self.layers.is_empty() {
            return Err(Error::InvalidData(
                "serialized model must have at least one layer".to_owned(),
            ));
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[1].in_dim != pair[0].out_dim {
                return Err(Error::InvalidData(format!(
                    "layer {} in_dim {} does not match previous out_dim {}",
                    i + 1,
                    pair[1].in_dim,
                    pair[0].out_dim
                )));
            }
        }
        if self.bounds.min.len() != self.layers[0].in_dim {
            return Err(Error::InvalidData(format!(
                "bounds cover {} features, first layer has in_dim {}",
                self.bounds.min.len(),
                self.layers[0].in_dim
            )));
        }
        self.params
            .validate()
            .map_err(|e| Error::InvalidData(format!("invalid params: {e}")))
    }

    fn into_regressor(self) -> Result<ConstrainedMlpRegressor> {
        self.validate()?;

        let layers = self
            .layers
            .into_iter()
            .enumerate()
            .map(|(i, l)| {
                Layer::from_parts(l.in_dim, l.out_dim, l.activation, l.weights, l.biases)
                    .map_err(|e| Error::InvalidData(format!("layer {i} invalid: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let mlp = Mlp::from_layers(layers);

        let bounds = CoefficientBounds::try_from(self.bounds)
            .map_err(|e| Error::InvalidData(format!("invalid bounds: {e}")))?;
        let fitted = FittedMlp::from_parts(mlp, &self.params, self.n_iter, self.loss_curve)?;
        ConstrainedMlpRegressor::from_fitted(self.params, bounds, fitted)
    }
}

impl ConstrainedMlpRegressor {
    /// Serialize the fitted model to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        let ser = SerializedModel::from_regressor(self)?;
        serde_json::to_string_pretty(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize model: {e}")))
    }

    /// Serialize the fitted model to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        let ser = SerializedModel::from_regressor(self)?;
        serde_json::to_string(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize model: {e}")))
    }

    /// Parse a fitted model from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedModel = serde_json::from_str(s)
            .map_err(|e| Error::InvalidData(format!("failed to parse model json: {e}")))?;
        ser.into_regressor()
    }

    /// Save the fitted model to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, s)
            .map_err(|e| Error::InvalidData(format!("failed to write {}: {e}", p.display())))?;
        Ok(())
    }

    /// Load a fitted model from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidData(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Dataset, Inputs};

    fn fitted_model() -> ConstrainedMlpRegressor {
        let xs: Vec<f32> = (0..20).flat_map(|i| [i as f32 / 20.0, 0.5]).collect();
        let ys: Vec<f32> = xs.chunks(2).map(|r| r[0] + r[1]).collect();
        let data = Dataset::from_flat_1d(xs, ys, 2).unwrap();

        let mut model = ConstrainedMlpRegressor::new(MlpParams {
            hidden_layer_sizes: vec![3],
            max_iter: 5,
            ..MlpParams::default()
        });
        model.fit(&data, Some(&[0.0, -1.0]), None).unwrap();
        model
    }

    #[test]
    fn roundtrip_preserves_predictions_and_bounds() {
        let model = fitted_model();
        let json = model.to_json_string_pretty().unwrap();
        assert!(json.contains("null"));

        let loaded = ConstrainedMlpRegressor::from_json_str(&json).unwrap();
        assert_eq!(loaded.bounds(), model.bounds());
        assert_eq!(
            loaded.fitted().unwrap().loss_curve(),
            model.fitted().unwrap().loss_curve()
        );

        let inputs = Inputs::from_flat(vec![0.1, 0.5, 0.9, 0.5], 2).unwrap();
        assert_eq!(
            loaded.predict(&inputs).unwrap(),
            model.predict(&inputs).unwrap()
        );
    }

    #[test]
    fn unfitted_model_cannot_be_saved() {
        let model = ConstrainedMlpRegressor::default();
        assert_eq!(model.to_json_string().unwrap_err(), Error::NotFitted);
    }

    #[test]
    fn rejects_unknown_version() {
        let model = fitted_model();
        let mut value: serde_json::Value =
            serde_json::from_str(&model.to_json_string().unwrap()).unwrap();
        value["format_version"] = serde_json::json!(999);

        let err = ConstrainedMlpRegressor::from_json_str(&value.to_string()).unwrap_err();
        assert!(format!("{err}").contains("format_version"));
    }

    #[test]
    fn rejects_bounds_of_the_wrong_width() {
        let model = fitted_model();
        let mut value: serde_json::Value =
            serde_json::from_str(&model.to_json_string().unwrap()).unwrap();
        value["bounds"]["min"] = serde_json::json!([0.0]);
        value["bounds"]["max"] = serde_json::json!([null]);

        let err = ConstrainedMlpRegressor::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, Error::InvalidData(msg) if msg.contains("bounds")));
    }
}
