use serde::{Deserialize, Serialize};

use crate::image::ServerImage;

use super::record::ModelLayer;

/// A learnt concept activation vector and the search results it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeuralLens {
    pub model_layer: ModelLayer,
    /// Snapshot whose training data the lens was learnt from.
    pub snapshot_id: String,
    #[serde(default)]
    pub result_images: Vec<ServerImage>,
    #[serde(rename = "cavID")]
    pub cav_id: String,
    /// Opaque serialized vector.
    #[serde(default)]
    pub cav_string: String,
}

impl NeuralLens {
    pub fn is_learnt_from(&self, snapshot_id: &str) -> bool {
        self.snapshot_id == snapshot_id
    }
}
