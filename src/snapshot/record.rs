use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;
use crate::image::TrainingImageRecord;

use super::neural_lens::NeuralLens;
use super::publish_info::PublishInfo;
use super::search_set::SearchSet;

/// Feature layer of the network the CAV is learnt against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelLayer {
    #[serde(rename = "mobilenet_12d")]
    Mobilenet12d,
    #[default]
    #[serde(rename = "googlenet_4d")]
    Googlenet4d,
    #[serde(rename = "googlenet_5b")]
    Googlenet5b,
}

impl ModelLayer {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelLayer::Mobilenet12d => "mobilenet_12d",
            ModelLayer::Googlenet4d => "googlenet_4d",
            ModelLayer::Googlenet5b => "googlenet_5b",
        }
    }

    /// Layer assumed for snapshots written before the field existed.
    fn legacy() -> Self {
        ModelLayer::Googlenet5b
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSetRecord {
    pub images: Vec<TrainingImageRecord>,
    #[serde(default)]
    pub image_count: usize,
}

impl ImageSetRecord {
    pub fn new(images: Vec<TrainingImageRecord>) -> Self {
        let image_count = images.len();
        ImageSetRecord {
            images,
            image_count,
        }
    }
}

const REQUIRED_FIELDS: [&str; 2] = ["projectId", "snapshotId"];

/// Full serialized state of a project at one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub project_id: String,
    pub snapshot_id: String,
    pub positive_set: ImageSetRecord,
    pub negative_set: ImageSetRecord,
    #[serde(default)]
    pub search_set: SearchSet,
    #[serde(default = "ModelLayer::legacy")]
    pub model_layer: ModelLayer,
    #[serde(default)]
    pub neural_lens: Option<NeuralLens>,
    #[serde(default)]
    pub revision_number: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub creator_name: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub publish_info: PublishInfo,
}

impl ProjectSnapshot {
    /// Decode and validate a stored snapshot document.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        if !value.is_object() {
            return Err(DecodeError::Invalid("snapshot must be a JSON object".into()));
        }
        for field in REQUIRED_FIELDS {
            if value.get(field).map_or(true, Value::is_null) {
                return Err(DecodeError::MissingField(field));
            }
        }
        let snapshot: ProjectSnapshot = serde_json::from_value(value)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn from_json_str(source: &str) -> Result<Self, DecodeError> {
        Self::from_value(serde_json::from_str(source)?)
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.project_id.is_empty() {
            return Err(DecodeError::MissingField("projectId"));
        }
        if self.snapshot_id.is_empty() {
            return Err(DecodeError::MissingField("snapshotId"));
        }
        for image in self
            .positive_set
            .images
            .iter()
            .chain(self.negative_set.images.iter())
        {
            image.validate()?;
        }
        for image in self.publish_info.hero_images.values() {
            image.validate()?;
        }
        Ok(())
    }

    pub fn positive_image_count(&self) -> usize {
        self.positive_set.images.len()
    }

    /// Snapshot the attached lens was learnt from, if any.
    pub fn lens_snapshot_id(&self) -> Option<&str> {
        self.neural_lens.as_ref().map(|lens| lens.snapshot_id.as_str())
    }
}
