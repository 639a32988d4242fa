use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::image::TrainingImageRecord;

/// Free-text metadata shown when a project is shared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublishInfo {
    pub summary: String,
    pub description: String,
    pub subjective_qualities: String,
    pub visual_qualities: String,
    /// Showcase images keyed by slot.
    pub hero_images: BTreeMap<u32, TrainingImageRecord>,
}

impl PublishInfo {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.description.is_empty()
            && self.subjective_qualities.is_empty()
            && self.visual_qualities.is_empty()
            && self.hero_images.is_empty()
    }
}
