//! Training images and their wire records.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DecodeError;

pub const DEFAULT_WEIGHT: u32 = 1;
pub const UPWEIGHT: u32 = 4;

/// An image stored on the compute server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerImage {
    pub id: String,
    #[serde(default)]
    pub user_generated: bool,
}

impl ServerImage {
    pub fn new(id: impl Into<String>, user_generated: bool) -> Self {
        ServerImage {
            id: id.into(),
            user_generated,
        }
    }
}

/// Persisted form of a training image: `{id, weight, enabled, user_generated}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingImageRecord {
    pub id: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub user_generated: bool,
}

fn default_weight() -> u32 {
    DEFAULT_WEIGHT
}

fn default_enabled() -> bool {
    true
}

impl TrainingImageRecord {
    pub fn new(id: impl Into<String>, user_generated: bool) -> Self {
        TrainingImageRecord {
            id: id.into(),
            weight: DEFAULT_WEIGHT,
            enabled: true,
            user_generated,
        }
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.id.is_empty() {
            return Err(DecodeError::MissingField("id"));
        }
        Ok(())
    }

    pub fn server_image(&self) -> ServerImage {
        ServerImage::new(self.id.clone(), self.user_generated)
    }
}

/// Stable handle for one entry of a training set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageKey(Uuid);

impl ImageKey {
    fn new() -> Self {
        ImageKey(Uuid::new_v4())
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Encoded image data ready for upload.
///
/// Resizing and orientation correction happen before this point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    /// 224x224 PNG.
    pub thumbnail_png: Vec<u8>,
    /// 1200x1200 JPEG.
    pub full_jpeg: Vec<u8>,
}

/// A user image that has not reached the server yet.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub payload: Arc<UploadPayload>,
    pub is_uploading: bool,
    /// Display-only description of the last failed attempt.
    pub error_description: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ImageSource {
    Server(ServerImage),
    Uploading(PendingUpload),
}

/// One entry of a training set.
#[derive(Debug, Clone)]
pub struct TrainingImage {
    key: ImageKey,
    pub weight: u32,
    pub enabled: bool,
    pub source: ImageSource,
}

impl TrainingImage {
    pub fn server(image: ServerImage) -> Self {
        TrainingImage {
            key: ImageKey::new(),
            weight: DEFAULT_WEIGHT,
            enabled: true,
            source: ImageSource::Server(image),
        }
    }

    pub fn uploading(payload: UploadPayload) -> Self {
        TrainingImage {
            key: ImageKey::new(),
            weight: DEFAULT_WEIGHT,
            enabled: true,
            source: ImageSource::Uploading(PendingUpload {
                payload: Arc::new(payload),
                is_uploading: false,
                error_description: None,
            }),
        }
    }

    pub fn from_record(record: &TrainingImageRecord) -> Self {
        TrainingImage {
            key: ImageKey::new(),
            weight: record.weight,
            enabled: record.enabled,
            source: ImageSource::Server(record.server_image()),
        }
    }

    pub fn key(&self) -> ImageKey {
        self.key
    }

    /// Uploads are always the user's own images.
    pub fn user_generated(&self) -> bool {
        match &self.source {
            ImageSource::Server(image) => image.user_generated,
            ImageSource::Uploading(_) => true,
        }
    }

    pub fn server_image(&self) -> Option<&ServerImage> {
        match &self.source {
            ImageSource::Server(image) => Some(image),
            ImageSource::Uploading(_) => None,
        }
    }

    pub fn pending_upload(&self) -> Option<&PendingUpload> {
        match &self.source {
            ImageSource::Server(_) => None,
            ImageSource::Uploading(upload) => Some(upload),
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self.source, ImageSource::Server(_))
    }

    /// Persistable record; `None` while the image is still local.
    pub fn record(&self) -> Option<TrainingImageRecord> {
        self.server_image().map(|image| TrainingImageRecord {
            id: image.id.clone(),
            weight: self.weight,
            enabled: self.enabled,
            user_generated: image.user_generated,
        })
    }
}
