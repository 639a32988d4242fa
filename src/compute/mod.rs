//! The CAV compute server: uploads, learning, crops and scout datasets.

#[cfg(feature = "http")]
mod http;
mod in_memory;
mod scout;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::image::{ServerImage, TrainingImageRecord, UploadPayload};
use crate::snapshot::ModelLayer;

#[cfg(feature = "http")]
pub use http::HttpCavServer;
pub use in_memory::InMemoryCavServer;
pub use scout::ScoutImageDataset;

/// Training data for one learning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CavRequest {
    pub positive_images: Vec<TrainingImageRecord>,
    pub negative_images: Vec<TrainingImageRecord>,
    /// Custom search images; `None` searches the server's built-in dataset.
    pub search_images: Option<Vec<ServerImage>>,
    pub model_layer: ModelLayer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CavResult {
    pub result_images: Vec<ServerImage>,
    pub cav_id: String,
    pub cav_string: String,
}

/// Rectangle in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropSpec {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropsResponse {
    pub top_crop: CropSpec,
    pub crops: Vec<CropSpec>,
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// 224x224 PNG.
    #[default]
    Thumbnail,
    /// 1200x1200 JPEG.
    Jpeg,
}

/// Public URL of a server image.
///
/// User uploads live under `media/`; built-in dataset images are static.
pub fn image_url(server_url: &str, image: &ServerImage, format: ImageFormat) -> String {
    let server_url = server_url.trim_end_matches('/');
    let folder = if image.user_generated {
        format!("{server_url}/media/cav-content")
    } else {
        format!("{server_url}/static-cav-content")
    };
    match format {
        ImageFormat::Thumbnail => format!("{folder}/{}.1x.224x224.png", image.id),
        ImageFormat::Jpeg => format!("{folder}/{}.1x.1200x1200.jpg", image.id),
    }
}

#[async_trait]
pub trait CavServer: Send + Sync {
    async fn upload_image(&self, payload: &UploadPayload) -> Result<ServerImage, TransportError>;

    async fn generate_cav(&self, request: &CavRequest) -> Result<CavResult, TransportError>;

    async fn get_image_crops(
        &self,
        image: &ServerImage,
        cav_id: &str,
    ) -> Result<CropsResponse, TransportError>;

    /// Images of a named server-side dataset.
    async fn get_image_set(&self, name: &str) -> Result<Vec<TrainingImageRecord>, TransportError>;
}
