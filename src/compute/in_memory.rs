use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::TransportError;
use crate::image::{ServerImage, TrainingImageRecord, UploadPayload};

use super::{CavRequest, CavResult, CavServer, CropSpec, CropsResponse};

#[derive(Default)]
struct ServerState {
    datasets: HashMap<String, Vec<TrainingImageRecord>>,
    uploads: usize,
    cavs: usize,
    crop_requests: usize,
    failing_uploads: usize,
    failing_cavs: usize,
    last_request: Option<CavRequest>,
}

/// Deterministic compute server for tests and offline use.
///
/// Uploads get sequential ids, learning returns the enabled positive images
/// as results, and named datasets are whatever was registered with
/// [`with_dataset`](Self::with_dataset). Cloning shares state.
#[derive(Clone, Default)]
pub struct InMemoryCavServer {
    state: Arc<RwLock<ServerState>>,
}

impl InMemoryCavServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(self, name: impl Into<String>, images: Vec<TrainingImageRecord>) -> Self {
        self.state.write().datasets.insert(name.into(), images);
        self
    }

    pub fn fail_next_uploads(&self, count: usize) {
        self.state.write().failing_uploads = count;
    }

    pub fn fail_next_cavs(&self, count: usize) {
        self.state.write().failing_cavs = count;
    }

    pub fn upload_count(&self) -> usize {
        self.state.read().uploads
    }

    pub fn cav_count(&self) -> usize {
        self.state.read().cavs
    }

    pub fn crop_requests(&self) -> usize {
        self.state.read().crop_requests
    }

    /// The most recent learning request received.
    pub fn last_request(&self) -> Option<CavRequest> {
        self.state.read().last_request.clone()
    }
}

fn injected(what: &str) -> TransportError {
    TransportError::Detail {
        status: 500,
        detail: format!("injected {what} failure"),
    }
}

#[async_trait]
impl CavServer for InMemoryCavServer {
    async fn upload_image(&self, _payload: &UploadPayload) -> Result<ServerImage, TransportError> {
        let mut state = self.state.write();
        if state.failing_uploads > 0 {
            state.failing_uploads -= 1;
            return Err(injected("upload"));
        }
        state.uploads += 1;
        Ok(ServerImage::new(format!("upload-{}", state.uploads), true))
    }

    async fn generate_cav(&self, request: &CavRequest) -> Result<CavResult, TransportError> {
        let mut state = self.state.write();
        state.last_request = Some(request.clone());
        if state.failing_cavs > 0 {
            state.failing_cavs -= 1;
            return Err(injected("learning"));
        }
        state.cavs += 1;
        Ok(CavResult {
            result_images: request
                .positive_images
                .iter()
                .filter(|image| image.enabled)
                .map(TrainingImageRecord::server_image)
                .collect(),
            cav_id: format!("cav-{}", state.cavs),
            cav_string: format!("{}:{}", request.model_layer.as_str(), state.cavs),
        })
    }

    async fn get_image_crops(
        &self,
        _image: &ServerImage,
        _cav_id: &str,
    ) -> Result<CropsResponse, TransportError> {
        self.state.write().crop_requests += 1;
        let crop = CropSpec {
            x: 0.0,
            y: 0.0,
            width: 224.0,
            height: 224.0,
        };
        Ok(CropsResponse {
            top_crop: crop,
            crops: vec![crop],
            scores: vec![1.0],
        })
    }

    async fn get_image_set(&self, name: &str) -> Result<Vec<TrainingImageRecord>, TransportError> {
        self.state
            .read()
            .datasets
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(format!("image set {name}")))
    }
}
