use std::sync::Arc;

use tracing::debug;

use crate::error::TransportError;
use crate::image::TrainingImageRecord;
use crate::lock::Mutex;

use super::CavServer;

/// Lazily fetched, memoized negative scout dataset.
///
/// Concurrent callers share a single fetch. A failed fetch is not cached.
pub struct ScoutImageDataset {
    compute: Arc<dyn CavServer>,
    dataset: String,
    gate: Mutex,
    images: parking_lot::Mutex<Option<Arc<Vec<TrainingImageRecord>>>>,
}

impl ScoutImageDataset {
    pub fn new(compute: Arc<dyn CavServer>, dataset: impl Into<String>) -> Self {
        ScoutImageDataset {
            compute,
            dataset: dataset.into(),
            gate: Mutex::new(),
            images: parking_lot::Mutex::new(None),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub async fn negative_images(&self) -> Result<Arc<Vec<TrainingImageRecord>>, TransportError> {
        self.gate
            .run_exclusive(|| async {
                let cached = self.images.lock().clone();
                if let Some(images) = cached {
                    return Ok(images);
                }
                let images = Arc::new(self.compute.get_image_set(&self.dataset).await?);
                debug!(dataset = %self.dataset, count = images.len(), "fetched scout images");
                *self.images.lock() = Some(Arc::clone(&images));
                Ok(images)
            })
            .await
    }
}
