use std::sync::Arc;

use crate::compute::{CavServer, CropsResponse};
use crate::image::ServerImage;

use super::{Ticket, TicketCache};

/// Per-image crop lookups for a learnt CAV.
pub struct InspectCache {
    compute: Arc<dyn CavServer>,
    crops: TicketCache<CropsResponse>,
}

impl InspectCache {
    pub fn new(compute: Arc<dyn CavServer>) -> Self {
        InspectCache {
            compute,
            crops: TicketCache::new(),
        }
    }

    pub fn get_top_crops(&self, image: &ServerImage, cav_id: &str) -> Arc<Ticket<CropsResponse>> {
        let key = format!("crops-{}-{}", image.id, cav_id);
        let compute = Arc::clone(&self.compute);
        let image = image.clone();
        let cav_id = cav_id.to_string();
        self.crops.request(key, async move {
            compute.get_image_crops(&image, &cav_id).await
        })
    }

    pub fn clear_queue(&self) {
        self.crops.clear_queue();
    }
}
