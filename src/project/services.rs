use std::sync::Arc;

use crate::compute::{CavServer, ScoutImageDataset};
use crate::config::SyncConfig;
use crate::storage::ProjectStorage;

/// Remote collaborators shared by every open project.
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<dyn ProjectStorage>,
    pub compute: Arc<dyn CavServer>,
    pub scouts: Arc<ScoutImageDataset>,
}

impl Services {
    pub fn new(
        storage: Arc<dyn ProjectStorage>,
        compute: Arc<dyn CavServer>,
        config: &SyncConfig,
    ) -> Self {
        let scouts = Arc::new(ScoutImageDataset::new(
            Arc::clone(&compute),
            config.negative_dataset.clone(),
        ));
        Services {
            storage,
            compute,
            scouts,
        }
    }

    /// HTTP storage and compute clients pointed at `config.server_url`.
    #[cfg(feature = "http")]
    pub fn http(config: &SyncConfig) -> Self {
        let storage = Arc::new(crate::storage::HttpProjectStorage::new(
            config.server_url.clone(),
        ));
        let compute = Arc::new(crate::compute::HttpCavServer::new(config));
        Self::new(storage, compute, config)
    }
}
