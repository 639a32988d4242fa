//! Persistence backend for snapshots and custom search sets.
//!
//! [`ProjectStorage`] is the seam; [`InMemoryProjectStorage`] backs tests and
//! offline use, and `HttpProjectStorage` (feature `http`) talks to the
//! `/api/db` endpoints.

#[cfg(feature = "http")]
mod http;
mod in_memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::image::TrainingImageRecord;
use crate::snapshot::{CustomSearchSet, ProjectSnapshot, PublishInfo};

#[cfg(feature = "http")]
pub use http::HttpProjectStorage;
pub use in_memory::InMemoryProjectStorage;

/// Number of highest-weighted positive images shown per project summary.
pub const SUMMARY_TOP_IMAGES: usize = 3;

/// Arguments for [`ProjectStorage::copy_snapshot_to_new_project`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopySnapshot {
    pub src_snapshot_id: String,
    pub dst_project_id: String,
    pub dst_snapshot_id: String,
    pub dst_name: String,
}

/// One row of the user's project list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub latest_snapshot: SnapshotSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id: String,
    pub date: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default)]
    pub publish_info: PublishInfo,
    #[serde(default)]
    pub top_images: Vec<TrainingImageRecord>,
}

impl SnapshotSummary {
    pub(crate) fn of(snapshot: &ProjectSnapshot) -> Self {
        let mut top_images = snapshot.positive_set.images.clone();
        // stable: equal weights keep set order
        top_images.sort_by(|a, b| b.weight.cmp(&a.weight));
        top_images.truncate(SUMMARY_TOP_IMAGES);
        SnapshotSummary {
            id: snapshot.snapshot_id.clone(),
            date: snapshot.date,
            name: snapshot.name.clone(),
            creator_name: snapshot.creator_name.clone(),
            publish_info: snapshot.publish_info.clone(),
            top_images,
        }
    }
}

/// Snapshot and search set persistence.
///
/// Deletes are soft: records are flagged, not erased.
#[async_trait]
pub trait ProjectStorage: Send + Sync {
    async fn get_snapshot(&self, snapshot_id: &str) -> Result<ProjectSnapshot, TransportError>;

    /// Create or overwrite the snapshot stored under `snapshot_id`.
    async fn set_snapshot(
        &self,
        project_id: &str,
        snapshot_id: &str,
        content: &ProjectSnapshot,
    ) -> Result<(), TransportError>;

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), TransportError>;

    /// Every snapshot of the project that `snapshot_id` belongs to, newest
    /// first. Soft-deleted snapshots are included.
    async fn list_snapshots_for_project(
        &self,
        snapshot_id: &str,
    ) -> Result<Vec<ProjectSnapshot>, TransportError>;

    async fn get_user_projects_summary(&self) -> Result<Vec<ProjectSummary>, TransportError>;

    /// Search sets that have not been deleted.
    async fn get_search_sets(&self) -> Result<Vec<CustomSearchSet>, TransportError>;

    async fn get_search_set(&self, search_set_id: &str) -> Result<CustomSearchSet, TransportError>;

    async fn set_search_set(
        &self,
        search_set_id: &str,
        content: &CustomSearchSet,
    ) -> Result<(), TransportError>;

    async fn delete_search_set(&self, search_set_id: &str) -> Result<(), TransportError>;

    async fn copy_snapshot_to_new_project(&self, copy: &CopySnapshot)
        -> Result<(), TransportError>;
}
