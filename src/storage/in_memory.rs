use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::TransportError;
use crate::snapshot::{CustomSearchSet, ProjectSnapshot};

use super::{CopySnapshot, ProjectStorage, ProjectSummary, SnapshotSummary};

#[derive(Clone)]
struct Stored<T> {
    data: T,
    deleted: bool,
}

impl<T> Stored<T> {
    fn live(data: T) -> Self {
        Stored {
            data,
            deleted: false,
        }
    }
}

#[derive(Default)]
struct Tables {
    snapshots: HashMap<String, Stored<ProjectSnapshot>>,
    search_sets: HashMap<String, Stored<CustomSearchSet>>,
    failing_saves: usize,
    save_attempts: usize,
}

/// In-memory storage backed by `Arc<RwLock<HashMap>>`.
///
/// Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct InMemoryProjectStorage {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryProjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored snapshots, deleted ones included.
    pub fn snapshot_count(&self) -> usize {
        self.tables.read().snapshots.len()
    }

    /// Make the next `count` calls to `set_snapshot` fail with a network error.
    pub fn fail_next_saves(&self, count: usize) {
        self.tables.write().failing_saves = count;
    }

    /// Calls to `set_snapshot` so far, failed ones included.
    pub fn save_attempts(&self) -> usize {
        self.tables.read().save_attempts
    }

    pub fn is_snapshot_deleted(&self, snapshot_id: &str) -> bool {
        self.tables
            .read()
            .snapshots
            .get(snapshot_id)
            .is_some_and(|s| s.deleted)
    }
}

fn not_found(kind: &str, id: &str) -> TransportError {
    TransportError::NotFound(format!("{kind} {id}"))
}

#[async_trait]
impl ProjectStorage for InMemoryProjectStorage {
    async fn get_snapshot(&self, snapshot_id: &str) -> Result<ProjectSnapshot, TransportError> {
        self.tables
            .read()
            .snapshots
            .get(snapshot_id)
            .map(|s| s.data.clone())
            .ok_or_else(|| not_found("snapshot", snapshot_id))
    }

    async fn set_snapshot(
        &self,
        _project_id: &str,
        snapshot_id: &str,
        content: &ProjectSnapshot,
    ) -> Result<(), TransportError> {
        let mut tables = self.tables.write();
        tables.save_attempts += 1;
        if tables.failing_saves > 0 {
            tables.failing_saves -= 1;
            return Err(TransportError::Network("injected save failure".into()));
        }
        tables
            .snapshots
            .insert(snapshot_id.to_string(), Stored::live(content.clone()));
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), TransportError> {
        let mut tables = self.tables.write();
        let stored = tables
            .snapshots
            .get_mut(snapshot_id)
            .ok_or_else(|| not_found("snapshot", snapshot_id))?;
        stored.deleted = true;
        Ok(())
    }

    async fn list_snapshots_for_project(
        &self,
        snapshot_id: &str,
    ) -> Result<Vec<ProjectSnapshot>, TransportError> {
        let tables = self.tables.read();
        let project_id = tables
            .snapshots
            .get(snapshot_id)
            .map(|s| s.data.project_id.clone())
            .ok_or_else(|| not_found("snapshot", snapshot_id))?;

        let mut snapshots: Vec<ProjectSnapshot> = tables
            .snapshots
            .values()
            .filter(|s| s.data.project_id == project_id)
            .map(|s| s.data.clone())
            .collect();
        snapshots.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(snapshots)
    }

    async fn get_user_projects_summary(&self) -> Result<Vec<ProjectSummary>, TransportError> {
        let tables = self.tables.read();
        let mut latest: HashMap<&str, &Stored<ProjectSnapshot>> = HashMap::new();
        for stored in tables.snapshots.values() {
            let entry = latest.entry(stored.data.project_id.as_str()).or_insert(stored);
            if stored.data.date > entry.data.date {
                *entry = stored;
            }
        }

        // a project whose newest snapshot was deleted is hidden
        let mut summaries: Vec<ProjectSummary> = latest
            .into_iter()
            .filter(|(_, stored)| !stored.deleted)
            .map(|(project_id, stored)| ProjectSummary {
                id: project_id.to_string(),
                latest_snapshot: SnapshotSummary::of(&stored.data),
            })
            .collect();
        summaries.sort_by(|a, b| b.latest_snapshot.date.cmp(&a.latest_snapshot.date));
        Ok(summaries)
    }

    async fn get_search_sets(&self) -> Result<Vec<CustomSearchSet>, TransportError> {
        Ok(self
            .tables
            .read()
            .search_sets
            .values()
            .filter(|s| !s.deleted)
            .map(|s| s.data.clone())
            .collect())
    }

    async fn get_search_set(&self, search_set_id: &str) -> Result<CustomSearchSet, TransportError> {
        self.tables
            .read()
            .search_sets
            .get(search_set_id)
            .map(|s| s.data.clone())
            .ok_or_else(|| not_found("search set", search_set_id))
    }

    async fn set_search_set(
        &self,
        search_set_id: &str,
        content: &CustomSearchSet,
    ) -> Result<(), TransportError> {
        self.tables
            .write()
            .search_sets
            .insert(search_set_id.to_string(), Stored::live(content.clone()));
        Ok(())
    }

    async fn delete_search_set(&self, search_set_id: &str) -> Result<(), TransportError> {
        let mut tables = self.tables.write();
        let stored = tables
            .search_sets
            .get_mut(search_set_id)
            .ok_or_else(|| not_found("search set", search_set_id))?;
        stored.deleted = true;
        Ok(())
    }

    async fn copy_snapshot_to_new_project(
        &self,
        copy: &CopySnapshot,
    ) -> Result<(), TransportError> {
        let mut tables = self.tables.write();
        let mut snapshot = tables
            .snapshots
            .get(&copy.src_snapshot_id)
            .map(|s| s.data.clone())
            .ok_or_else(|| not_found("snapshot", &copy.src_snapshot_id))?;
        snapshot.snapshot_id = copy.dst_snapshot_id.clone();
        snapshot.project_id = copy.dst_project_id.clone();
        snapshot.name = Some(copy.dst_name.clone());
        tables
            .snapshots
            .insert(copy.dst_snapshot_id.clone(), Stored::live(snapshot));
        Ok(())
    }
}
