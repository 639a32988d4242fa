use super::record::ProjectSnapshot;

/// Known versions of one project, newest first.
#[derive(Debug, Clone, Default)]
pub struct SnapshotList {
    snapshots: Vec<ProjectSnapshot>,
}

impl SnapshotList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorts by date, newest first.
    pub fn from_snapshots(mut snapshots: Vec<ProjectSnapshot>) -> Self {
        snapshots.sort_by(|a, b| b.date.cmp(&a.date));
        SnapshotList { snapshots }
    }

    /// Replace the entry with the same snapshot id, or add it as the newest.
    pub fn upsert(&mut self, snapshot: ProjectSnapshot) {
        match self
            .snapshots
            .iter_mut()
            .find(|s| s.snapshot_id == snapshot.snapshot_id)
        {
            Some(existing) => *existing = snapshot,
            None => self.snapshots.insert(0, snapshot),
        }
    }

    pub fn find(&self, snapshot_id: &str) -> Option<&ProjectSnapshot> {
        self.snapshots.iter().find(|s| s.snapshot_id == snapshot_id)
    }

    pub fn remove(&mut self, snapshot_id: &str) -> Option<ProjectSnapshot> {
        let index = self
            .snapshots
            .iter()
            .position(|s| s.snapshot_id == snapshot_id)?;
        Some(self.snapshots.remove(index))
    }

    pub fn latest(&self) -> Option<&ProjectSnapshot> {
        self.snapshots.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectSnapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
