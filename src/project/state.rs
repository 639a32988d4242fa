use crate::error::DecodeError;
use crate::ids::{generate_project_id, generate_snapshot_id};
use crate::snapshot::{
    ModelLayer, NeuralLens, ProjectSnapshot, PublishInfo, SearchSet, SnapshotList,
};
use crate::training_set::{SetKind, TrainingImageSet};

/// Everything a project holds in memory. No I/O happens here.
#[derive(Debug, Clone)]
pub(crate) struct ProjectState {
    pub project_id: String,
    /// Id the next save is written under.
    pub snapshot_id: String,
    pub positive_set: TrainingImageSet,
    pub negative_set: TrainingImageSet,
    pub neural_lens: Option<NeuralLens>,
    pub neural_lens_error: Option<String>,
    pub is_learning: bool,
    pub revision_number: u64,
    pub creator_name: Option<String>,
    pub publish_info: PublishInfo,
    pub published_snapshot_id: Option<String>,
    pub name: Option<String>,
    pub model_layer: ModelLayer,
    pub search_set: SearchSet,
    pub snapshots: SnapshotList,
    pub save_needed: bool,
}

impl ProjectState {
    pub fn new() -> Self {
        ProjectState {
            project_id: generate_project_id(),
            snapshot_id: generate_snapshot_id(),
            positive_set: TrainingImageSet::new(SetKind::Positive),
            negative_set: TrainingImageSet::new(SetKind::Negative),
            neural_lens: None,
            neural_lens_error: None,
            is_learning: false,
            revision_number: 0,
            creator_name: Some("you".to_string()),
            publish_info: PublishInfo::default(),
            published_snapshot_id: None,
            name: None,
            model_layer: ModelLayer::default(),
            search_set: SearchSet::default(),
            snapshots: SnapshotList::new(),
            save_needed: false,
        }
    }

    pub fn from_snapshot(
        snapshot: &ProjectSnapshot,
        snapshots: SnapshotList,
        published_snapshot_id: Option<String>,
    ) -> Result<Self, DecodeError> {
        snapshot.validate()?;
        Ok(ProjectState {
            project_id: snapshot.project_id.clone(),
            snapshot_id: snapshot.snapshot_id.clone(),
            positive_set: TrainingImageSet::from_record(SetKind::Positive, &snapshot.positive_set)?,
            negative_set: TrainingImageSet::from_record(SetKind::Negative, &snapshot.negative_set)?,
            neural_lens: snapshot.neural_lens.clone(),
            neural_lens_error: None,
            is_learning: false,
            revision_number: snapshot.revision_number,
            creator_name: snapshot.creator_name.clone(),
            publish_info: snapshot.publish_info.clone(),
            published_snapshot_id,
            name: snapshot.name.clone(),
            model_layer: snapshot.model_layer,
            search_set: snapshot.search_set.clone(),
            snapshots,
            save_needed: false,
        })
    }

    pub fn to_snapshot(&self, date: i64) -> ProjectSnapshot {
        ProjectSnapshot {
            project_id: self.project_id.clone(),
            snapshot_id: self.snapshot_id.clone(),
            positive_set: self.positive_set.record(),
            negative_set: self.negative_set.record(),
            search_set: self.search_set.clone(),
            model_layer: self.model_layer,
            neural_lens: self.neural_lens.clone(),
            revision_number: self.revision_number,
            name: self.name.clone(),
            creator_name: self.creator_name.clone(),
            date,
            publish_info: self.publish_info.clone(),
        }
    }

    pub fn set(&self, kind: SetKind) -> &TrainingImageSet {
        match kind {
            SetKind::Positive => &self.positive_set,
            SetKind::Negative => &self.negative_set,
        }
    }

    pub fn set_mut(&mut self, kind: SetKind) -> &mut TrainingImageSet {
        match kind {
            SetKind::Positive => &mut self.positive_set,
            SetKind::Negative => &mut self.negative_set,
        }
    }

    /// Whether the attached lens was learnt from the snapshot about to be
    /// written.
    pub fn lens_is_current(&self) -> bool {
        self.neural_lens
            .as_ref()
            .is_some_and(|lens| lens.is_learnt_from(&self.snapshot_id))
    }

    /// Serialize the dirty state and record it in the local snapshot list.
    ///
    /// Returns the snapshot to enqueue, or `None` when nothing changed.
    pub fn take_pending_save(&mut self, date: i64) -> Option<ProjectSnapshot> {
        if !self.save_needed {
            return None;
        }
        let snapshot = self.to_snapshot(date);
        self.snapshots.upsert(snapshot.clone());
        self.save_needed = false;
        Some(snapshot)
    }

    /// Called before any change that invalidates the current lens.
    ///
    /// When the lens belongs to the current snapshot, the pending save (if
    /// any) is taken first and a new snapshot id is minted so the edits form
    /// a new version. Returns the save to enqueue.
    pub fn training_data_will_change(&mut self, date: i64) -> Option<ProjectSnapshot> {
        if !self.lens_is_current() {
            return None;
        }
        let pending = self.take_pending_save(date);
        self.revision_number += 1;
        self.snapshot_id = generate_snapshot_id();
        pending
    }

    /// Positive set non-empty and fully uploaded.
    pub fn can_learn_lens(&self) -> bool {
        !self.positive_set.is_empty()
            && self.positive_set.uploaded_count() == self.positive_set.len()
    }
}
