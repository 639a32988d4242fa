use std::sync::{Arc, Weak};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::compute::CavRequest;
use crate::config::SyncConfig;
use crate::error::{ProjectError, TransportError};
use crate::ids::{generate_project_id, generate_snapshot_id};
use crate::image::{ImageKey, TrainingImage, UploadPayload, DEFAULT_WEIGHT, UPWEIGHT};
use crate::save_queue::{SaveQueue, SaveQueueItem};
use crate::schedule::Debouncer;
use crate::snapshot::{
    ModelLayer, NeuralLens, ProjectSnapshot, PublishInfo, SearchSet, SnapshotList,
};
use crate::storage::CopySnapshot;
use crate::training_set::{SetKind, TrainingImageSet};

use super::services::Services;
use super::state::ProjectState;

/// Where a project is in the autosave cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Clean,
    /// Dirty, waiting for the debounce window to close.
    PendingDebounce,
    /// Enqueued but no write in progress.
    Queued,
    Saving,
}

/// An open project: the in-memory document plus its autosave machinery.
///
/// Cloning shares the same project. Every mutation marks the document dirty
/// and schedules a debounced save. Outside a tokio runtime no save is
/// scheduled; the document stays dirty until [`flush`](Self::flush).
#[derive(Clone)]
pub struct Project {
    inner: Arc<ProjectInner>,
}

struct ProjectInner {
    state: parking_lot::Mutex<ProjectState>,
    saves: SaveQueue,
    debounce: Debouncer,
    services: Services,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl Project {
    fn with_state(services: Services, config: &SyncConfig, state: ProjectState) -> Self {
        Project {
            inner: Arc::new(ProjectInner {
                state: parking_lot::Mutex::new(state),
                saves: SaveQueue::new(Arc::clone(&services.storage), config),
                debounce: Debouncer::new(config.debounce()),
                services,
            }),
        }
    }

    /// A fresh, empty project with new ids.
    pub fn new(services: Services, config: &SyncConfig) -> Self {
        Self::with_state(services, config, ProjectState::new())
    }

    /// Open the version `snapshot_id` out of an already fetched list.
    pub fn from_snapshots(
        services: Services,
        config: &SyncConfig,
        snapshot_id: &str,
        snapshots: Vec<ProjectSnapshot>,
        published_snapshot_id: Option<String>,
    ) -> Result<Self, ProjectError> {
        let list = SnapshotList::from_snapshots(snapshots);
        let snapshot = list
            .find(snapshot_id)
            .cloned()
            .ok_or_else(|| ProjectError::SnapshotNotFound(snapshot_id.to_string()))?;
        let state = ProjectState::from_snapshot(&snapshot, list, published_snapshot_id)?;
        Ok(Self::with_state(services, config, state))
    }

    /// Fetch every snapshot of the project containing `snapshot_id` and open
    /// that version.
    pub async fn load(
        services: Services,
        config: &SyncConfig,
        snapshot_id: &str,
    ) -> Result<Self, ProjectError> {
        let snapshots = services
            .storage
            .list_snapshots_for_project(snapshot_id)
            .await?;
        let project = Self::from_snapshots(services, config, snapshot_id, snapshots, None)?;
        info!(
            project_id = %project.project_id(),
            snapshot_id,
            "project loaded"
        );
        Ok(project)
    }

    pub fn project_id(&self) -> String {
        self.inner.state.lock().project_id.clone()
    }

    /// Id the next save will be written under.
    pub fn snapshot_id(&self) -> String {
        self.inner.state.lock().snapshot_id.clone()
    }

    pub fn revision_number(&self) -> u64 {
        self.inner.state.lock().revision_number
    }

    pub fn name(&self) -> Option<String> {
        self.inner.state.lock().name.clone()
    }

    pub fn creator_name(&self) -> Option<String> {
        self.inner.state.lock().creator_name.clone()
    }

    pub fn model_layer(&self) -> ModelLayer {
        self.inner.state.lock().model_layer
    }

    pub fn search_set(&self) -> SearchSet {
        self.inner.state.lock().search_set.clone()
    }

    pub fn neural_lens(&self) -> Option<NeuralLens> {
        self.inner.state.lock().neural_lens.clone()
    }

    pub fn neural_lens_error(&self) -> Option<String> {
        self.inner.state.lock().neural_lens_error.clone()
    }

    pub fn is_learning(&self) -> bool {
        self.inner.state.lock().is_learning
    }

    pub fn publish_info(&self) -> PublishInfo {
        self.inner.state.lock().publish_info.clone()
    }

    pub fn published_snapshot_id(&self) -> Option<String> {
        self.inner.state.lock().published_snapshot_id.clone()
    }

    pub fn training_set(&self, kind: SetKind) -> TrainingImageSet {
        self.inner.state.lock().set(kind).clone()
    }

    /// Known versions, newest first, including locally saved ones.
    pub fn snapshots(&self) -> SnapshotList {
        self.inner.state.lock().snapshots.clone()
    }

    /// The document as it would be saved right now.
    pub fn to_snapshot(&self) -> ProjectSnapshot {
        self.inner.state.lock().to_snapshot(now_ms())
    }

    pub fn can_learn_lens(&self) -> bool {
        self.inner.state.lock().can_learn_lens()
    }

    pub fn save_state(&self) -> SaveState {
        if self.inner.state.lock().save_needed {
            SaveState::PendingDebounce
        } else if self.inner.saves.is_running() {
            SaveState::Saving
        } else if !self.inner.saves.is_empty() {
            SaveState::Queued
        } else {
            SaveState::Clean
        }
    }

    /// Error of the last failed save; cleared by the next successful one.
    pub fn save_error(&self) -> Option<TransportError> {
        self.inner.saves.last_error()
    }

    pub fn save_queue(&self) -> &SaveQueue {
        &self.inner.saves
    }

    /// Mark the document dirty and (re)start the debounce window.
    pub fn set_needs_save(&self) {
        self.inner.state.lock().save_needed = true;

        let weak: Weak<ProjectInner> = Arc::downgrade(&self.inner);
        self.inner.debounce.schedule(async move {
            if let Some(inner) = weak.upgrade() {
                Project { inner }.save_snapshot_if_needed();
            }
        });
    }

    /// Enqueue the current state if it is dirty and start the save loop.
    pub fn save_snapshot_if_needed(&self) {
        let pending = self.inner.state.lock().take_pending_save(now_ms());
        if let Some(snapshot) = pending {
            self.enqueue(snapshot);
        }
    }

    fn enqueue(&self, snapshot: ProjectSnapshot) {
        self.inner.saves.enqueue(SaveQueueItem::new(snapshot));
        self.inner.saves.start();
    }

    /// Save immediately, skipping the debounce, and wait for the queue to
    /// settle. Failed saves are reported through [`save_error`](Self::save_error).
    pub async fn flush(&self) {
        self.inner.debounce.cancel();
        self.save_snapshot_if_needed();
        self.inner.saves.drain().await;
        self.inner.saves.wait_idle().await;
    }

    /// Run a training-data change under the state lock.
    ///
    /// `check` decides whether the change applies: an error aborts, `false`
    /// skips it, `true` rolls the version if the lens is current and then
    /// applies `change`. Returns `None` when skipped.
    fn change_training_data<R>(
        &self,
        check: impl FnOnce(&ProjectState) -> Result<bool, ProjectError>,
        change: impl FnOnce(&mut ProjectState) -> R,
    ) -> Result<Option<R>, ProjectError> {
        let (pending, result) = {
            let mut state = self.inner.state.lock();
            if !check(&state)? {
                return Ok(None);
            }
            let pending = roll_if_needed(&mut state);
            (pending, change(&mut state))
        };
        if let Some(snapshot) = pending {
            self.enqueue(snapshot);
        }
        Ok(Some(result))
    }

    /// Resize the negative set to match the positive set, then re-dirty.
    ///
    /// Resize failures are logged; the document is saved regardless.
    async fn training_data_did_change(&self) {
        if let Err(err) = self.resize_negative_set().await {
            warn!(project_id = %self.project_id(), error = %err, "couldn't resize negative set");
        }
        self.set_needs_save();
    }

    async fn resize_negative_set(&self) -> Result<(), ProjectError> {
        let scouts = self.inner.services.scouts.negative_images().await?;
        let mut state = self.inner.state.lock();
        let desired = state.positive_set.len() as i64;
        state
            .negative_set
            .adjust_size_using_scout_images(desired, &scouts, &mut rand::thread_rng())
    }

    pub async fn add_images(&self, kind: SetKind, images: Vec<TrainingImage>, at_front: bool) {
        let added = self.change_training_data(
            |_| Ok(true),
            |state| state.set_mut(kind).add_images(images, at_front),
        );
        if let Ok(Some(())) = added {
            self.training_data_did_change().await;
        }
    }

    /// Add local images and start uploading them in the background.
    ///
    /// Returns the keys of the new entries.
    pub async fn add_image_files(&self, kind: SetKind, payloads: Vec<UploadPayload>) -> Vec<ImageKey> {
        let images: Vec<TrainingImage> = payloads.into_iter().map(TrainingImage::uploading).collect();
        let keys: Vec<ImageKey> = images.iter().map(TrainingImage::key).collect();
        self.add_images(kind, images, false).await;

        for key in &keys {
            let project = self.clone();
            let key = *key;
            tokio::spawn(async move {
                if let Err(err) = project.upload_image(kind, key).await {
                    debug!(%key, error = %err, "background upload ended with error");
                }
            });
        }
        keys
    }

    /// Upload one local image and swap it for its server image.
    ///
    /// Failures are recorded on the entry as its error description and are
    /// not retried automatically. A no-op for entries already uploaded or
    /// uploading.
    pub async fn upload_image(&self, kind: SetKind, key: ImageKey) -> Result<(), ProjectError> {
        let upload = {
            let mut state = self.inner.state.lock();
            let set = state.set_mut(kind);
            if set.get(key).is_none() {
                return Err(ProjectError::ImageNotFound);
            }
            match set.begin_upload(key) {
                Some(upload) => upload,
                None => return Ok(()),
            }
        };

        match self.inner.services.compute.upload_image(&upload.payload).await {
            Ok(image) => {
                debug!(%key, image_id = %image.id, "image uploaded");
                let swapped = self.inner.state.lock().set_mut(kind).finish_upload(key, image);
                if swapped {
                    self.training_data_did_change().await;
                }
                Ok(())
            }
            Err(err) => {
                error!(%key, error = %err, "image upload failed");
                self.inner
                    .state
                    .lock()
                    .set_mut(kind)
                    .fail_upload(key, format!("Image upload failed. {err}"));
                Err(err.into())
            }
        }
    }

    /// Retry an upload that previously failed.
    pub async fn retry_upload(&self, kind: SetKind, key: ImageKey) -> Result<(), ProjectError> {
        self.upload_image(kind, key).await
    }

    pub async fn remove_image(&self, kind: SetKind, key: ImageKey) -> Result<TrainingImage, ProjectError> {
        let removed = self
            .change_training_data(
                |state| image_exists(state, kind, key),
                |state| state.set_mut(kind).remove_image(key),
            )?
            .flatten()
            .ok_or(ProjectError::ImageNotFound)?;
        self.training_data_did_change().await;
        Ok(removed)
    }

    pub async fn upweight_image(&self, kind: SetKind, key: ImageKey) -> Result<(), ProjectError> {
        self.set_image_weight(kind, key, UPWEIGHT).await
    }

    pub async fn downweight_image(&self, kind: SetKind, key: ImageKey) -> Result<(), ProjectError> {
        self.set_image_weight(kind, key, DEFAULT_WEIGHT).await
    }

    async fn set_image_weight(&self, kind: SetKind, key: ImageKey, weight: u32) -> Result<(), ProjectError> {
        self.change_training_data(
            |state| image_exists(state, kind, key),
            |state| state.set_mut(kind).set_weight(key, weight),
        )?;
        self.training_data_did_change().await;
        Ok(())
    }

    pub async fn set_model_layer(&self, layer: ModelLayer) {
        let changed = self.change_training_data(
            |state| Ok(state.model_layer != layer),
            |state| state.model_layer = layer,
        );
        if let Ok(Some(())) = changed {
            self.training_data_did_change().await;
        }
    }

    pub async fn set_search_set(&self, search_set: SearchSet) {
        let candidate = search_set.clone();
        let changed = self.change_training_data(
            |state| Ok(state.search_set != candidate),
            |state| state.search_set = search_set,
        );
        if let Ok(Some(())) = changed {
            self.training_data_did_change().await;
        }
    }

    /// Renaming never starts a new version.
    pub fn set_name(&self, name: Option<String>) {
        {
            let mut state = self.inner.state.lock();
            if state.name == name {
                return;
            }
            state.name = name;
        }
        self.set_needs_save();
    }

    pub fn update_publish_info(&self, update: impl FnOnce(&mut PublishInfo)) {
        update(&mut self.inner.state.lock().publish_info);
        self.set_needs_save();
    }

    /// Learn a CAV from the current training data.
    ///
    /// A no-op while a previous request is in flight. On failure the error is
    /// kept as the lens error description.
    pub async fn learn_neural_lens(&self) -> Result<(), ProjectError> {
        let request = {
            let mut state = self.inner.state.lock();
            if state.is_learning {
                return Ok(());
            }
            state.is_learning = true;
            state.neural_lens_error = None;
            CavRequest {
                positive_images: state.positive_set.server_records(),
                negative_images: state.negative_set.server_records(),
                search_images: state.search_set.images().map(<[_]>::to_vec),
                model_layer: state.model_layer,
            }
        };

        match self.inner.services.compute.generate_cav(&request).await {
            Ok(result) => {
                let pending = {
                    let mut state = self.inner.state.lock();
                    let pending = roll_if_needed(&mut state);
                    state.neural_lens = Some(NeuralLens {
                        model_layer: state.model_layer,
                        snapshot_id: state.snapshot_id.clone(),
                        result_images: result.result_images,
                        cav_id: result.cav_id,
                        cav_string: result.cav_string,
                    });
                    state.is_learning = false;
                    info!(
                        snapshot_id = %state.snapshot_id,
                        revision_number = state.revision_number,
                        "neural lens learnt"
                    );
                    pending
                };
                if let Some(snapshot) = pending {
                    self.enqueue(snapshot);
                }
                self.training_data_did_change().await;
                Ok(())
            }
            Err(err) => {
                error!(project_id = %self.project_id(), error = %err, "learning failed");
                let mut state = self.inner.state.lock();
                state.neural_lens_error = Some(format!("Learning failed. {err}"));
                state.is_learning = false;
                Err(err.into())
            }
        }
    }

    /// Save, then copy the current version into a brand new project.
    ///
    /// Returns the new project's snapshot id.
    pub async fn copy_to_new_project(&self, name: impl Into<String>) -> Result<String, ProjectError> {
        self.flush().await;
        let copy = CopySnapshot {
            src_snapshot_id: self.snapshot_id(),
            dst_project_id: generate_project_id(),
            dst_snapshot_id: generate_snapshot_id(),
            dst_name: name.into(),
        };
        self.inner
            .services
            .storage
            .copy_snapshot_to_new_project(&copy)
            .await?;
        info!(
            src_snapshot_id = %copy.src_snapshot_id,
            dst_project_id = %copy.dst_project_id,
            "project copied"
        );
        Ok(copy.dst_snapshot_id)
    }

    /// Remove a version locally and soft-delete it in storage.
    pub async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), ProjectError> {
        self.inner.state.lock().snapshots.remove(snapshot_id);
        self.inner
            .services
            .storage
            .delete_snapshot(snapshot_id)
            .await?;
        Ok(())
    }
}

/// Roll to a new version if the current one has a lens.
fn roll_if_needed(state: &mut ProjectState) -> Option<ProjectSnapshot> {
    let revision = state.revision_number;
    let pending = state.training_data_will_change(now_ms());
    if state.revision_number != revision {
        debug!(
            project_id = %state.project_id,
            snapshot_id = %state.snapshot_id,
            revision_number = state.revision_number,
            "rolled to new snapshot"
        );
    }
    pending
}

fn image_exists(state: &ProjectState, kind: SetKind, key: ImageKey) -> Result<bool, ProjectError> {
    match state.set(kind).get(key) {
        Some(_) => Ok(true),
        None => Err(ProjectError::ImageNotFound),
    }
}
