//! Client core for CAV studio projects.
//!
//! A [`Project`] holds positive and negative training images in memory and
//! autosaves them as immutable [`ProjectSnapshot`]s: edits are debounced,
//! queued per snapshot and retried a bounded number of times. Learning a
//! neural lens pins the current snapshot, so the next training-data edit
//! starts a new version.
//!
//! Remote access goes through the [`ProjectStorage`] and [`CavServer`]
//! traits. In-memory implementations are always available; HTTP clients are
//! behind the `http` feature.

pub mod compute;
mod config;
mod error;
pub mod ids;
mod image;
pub mod lock;
mod project;
mod save_queue;
mod schedule;
pub mod snapshot;
pub mod storage;
pub mod ticket;
mod training_set;

pub use compute::{CavServer, InMemoryCavServer, ScoutImageDataset};
pub use config::{SyncConfig, NEGATIVE_DATASET, SEARCH_DATASET};
pub use error::{DecodeError, ProjectError, TransportError};
pub use image::{
    ImageKey, ImageSource, PendingUpload, ServerImage, TrainingImage, TrainingImageRecord,
    UploadPayload, DEFAULT_WEIGHT, UPWEIGHT,
};
pub use lock::{Mutex, Permit, Semaphore};
pub use project::{Project, SaveState, Services};
pub use save_queue::{SaveQueue, SaveQueueItem, SaveStats};
pub use schedule::Debouncer;
pub use snapshot::{
    CustomSearchSet, ModelLayer, NeuralLens, ProjectSnapshot, PublishInfo, SearchSet,
};
pub use storage::{InMemoryProjectStorage, ProjectStorage};
pub use ticket::{InspectCache, Ticket, TicketCache, TicketStatus};
pub use training_set::{SetKind, TrainingImageSet};

#[cfg(feature = "http")]
pub use compute::HttpCavServer;
#[cfg(feature = "http")]
pub use storage::HttpProjectStorage;
