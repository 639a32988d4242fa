//! Persisted project versions and the documents embedded in them.

mod list;
mod neural_lens;
mod publish_info;
mod record;
mod search_set;

pub use list::SnapshotList;
pub use neural_lens::NeuralLens;
pub use publish_info::PublishInfo;
pub use record::{ImageSetRecord, ModelLayer, ProjectSnapshot};
pub use search_set::{CustomSearchSet, SearchSet};
