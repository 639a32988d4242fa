//! The versioned project document and its autosave cycle.

mod handle;
mod services;
mod state;

pub use handle::{Project, SaveState};
pub use services::Services;
