//! Async admission primitives.
//!
//! [`Semaphore`] bounds how many guarded sections run at once (image uploads
//! use eight slots); [`Mutex`] is the single-slot case used to serialize
//! network session checks, scout dataset loading and ticket queue draining.

mod mutex;
mod semaphore;

pub use mutex::Mutex;
pub use semaphore::{Permit, Semaphore};
