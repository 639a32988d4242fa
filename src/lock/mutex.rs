use std::future::Future;

use super::semaphore::{Permit, Semaphore};

/// Async mutual exclusion: a [`Semaphore`] with a single slot.
///
/// Guards no data of its own; it serializes whole operations (a network
/// session check, a queue drain) rather than protecting a value.
#[derive(Clone)]
pub struct Mutex {
    gate: Semaphore,
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl Mutex {
    pub fn new() -> Self {
        Mutex {
            gate: Semaphore::new(1),
        }
    }

    pub async fn lock(&self) -> Permit {
        self.gate.acquire().await
    }

    pub fn try_lock(&self) -> Option<Permit> {
        self.gate.try_acquire()
    }

    pub fn is_locked(&self) -> bool {
        self.gate.available() == 0
    }

    /// Run `f` with exclusive access, releasing on every exit path.
    pub async fn run_exclusive<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.gate.run(f).await
    }
}
