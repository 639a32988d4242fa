use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;

/// Counting admission gate with FIFO hand-off.
///
/// `acquire` resolves once a slot is free; waiters are admitted strictly in
/// arrival order. Dropping (or explicitly releasing) the returned [`Permit`]
/// frees the slot and wakes the next waiter.
///
/// Cloning shares the same slots.
#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<SemaphoreState>,
}

struct SemaphoreState {
    capacity: usize,
    slots: parking_lot::Mutex<Slots>,
}

struct Slots {
    count: usize,
    tasks: VecDeque<oneshot::Sender<Permit>>,
}

/// Release capability for one semaphore slot.
///
/// Releasing is idempotent: only the first `release` (or the drop) counts.
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct Permit {
    owner: Option<Arc<SemaphoreState>>,
}

impl Semaphore {
    pub fn new(capacity: usize) -> Self {
        Semaphore {
            inner: Arc::new(SemaphoreState {
                capacity,
                slots: parking_lot::Mutex::new(Slots {
                    count: capacity,
                    tasks: VecDeque::new(),
                }),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.inner.slots.lock().count
    }

    /// Acquire requests waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.inner.slots.lock().tasks.len()
    }

    /// Wait for a slot.
    pub async fn acquire(&self) -> Permit {
        loop {
            let rx = {
                let mut slots = self.inner.slots.lock();
                if slots.count > 0 && slots.tasks.is_empty() {
                    slots.count -= 1;
                    return Permit::new(Arc::clone(&self.inner));
                }
                let (tx, rx) = oneshot::channel();
                slots.tasks.push_back(tx);
                rx
            };

            // The sender is only dropped after a hand-off attempt, so an
            // error here means nothing was handed over: queue up again.
            if let Ok(permit) = rx.await {
                return permit;
            }
        }
    }

    /// Take a slot only if one is free and nobody is queued ahead.
    pub fn try_acquire(&self) -> Option<Permit> {
        let mut slots = self.inner.slots.lock();
        if slots.count > 0 && slots.tasks.is_empty() {
            slots.count -= 1;
            Some(Permit::new(Arc::clone(&self.inner)))
        } else {
            None
        }
    }

    /// Run `f` while holding a slot.
    ///
    /// The slot is released on every exit path of `f`, including errors,
    /// panics and cancellation of the returned future.
    pub async fn run<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.acquire().await;
        f().await
    }
}

impl SemaphoreState {
    fn release(self: &Arc<Self>) {
        let mut slots = self.slots.lock();
        slots.count += 1;
        debug_assert!(slots.count <= self.capacity, "semaphore over-released");
        self.schedule(&mut slots);
    }

    /// Hand free slots to queued waiters, oldest first.
    fn schedule(self: &Arc<Self>, slots: &mut Slots) {
        while slots.count > 0 {
            let Some(task) = slots.tasks.pop_front() else {
                break;
            };
            slots.count -= 1;
            if let Err(mut permit) = task.send(Permit::new(Arc::clone(self))) {
                // waiter went away; take the slot back without re-entering release
                permit.owner = None;
                slots.count += 1;
            }
        }
    }
}

impl Permit {
    fn new(owner: Arc<SemaphoreState>) -> Self {
        Permit { owner: Some(owner) }
    }

    pub fn release(&mut self) {
        if let Some(owner) = self.owner.take() {
            owner.release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.owner.is_none()
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.release();
    }
}
