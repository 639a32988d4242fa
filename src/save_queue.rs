//! Serial, retrying snapshot persistence.
//!
//! Items are written one at a time in FIFO order. A failed write goes back to
//! the front of the queue after a backoff and is dropped once it has failed
//! `max_attempts` times. Enqueueing a snapshot that is already waiting
//! replaces the waiting copy, so only the newest content of a snapshot is
//! ever written.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::config::SyncConfig;
use crate::error::TransportError;
use crate::snapshot::ProjectSnapshot;
use crate::storage::ProjectStorage;

#[derive(Debug, Clone, PartialEq)]
pub struct SaveQueueItem {
    pub project_id: String,
    pub snapshot_id: String,
    pub content: ProjectSnapshot,
    /// Failed attempts so far.
    pub retry_count: u32,
}

impl SaveQueueItem {
    pub fn new(content: ProjectSnapshot) -> Self {
        SaveQueueItem {
            project_id: content.project_id.clone(),
            snapshot_id: content.snapshot_id.clone(),
            content,
            retry_count: 0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveStats {
    pub saved: usize,
    pub retried: usize,
    /// Items given up on after exhausting their attempts.
    pub dropped: usize,
}

#[derive(Clone)]
pub struct SaveQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    storage: Arc<dyn ProjectStorage>,
    max_attempts: u32,
    backoff: Duration,
    state: parking_lot::Mutex<QueueState>,
    idle: Notify,
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<SaveQueueItem>,
    running: bool,
    last_error: Option<TransportError>,
    stats: SaveStats,
}

/// Clears the running flag if the drain loop is cancelled or panics.
///
/// A normal exit clears the flag itself, under the lock that observed the
/// empty queue, and disarms the guard.
struct RunningGuard<'a> {
    inner: &'a QueueInner,
    armed: bool,
}

impl RunningGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.state.lock().running = false;
        }
        self.inner.idle.notify_waiters();
    }
}

impl SaveQueue {
    pub fn new(storage: Arc<dyn ProjectStorage>, config: &SyncConfig) -> Self {
        SaveQueue {
            inner: Arc::new(QueueInner {
                storage,
                max_attempts: config.max_save_attempts.max(1),
                backoff: config.retry_backoff(),
                state: parking_lot::Mutex::new(QueueState::default()),
                idle: Notify::new(),
            }),
        }
    }

    /// Append `item`, replacing any waiting item for the same snapshot.
    pub fn enqueue(&self, item: SaveQueueItem) {
        let mut state = self.inner.state.lock();
        let before = state.items.len();
        state.items.retain(|queued| queued.snapshot_id != item.snapshot_id);
        debug!(
            snapshot_id = %item.snapshot_id,
            replaced = before != state.items.len(),
            "save enqueued"
        );
        state.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().items.is_empty()
    }

    pub fn pending_snapshot_ids(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .items
            .iter()
            .map(|item| item.snapshot_id.clone())
            .collect()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// Error of the most recent failed write; cleared by the next success.
    pub fn last_error(&self) -> Option<TransportError> {
        self.inner.state.lock().last_error.clone()
    }

    pub fn stats(&self) -> SaveStats {
        self.inner.state.lock().stats
    }

    /// Spawn a drain on the current runtime. No-op while one is running.
    pub fn start(&self) {
        if self.is_running() {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                let queue = self.clone();
                handle.spawn(async move { queue.drain().await });
            }
            Err(_) => warn!("no tokio runtime, save queue not started"),
        }
    }

    /// Write queued items until the queue is empty.
    ///
    /// Returns immediately if another drain is already running.
    pub async fn drain(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.running {
                return;
            }
            state.running = true;
        }
        let mut running = RunningGuard {
            inner: &self.inner,
            armed: true,
        };

        loop {
            let next = {
                let mut state = self.inner.state.lock();
                let next = state.items.pop_front();
                if next.is_none() {
                    state.running = false;
                    running.disarm();
                }
                next
            };
            let Some(mut item) = next else {
                break;
            };

            let result = self
                .inner
                .storage
                .set_snapshot(&item.project_id, &item.snapshot_id, &item.content)
                .await;

            match result {
                Ok(()) => {
                    let mut state = self.inner.state.lock();
                    state.last_error = None;
                    state.stats.saved += 1;
                    debug!(snapshot_id = %item.snapshot_id, "snapshot saved");
                }
                Err(err) => {
                    item.retry_count += 1;
                    if self.requeue_failed(item, &err) {
                        tokio::time::sleep(self.inner.backoff).await;
                    }
                }
            }
        }
    }

    /// Record a failed write and put the item back at the front if it has
    /// attempts left and no newer copy is waiting. Returns whether it was
    /// requeued.
    fn requeue_failed(&self, item: SaveQueueItem, err: &TransportError) -> bool {
        let mut state = self.inner.state.lock();
        state.last_error = Some(err.clone());

        if state
            .items
            .iter()
            .any(|queued| queued.snapshot_id == item.snapshot_id)
        {
            debug!(snapshot_id = %item.snapshot_id, "failed save superseded by newer content");
            return false;
        }

        if item.retry_count < self.inner.max_attempts {
            warn!(
                snapshot_id = %item.snapshot_id,
                retry_count = item.retry_count,
                error = %err,
                "save failed, retrying"
            );
            state.stats.retried += 1;
            state.items.push_front(item);
            true
        } else {
            error!(
                snapshot_id = %item.snapshot_id,
                project_id = %item.project_id,
                retry_count = item.retry_count,
                error = %err,
                "save failed, giving up"
            );
            state.stats.dropped += 1;
            false
        }
    }

    /// Wait until the queue is empty and no drain is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let state = self.inner.state.lock();
                if !state.running && state.items.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }
}
