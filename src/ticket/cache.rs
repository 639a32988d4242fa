use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::lock::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum TicketStatus<T> {
    Queued,
    Loading,
    Completed(T),
    Failed(TransportError),
    Cancelled,
}

impl<T> TicketStatus<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TicketStatus::Completed(_) | TicketStatus::Failed(_) | TicketStatus::Cancelled
        )
    }
}

/// Handle to one requested fetch.
pub struct Ticket<T> {
    cache_key: String,
    status: parking_lot::Mutex<TicketStatus<T>>,
    changed: Notify,
}

impl<T: Clone> Ticket<T> {
    fn with_status(cache_key: String, status: TicketStatus<T>) -> Arc<Self> {
        Arc::new(Ticket {
            cache_key,
            status: parking_lot::Mutex::new(status),
            changed: Notify::new(),
        })
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn status(&self) -> TicketStatus<T> {
        self.status.lock().clone()
    }

    pub fn result(&self) -> Option<T> {
        match &*self.status.lock() {
            TicketStatus::Completed(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<TransportError> {
        match &*self.status.lock() {
            TicketStatus::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.status.lock(), TicketStatus::Loading)
    }

    pub fn was_cancelled(&self) -> bool {
        matches!(*self.status.lock(), TicketStatus::Cancelled)
    }

    /// Cancel a ticket that has not started loading. Returns whether it was
    /// still queued; loading tickets run to completion.
    pub fn cancel(&self) -> bool {
        let mut status = self.status.lock();
        if !matches!(*status, TicketStatus::Queued) {
            return false;
        }
        *status = TicketStatus::Cancelled;
        drop(status);
        self.changed.notify_waiters();
        true
    }

    /// Wait until the ticket is completed, failed or cancelled.
    pub async fn wait(&self) -> TicketStatus<T> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let status = self.status();
            if status.is_terminal() {
                return status;
            }
            notified.await;
        }
    }

    /// Move a queued ticket to loading; false if it was cancelled meanwhile.
    fn start(&self) -> bool {
        let mut status = self.status.lock();
        if !matches!(*status, TicketStatus::Queued) {
            return false;
        }
        *status = TicketStatus::Loading;
        drop(status);
        self.changed.notify_waiters();
        true
    }

    fn set(&self, status: TicketStatus<T>) {
        *self.status.lock() = status;
        self.changed.notify_waiters();
    }
}

struct Job<T> {
    ticket: Arc<Ticket<T>>,
    load: BoxFuture<'static, Result<T, TransportError>>,
}

struct CacheState<T> {
    completed: HashMap<String, T>,
    queue: VecDeque<Job<T>>,
    in_flight: HashMap<String, Arc<Ticket<T>>>,
}

struct CacheInner<T> {
    state: parking_lot::Mutex<CacheState<T>>,
    gate: Mutex,
}

/// Results cached permanently by key, fetched one at a time.
///
/// Requests for a key that is already queued or loading share its ticket.
/// Failures are not cached, so a later request fetches again.
pub struct TicketCache<T> {
    inner: Arc<CacheInner<T>>,
}

impl<T> Clone for TicketCache<T> {
    fn clone(&self) -> Self {
        TicketCache {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for TicketCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> TicketCache<T> {
    pub fn new() -> Self {
        TicketCache {
            inner: Arc::new(CacheInner {
                state: parking_lot::Mutex::new(CacheState {
                    completed: HashMap::new(),
                    queue: VecDeque::new(),
                    in_flight: HashMap::new(),
                }),
                gate: Mutex::new(),
            }),
        }
    }

    /// Ticket for `key`, enqueueing `load` only if nothing is cached or
    /// pending for it.
    ///
    /// Outside a tokio runtime the ticket stays queued until a later request
    /// made inside one drains the queue.
    pub fn request<F>(&self, key: impl Into<String>, load: F) -> Arc<Ticket<T>>
    where
        F: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        let key = key.into();
        let ticket = {
            let mut state = self.inner.state.lock();
            if let Some(value) = state.completed.get(&key) {
                return Ticket::with_status(key, TicketStatus::Completed(value.clone()));
            }
            if let Some(ticket) = state.in_flight.get(&key) {
                return Arc::clone(ticket);
            }
            if let Some(job) = state
                .queue
                .iter()
                .find(|job| job.ticket.cache_key == key && !job.ticket.was_cancelled())
            {
                return Arc::clone(&job.ticket);
            }

            let ticket = Ticket::with_status(key, TicketStatus::Queued);
            state.queue.push_back(Job {
                ticket: Arc::clone(&ticket),
                load: load.boxed(),
            });
            ticket
        };
        debug!(cache_key = %ticket.cache_key, "ticket queued");

        match Handle::try_current() {
            Ok(runtime) => {
                let inner = Arc::clone(&self.inner);
                runtime.spawn(async move {
                    inner.gate.run_exclusive(|| inner.drain()).await;
                });
            }
            Err(_) => warn!(cache_key = %ticket.cache_key, "no tokio runtime, ticket left queued"),
        }
        ticket
    }

    /// Cancel every queued ticket. Loading tickets are unaffected.
    pub fn clear_queue(&self) {
        let jobs: Vec<Job<T>> = self.inner.state.lock().queue.drain(..).collect();
        for job in jobs {
            job.ticket.cancel();
        }
    }

    pub fn queued(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    pub fn cached(&self, key: &str) -> Option<T> {
        self.inner.state.lock().completed.get(key).cloned()
    }
}

impl<T: Clone + Send + Sync + 'static> CacheInner<T> {
    /// Load queued jobs one after another until the queue is empty.
    async fn drain(&self) {
        while let Some(job) = self.next_job() {
            self.load(job).await;
        }
    }

    /// Pop the next job that was not cancelled and mark it loading.
    fn next_job(&self) -> Option<Job<T>> {
        let mut state = self.state.lock();
        while let Some(job) = state.queue.pop_front() {
            if job.ticket.start() {
                state
                    .in_flight
                    .insert(job.ticket.cache_key.clone(), Arc::clone(&job.ticket));
                return Some(job);
            }
        }
        None
    }

    async fn load(&self, job: Job<T>) {
        let outcome = job.load.await;
        let ticket = job.ticket;

        let mut state = self.state.lock();
        state.in_flight.remove(&ticket.cache_key);
        match outcome {
            Ok(value) => {
                state
                    .completed
                    .insert(ticket.cache_key.clone(), value.clone());
                drop(state);
                ticket.set(TicketStatus::Completed(value));
            }
            Err(err) => {
                drop(state);
                warn!(cache_key = %ticket.cache_key, error = %err, "ticket failed");
                ticket.set(TicketStatus::Failed(err));
            }
        }
    }
}
