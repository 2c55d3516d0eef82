//! # Change feed & live subscriptions
//!
//! Every write that goes through `ComplaintService` publishes a
//! [`ChangeEvent`]. A [`Subscription`] listens to those events and
//! re-delivers the full newest-first snapshot for its scope after each one.
//!
//! Bursts of events are coalesced: a subscriber that falls behind gets one
//! fresh snapshot, not one per write. Snapshot reads that fail are retried
//! with exponential backoff; once the retries are exhausted the subscriber
//! receives a final `DomainError::Subscription` and the task ends.

use std::sync::Arc;
use std::time::Duration;

use domains::{Complaint, ComplaintRepository, DomainError, ListScope, Result, Status};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A full newest-first result set.
pub type Snapshot = Vec<Complaint>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(Uuid),
    StatusChanged { id: Uuid, status: Status },
    Normalized(Uuid),
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // No receivers is fine: nobody is watching.
        let _ = self.tx.send(event);
    }

    pub fn listen(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Backoff schedule for snapshot reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): doubles each time,
    /// capped at `max_backoff`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

async fn snapshot_with_retry(
    repo: &dyn ComplaintRepository,
    scope: ListScope,
    retry: RetryPolicy,
) -> Result<Snapshot> {
    let mut attempt = 0;
    loop {
        match repo.list_newest_first(scope).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(err) if attempt < retry.max_retries => {
                let delay = retry.delay_for(attempt);
                tracing::warn!(error = %err, attempt, ?delay, "snapshot read failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::error!(error = %err, attempts = attempt + 1, "giving up on subscription");
                return Err(DomainError::Subscription(err.to_string()));
            }
        }
    }
}

/// Handle to a live, push-based listing.
///
/// Dropping the handle (or calling [`Subscription::cancel`]) stops the
/// background task and releases its feed listener.
pub struct Subscription {
    rx: mpsc::Receiver<Result<Snapshot>>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn spawn(
        repo: Arc<dyn ComplaintRepository>,
        feed: &ChangeFeed,
        scope: ListScope,
        retry: RetryPolicy,
    ) -> Self {
        // Listen before the first read so no write can slip between them.
        let changes = feed.listen();
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(run(repo, changes, scope, retry, tx));
        Self { rx, task }
    }

    /// Waits for the next snapshot. `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<Result<Snapshot>> {
        self.rx.recv().await
    }

    /// Stops the subscription now. Equivalent to dropping the handle: `Drop`
    /// aborts the background task.
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    repo: Arc<dyn ComplaintRepository>,
    mut changes: broadcast::Receiver<ChangeEvent>,
    scope: ListScope,
    retry: RetryPolicy,
    tx: mpsc::Sender<Result<Snapshot>>,
) {
    tracing::debug!(?scope, "subscription started");
    loop {
        match snapshot_with_retry(repo.as_ref(), scope, retry).await {
            Ok(snapshot) => {
                if tx.send(Ok(snapshot)).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = tx.send(Err(err)).await;
                break;
            }
        }

        tokio::select! {
            _ = tx.closed() => break,
            event = changes.recv() => match event {
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }

        // Coalesce whatever else is already queued.
        loop {
            match changes.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
    tracing::debug!(?scope, "subscription ended");
}
