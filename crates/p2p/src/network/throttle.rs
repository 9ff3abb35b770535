//! Bounded-concurrency task admission.
//!
//! A [`ThrottlingTaskQueue`] runs at most `max_concurrent` tasks at a time.
//! Tasks submitted while the queue is full wait in a FIFO and are started,
//! in submission order, as running tasks finish. A finishing task hands its
//! slot straight to the next pending task, so the in-flight count never
//! exceeds the limit and never drops while work is waiting.
//!
//! Admission happens synchronously inside [`ThrottlingTaskQueue::queue_task`],
//! which is what gives the ordering guarantee: tasks are ordered by when
//! `queue_task` was called, not by when anyone polls the returned future.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// A queued task disappeared before producing its result.
///
/// Happens if the task panicked or the runtime shut down under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Queued task was aborted before producing a result")]
pub struct TaskAborted;

/// Starts a task. Called exactly once, outside the state lock.
type StartTask = Box<dyn FnOnce() + Send>;

struct QueueState {
    in_flight: usize,
    pending: VecDeque<StartTask>,
}

struct QueueShared {
    max_concurrent: usize,
    state: Mutex<QueueState>,
}

impl QueueShared {
    fn admit(&self, start: StartTask) {
        let start_now = {
            let mut state = self.state.lock();
            if state.in_flight < self.max_concurrent {
                state.in_flight += 1;
                Some(start)
            } else {
                state.pending.push_back(start);
                None
            }
        };

        if let Some(start) = start_now {
            start();
        }
    }

    fn release(&self) {
        // The slot passes directly to the next pending task; in_flight only
        // drops when nothing is waiting.
        let next = {
            let mut state = self.state.lock();
            let next = state.pending.pop_front();
            if next.is_none() {
                state.in_flight -= 1;
            }
            next
        };

        if let Some(start) = next {
            start();
        }
    }
}

/// Releases a slot when a running task ends, however it ends.
struct SlotGuard {
    shared: Arc<QueueShared>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.shared.release();
    }
}

/// Admission queue bounding how many tasks run concurrently.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct ThrottlingTaskQueue {
    shared: Arc<QueueShared>,
}

impl ThrottlingTaskQueue {
    /// Create a queue allowing `max_concurrent` tasks at once (at least 1).
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            shared: Arc::new(QueueShared {
                max_concurrent: max_concurrent.max(1),
                state: Mutex::new(QueueState {
                    in_flight: 0,
                    pending: VecDeque::new(),
                }),
            }),
        }
    }

    /// Submit a unit of work.
    ///
    /// The work starts immediately (on the tokio runtime) if a slot is free,
    /// otherwise once every task queued before it has been started and a slot
    /// frees up. The work runs to completion even if the returned future is
    /// dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn queue_task<F, Fut, T>(&self, work: F) -> QueuedTask<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        // Captured here so a task can be started from a slot release that
        // runs outside any runtime context (e.g. during shutdown).
        let runtime = Handle::current();

        let start: StartTask = Box::new(move || {
            runtime.spawn(async move {
                let slot = SlotGuard { shared };
                let result = work().await;
                // Free the slot before the submitter can observe the result.
                drop(slot);
                // The submitter may have stopped waiting.
                let _ = result_tx.send(result);
            });
        });

        self.shared.admit(start);
        QueuedTask { result_rx }
    }

    /// Configured concurrency limit.
    pub fn max_concurrent(&self) -> usize {
        self.shared.max_concurrent
    }

    /// Number of tasks currently running.
    pub fn in_flight(&self) -> usize {
        self.shared.state.lock().in_flight
    }

    /// Number of tasks waiting for a slot.
    pub fn queued(&self) -> usize {
        self.shared.state.lock().pending.len()
    }
}

impl std::fmt::Debug for ThrottlingTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ThrottlingTaskQueue")
            .field("max_concurrent", &self.shared.max_concurrent)
            .field("in_flight", &state.in_flight)
            .field("queued", &state.pending.len())
            .finish()
    }
}

/// Result of a task submitted to a [`ThrottlingTaskQueue`].
#[must_use = "dropping a QueuedTask discards the result, but the task still runs"]
pub struct QueuedTask<T> {
    result_rx: oneshot::Receiver<T>,
}

impl<T> Future for QueuedTask<T> {
    type Output = Result<T, TaskAborted>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.result_rx)
            .poll(cx)
            .map(|result| result.map_err(|_| TaskAborted))
    }
}
