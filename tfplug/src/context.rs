//! Context implementation for operation deadlines and cancellation
//!
//! Every lifecycle call receives a Context. Polling helpers consult it so a
//! wait loop never outlives the operation that started it.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries cancellation signals and the operation deadline
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derive a context that is cancelled once `timeout` elapses. A tighter
    /// deadline inherited from `self` wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let mut deadline = Instant::now() + timeout;
        if let Some(parent) = self.inner.deadline {
            deadline = deadline.min(parent);
        }

        let (done_tx, done_rx) = watch::channel(*self.inner.done.borrow());

        let timer_tx = done_tx.clone();
        let mut parent_done = self.inner.done.clone();
        tokio::spawn(async move {
            let parent_cancelled = async move {
                while !*parent_done.borrow() {
                    if parent_done.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
            };
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = parent_cancelled => {}
            }
            let _ = timer_tx.send(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, None when no deadline is set
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Clamp an operation timeout to what the context still allows
    pub fn effective_timeout(&self, timeout: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => remaining.min(timeout),
            None => timeout,
        }
    }

    /// Returns a channel that flips to true when work done on behalf of this
    /// context should stop
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
