//! Polling for asynchronous state transitions
//!
//! Cloud APIs answer most mutating calls before the object settles. A
//! [`StateChangeConf`] polls a refresh function until the reported state
//! reaches one of the targets, failing on unexpected states, repeated
//! not-found results, or the deadline.

use crate::context::Context;
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

const INITIAL_WAIT: Duration = Duration::from_millis(100);
const MAX_WAIT: Duration = Duration::from_secs(10);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(180);

pub const DEFAULT_NOT_FOUND_CHECKS: usize = 20;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WaitError {
    #[error("timeout while waiting for state to become '{target}' (last state: '{last_state}', timeout: {timeout:?})")]
    Timeout {
        last_state: String,
        target: String,
        timeout: Duration,
    },

    #[error("unexpected state '{state}', wanted target '{target}'")]
    UnexpectedState { state: String, target: String },

    #[error("couldn't find resource ({checks} retries)")]
    NotFound { checks: usize },

    #[error("{0}")]
    Refresh(String),

    #[error("operation cancelled while waiting for state to become '{target}'")]
    Cancelled { target: String },
}

/// Result of a single refresh: `None` when the object does not exist,
/// otherwise the object together with its current state string
pub type RefreshResult<T, E> = Result<Option<(T, String)>, E>;

#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub timeout: Duration,
    /// Wait before the first refresh
    pub delay: Duration,
    /// Lower bound for the exponential wait between refreshes
    pub min_timeout: Duration,
    /// Fixed wait between refreshes; overrides the exponential backoff
    pub poll_interval: Option<Duration>,
    pub not_found_checks: usize,
    pub continuous_target_occurence: usize,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: None,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            continuous_target_occurence: 1,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn not_found_checks(mut self, checks: usize) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn continuous_target_occurence(mut self, occurrences: usize) -> Self {
        self.continuous_target_occurence = occurrences.max(1);
        self
    }

    fn target_display(&self) -> String {
        self.target.join(", ")
    }

    fn next_wait(&self, previous: Duration) -> Duration {
        if let Some(interval) = self.poll_interval {
            if !interval.is_zero() && interval < MAX_POLL_INTERVAL {
                return interval;
            }
        }

        let wait = if previous.is_zero() {
            INITIAL_WAIT
        } else {
            (previous * 2).min(MAX_WAIT)
        };
        wait.max(self.min_timeout)
    }

    /// Poll `refresh` until the object reaches a target state. The effective
    /// timeout is the shorter of `self.timeout` and the context deadline.
    pub async fn wait_for_state<T, E, F, Fut>(
        &self,
        ctx: &Context,
        mut refresh: F,
    ) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RefreshResult<T, E>>,
        E: Display,
    {
        let timeout = ctx.effective_timeout(self.timeout);
        let deadline = Instant::now() + timeout;
        let mut last_state = String::new();
        let mut not_found_ticks = 0usize;
        let mut target_occurence = 0usize;
        let mut wait = Duration::ZERO;

        tracing::debug!(
            pending = ?self.pending,
            target = ?self.target,
            ?timeout,
            "Waiting for state"
        );

        if !self.delay.is_zero() {
            self.sleep_until_next(ctx, deadline, self.delay, &last_state, timeout)
                .await?;
        }

        loop {
            if ctx.is_cancelled() {
                return Err(self.cancelled_error(ctx, &last_state, timeout));
            }

            match refresh().await.map_err(|e| WaitError::Refresh(e.to_string()))? {
                None => {
                    target_occurence = 0;
                    not_found_ticks += 1;
                    if not_found_ticks > self.not_found_checks {
                        return Err(WaitError::NotFound {
                            checks: not_found_ticks,
                        });
                    }
                }
                Some((object, state)) => {
                    not_found_ticks = 0;
                    tracing::trace!(state = %state, "Refreshed object state");

                    if self.target.contains(&state) {
                        target_occurence += 1;
                        if target_occurence >= self.continuous_target_occurence {
                            return Ok(object);
                        }
                    } else if self.pending.contains(&state) {
                        target_occurence = 0;
                    } else {
                        return Err(WaitError::UnexpectedState {
                            state,
                            target: self.target_display(),
                        });
                    }
                    last_state = state;
                }
            }

            wait = self.next_wait(wait);
            self.sleep_until_next(ctx, deadline, wait, &last_state, timeout)
                .await?;
        }
    }

    async fn sleep_until_next(
        &self,
        ctx: &Context,
        deadline: Instant,
        wait: Duration,
        last_state: &str,
        timeout: Duration,
    ) -> Result<(), WaitError> {
        let now = Instant::now();
        if now >= deadline {
            return Err(self.timeout_error(last_state, timeout));
        }

        let mut done = ctx.done();
        let nap = wait.min(deadline - now);
        tokio::select! {
            _ = tokio::time::sleep(nap) => {}
            _ = done.wait_for(|cancelled| *cancelled) => {
                return Err(self.cancelled_error(ctx, last_state, timeout));
            }
        }

        if Instant::now() >= deadline {
            return Err(self.timeout_error(last_state, timeout));
        }
        Ok(())
    }

    /// A context cancelled by its own deadline is reported as a timeout
    fn cancelled_error(&self, ctx: &Context, last_state: &str, timeout: Duration) -> WaitError {
        match ctx.deadline() {
            Some(deadline) if Instant::now() >= deadline => self.timeout_error(last_state, timeout),
            _ => WaitError::Cancelled {
                target: self.target_display(),
            },
        }
    }

    fn timeout_error(&self, last_state: &str, timeout: Duration) -> WaitError {
        WaitError::Timeout {
            last_state: last_state.to_string(),
            target: self.target_display(),
            timeout,
        }
    }
}
