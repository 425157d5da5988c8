// src/readiness/mod.rs

//! Cluster readiness gate.
//!
//! The backend has no readiness notification, so the gate polls a sentinel
//! resource until it returns at least one row. Each check session walks
//! `Unknown -> Polling -> {Ready | Failed}`; at most one probe request is in
//! flight at a time and the next one is scheduled only after the previous
//! one settles.

use std::future::pending;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::binder::ResourceHandle;
use crate::error::ReadinessError;
use crate::structs::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Unknown,
    Polling,
    Ready,
    Failed,
}

/// What to do when a probe request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the failure to the caller.
    Surface,
    /// Start a fresh session after the given (usually coarser) interval.
    RetryAfter(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessOptions {
    pub interval: Duration,
    pub timeout: Option<Duration>,
    pub on_failure: FailurePolicy,
}

impl ReadinessOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
            on_failure: FailurePolicy::Surface,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessReport {
    /// Probe requests issued across all sessions.
    pub attempts: u32,
    pub sessions: u32,
    pub elapsed: Duration,
}

pub struct ReadinessGate {
    state: watch::Sender<ReadinessState>,
    // Every transition in order; watch receivers only see the latest value.
    #[cfg(test)]
    history: std::sync::Mutex<Vec<ReadinessState>>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

// Bookkeeping shared by every session of one `await_ready_with` call.
struct Progress<'a> {
    started: Instant,
    deadline: Option<Instant>,
    cancel: &'a CancellationToken,
    attempts: u32,
}

impl Progress<'_> {
    fn timed_out(&self) -> ReadinessError {
        ReadinessError::Timeout {
            attempts: self.attempts,
            elapsed: self.started.elapsed(),
        }
    }

    fn cancelled(&self) -> ReadinessError {
        ReadinessError::Cancelled { attempts: self.attempts }
    }

    // Sleeps for `delay` unless cancelled or the deadline passes first.
    async fn wait(&self, delay: Duration) -> Result<(), ReadinessError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(self.cancelled()),
            _ = until(self.deadline) => Err(self.timed_out()),
            _ = sleep(delay) => Ok(()),
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending::<()>().await,
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ReadinessState::Unknown);
        Self {
            state,
            #[cfg(test)]
            history: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> ReadinessState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ReadinessState> {
        self.state.subscribe()
    }

    fn transition(&self, next: ReadinessState) {
        #[cfg(test)]
        self.history.lock().unwrap().push(next);
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("[READINESS] {:?} -> {:?}", previous, next);
        }
    }

    /// Single check session: resolves once the probe returns a non-empty
    /// result, fails on the first probe error or when `timeout` elapses.
    pub async fn await_ready(
        &self,
        probe: &ResourceHandle,
        interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<ReadinessReport, ReadinessError> {
        let options = ReadinessOptions {
            interval,
            timeout,
            on_failure: FailurePolicy::Surface,
        };
        self.await_ready_with(probe, &options, &CancellationToken::new()).await
    }

    /// Polls `probe` per `options` until ready, applying the failure policy
    /// between sessions. Cancelling `cancel` stops all further polling.
    pub async fn await_ready_with(
        &self,
        probe: &ResourceHandle,
        options: &ReadinessOptions,
        cancel: &CancellationToken,
    ) -> Result<ReadinessReport, ReadinessError> {
        let started = Instant::now();
        let mut progress = Progress {
            started,
            deadline: options.timeout.map(|t| started + t),
            cancel,
            attempts: 0,
        };
        let mut sessions = 0;

        loop {
            sessions += 1;
            match self.run_session(probe, options.interval, &mut progress).await {
                Ok(()) => {
                    self.transition(ReadinessState::Ready);
                    info!(
                        "[READINESS] Cluster ready after {} attempt(s) in {:?}",
                        progress.attempts,
                        started.elapsed()
                    );
                    return Ok(ReadinessReport {
                        attempts: progress.attempts,
                        sessions,
                        elapsed: started.elapsed(),
                    });
                }
                Err(err) => {
                    self.transition(ReadinessState::Failed);
                    match options.on_failure {
                        FailurePolicy::RetryAfter(delay) if err.is_retryable() => {
                            warn!("[READINESS] {}; starting a new check in {:?}", err, delay);
                            progress.wait(delay).await?;
                        }
                        _ => {
                            warn!("[READINESS] {}", err);
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    async fn run_session(
        &self,
        probe: &ResourceHandle,
        interval: Duration,
        progress: &mut Progress<'_>,
    ) -> Result<(), ReadinessError> {
        self.transition(ReadinessState::Unknown);
        let params = Params::new();

        loop {
            self.transition(ReadinessState::Polling);
            progress.attempts += 1;

            let outcome = tokio::select! {
                biased;
                _ = progress.cancel.cancelled() => return Err(progress.cancelled()),
                _ = until(progress.deadline) => return Err(progress.timed_out()),
                outcome = probe.fetch(&params) => outcome,
            };

            match outcome {
                Ok(result) if !result.is_empty() => return Ok(()),
                Ok(_) => {
                    debug!(
                        "[READINESS] Sentinel empty on attempt {}; next poll in {:?}",
                        progress.attempts, interval
                    );
                    progress.wait(interval).await?;
                }
                Err(source) => {
                    return Err(ReadinessError::Probe {
                        attempts: progress.attempts,
                        source: Box::new(source),
                    })
                }
            }
        }
    }
}
