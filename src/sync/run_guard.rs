use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use utoipa::ToSchema;

/// Shared scheduling state, only touched under `RunGuard`'s lock
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RunGuardState {
    /// End time of the most recent run
    pub last_run_at: Option<DateTime<Utc>>,
    pub in_progress: bool,
}

/// Reason a run was not allowed to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuardDenied {
    #[error("already running")]
    AlreadyRunning,

    #[error("too soon since last run")]
    TooSoon { next_eligible_at: DateTime<Utc> },
}

#[derive(Debug, Default)]
struct GuardInner {
    state: RunGuardState,
    /// Monotonic end time of the most recent run; the cooldown is measured
    /// against this, `state.last_run_at` is for reporting only
    last_finished: Option<Instant>,
}

/// Prevents overlapping runs and enforces a minimum interval between them
///
/// Two states: idle and running. `try_acquire` moves idle to running when the
/// cooldown has elapsed; `release` always moves back to idle and stamps the
/// run end time. Both transitions happen under a single mutex.
pub struct RunGuard {
    inner: Mutex<GuardInner>,
    min_interval: Duration,
}

/// Proof of a granted acquisition; releases the guard when dropped
///
/// Dropping covers every exit path of a run, including errors, panics and a
/// cancelled future.
#[must_use = "the guard is released as soon as the permit is dropped"]
pub struct RunPermit<'a> {
    guard: &'a RunGuard,
    released: bool,
}

impl RunGuard {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            inner: Mutex::new(GuardInner::default()),
            min_interval,
        }
    }

    pub fn try_acquire(&self) -> Result<RunPermit<'_>, GuardDenied> {
        self.try_acquire_at(Instant::now())
    }

    /// Attempt the idle -> running transition at a given instant
    pub fn try_acquire_at(&self, now: Instant) -> Result<RunPermit<'_>, GuardDenied> {
        let mut inner = self.inner.lock();

        if inner.state.in_progress {
            return Err(GuardDenied::AlreadyRunning);
        }

        if let Some(last) = inner.last_finished {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                let remaining = chrono::Duration::from_std(self.min_interval - elapsed)
                    .unwrap_or_else(|_| chrono::Duration::zero());
                return Err(GuardDenied::TooSoon {
                    next_eligible_at: Utc::now() + remaining,
                });
            }
        }

        inner.state.in_progress = true;
        Ok(RunPermit {
            guard: self,
            released: false,
        })
    }

    /// Move to idle and record the run end time
    pub fn release(&self) {
        self.release_at(Instant::now());
    }

    pub fn release_at(&self, now: Instant) {
        let mut inner = self.inner.lock();
        inner.state.in_progress = false;
        inner.state.last_run_at = Some(Utc::now());
        inner.last_finished = Some(now);
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RunGuardState {
        self.inner.lock().state.clone()
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl RunPermit<'_> {
    pub fn release(mut self) {
        self.released = true;
        self.guard.release();
    }

    pub fn release_at(mut self, now: Instant) {
        self.released = true;
        self.guard.release_at(now);
    }
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.guard.release();
        }
    }
}
