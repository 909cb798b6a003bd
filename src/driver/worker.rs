//! The background analysis driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

use super::query::Query;
use super::retry::RetryTimer;
use crate::context::{AnalysisSession, ChangeNotice};
use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    /// Waiting to be scheduled.
    Idle,
    /// Running analysis tasks.
    Building,
    Shutdown,
}

struct Control {
    scheduled: bool,
    status: DriverStatus,
}

struct Shared {
    session: Arc<AnalysisSession>,
    control: Mutex<Control>,
    wake: Condvar,
    cancel: CancellationToken,
    cycles: AtomicU64,
    notices: Mutex<Vec<ChangeNotice>>,
}

/// How a drive cycle ended.
enum Cycle {
    Idle,
    /// Only work owned by someone else was left; try again later.
    Blocked,
    Cancelled,
}

/// Owns the worker thread that keeps a session analysed.
///
/// The worker sleeps until [`schedule`](Self::schedule) is called, then runs
/// analysis tasks until none are left. Dropping the driver shuts it down.
pub struct AnalysisDriver {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AnalysisDriver {
    /// Start the worker thread. It begins with a drive cycle.
    pub fn start(session: Arc<AnalysisSession>) -> Self {
        let shared = Arc::new(Shared {
            session,
            control: Mutex::new(Control {
                scheduled: true,
                status: DriverStatus::Idle,
            }),
            wake: Condvar::new(),
            cancel: CancellationToken::new(),
            cycles: AtomicU64::new(0),
            notices: Mutex::new(Vec::new()),
        });
        let worker = {
            let shared = shared.clone();
            thread::spawn(move || run(&shared))
        };
        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn session(&self) -> &Arc<AnalysisSession> {
        &self.shared.session
    }

    pub fn status(&self) -> DriverStatus {
        self.shared.control.lock().status
    }

    /// Number of completed drive cycles.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Acquire)
    }

    /// Wake the worker. Calls made while a wake-up is pending coalesce.
    pub fn schedule(&self) {
        let mut control = self.shared.control.lock();
        if control.status == DriverStatus::Shutdown || control.scheduled {
            return;
        }
        control.scheduled = true;
        tracing::trace!("analysis scheduled");
        self.shared.wake.notify_all();
    }

    /// Notices produced since the last call.
    pub fn take_notices(&self) -> Vec<ChangeNotice> {
        std::mem::take(&mut *self.shared.notices.lock())
    }

    /// Run `query` until it stops reporting
    /// [`TemporarilyUnavailable`](AnalysisError::TemporarilyUnavailable).
    ///
    /// Each unavailable answer schedules the driver and waits up to
    /// `wait_interval` for the session to change. After `query_timeout` the
    /// last unavailable error is returned.
    pub fn execute<Q: Query + ?Sized>(&self, query: &Q) -> Result<Q::Output> {
        let session = &self.shared.session;
        let options = session.options();
        let deadline = options.query_timeout.map(|timeout| Instant::now() + timeout);
        loop {
            if self.shared.cancel.is_cancelled() {
                return Err(AnalysisError::Shutdown);
            }
            let seen = session.epoch();
            let error = match query.run(session) {
                Err(error) if error.is_transient() => error,
                outcome => return outcome,
            };

            let mut wait = options.wait_interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    tracing::debug!(error = %error, "query timed out");
                    return Err(error);
                }
                wait = wait.min(deadline - now);
            }
            self.schedule();
            session.wait_for_change(seen, wait);
        }
    }

    /// Stop the worker and wake every waiting query. Idempotent.
    pub fn shutdown(&self) {
        self.shared.cancel.cancel();
        {
            let mut control = self.shared.control.lock();
            control.status = DriverStatus::Shutdown;
            self.shared.wake.notify_all();
        }
        self.shared.session.notify();
        if let Some(worker) = self.worker.lock().take()
            && worker.join().is_err()
        {
            tracing::warn!("analysis worker panicked");
        }
    }
}

impl Drop for AnalysisDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AnalysisDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisDriver")
            .field("status", &self.status())
            .field("cycles", &self.cycles())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WORKER
// ============================================================================

fn run(shared: &Shared) {
    let mut retry = RetryTimer::new(shared.session.options().retry.clone());
    loop {
        {
            let mut control = shared.control.lock();
            while !control.scheduled && !shared.cancel.is_cancelled() {
                shared.wake.wait(&mut control);
            }
            if shared.cancel.is_cancelled() {
                control.status = DriverStatus::Shutdown;
                break;
            }
            control.scheduled = false;
            control.status = DriverStatus::Building;
        }

        let cycle = drive(shared, &mut retry);
        shared.cycles.fetch_add(1, Ordering::AcqRel);
        {
            let mut control = shared.control.lock();
            if control.status == DriverStatus::Building {
                control.status = DriverStatus::Idle;
            }
        }
        shared.session.notify();

        match cycle {
            Cycle::Idle => retry.reset(),
            Cycle::Cancelled => break,
            Cycle::Blocked => {
                let delay = retry.next_delay();
                tracing::debug!(
                    delay_ms = delay.as_millis() as u64,
                    attempt = retry.attempts(),
                    "analysis blocked, retrying"
                );
                let mut control = shared.control.lock();
                if !control.scheduled && !shared.cancel.is_cancelled() {
                    shared.wake.wait_for(&mut control, delay);
                }
                control.scheduled = true;
            }
        }
    }
    tracing::debug!("analysis worker stopped");
}

/// Run analysis tasks until idle, blocked or cancelled.
fn drive(shared: &Shared, retry: &mut RetryTimer) -> Cycle {
    let session = &shared.session;
    let cancel = &shared.cancel;
    tracing::debug!("analysis cycle started");

    let parsed = session.parse_pending(cancel);
    if !parsed.is_empty() {
        retry.reset();
        shared.notices.lock().extend(parsed);
    }

    let mut tasks = 0usize;
    while !cancel.is_cancelled() {
        match session.perform_analysis_task() {
            Ok(Some(notices)) => {
                tasks += 1;
                retry.reset();
                shared.notices.lock().extend(notices);
            }
            Ok(None) => {
                tracing::debug!(tasks, "analysis cycle finished");
                return Cycle::Idle;
            }
            Err(error) if error.is_transient() => {
                tracing::trace!(error = %error, "analysis task unavailable");
                return Cycle::Blocked;
            }
            Err(error) => {
                tracing::warn!(error = %error, "analysis task failed");
                return Cycle::Idle;
            }
        }
    }
    Cycle::Cancelled
}
