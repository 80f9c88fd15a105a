use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use exam_core::Countdown;
use exam_core::model::SessionId;

use super::service::{ExamSession, Outcome, Rejection};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// A session shared between the UI and its countdown task.
pub type SharedSession = Arc<Mutex<ExamSession>>;

/// Why a timer task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerExit {
    /// The attempt completed, or was replaced by a restart.
    SessionEnded,
    /// Stopped through its handle while the attempt was still running.
    Cancelled,
    /// The session has no time limit, so there is nothing to count down.
    NoTimeLimit,
    /// The session lock was poisoned by a panicking holder.
    Poisoned,
    /// The task itself panicked.
    Panicked,
}

/// Drives the countdown of a running session.
///
/// Wakeups are measured against the monotonic clock and fed through a
/// [`Countdown`], so a late or coalesced wakeup applies every second that
/// actually passed.
pub struct ExamTimer;

impl ExamTimer {
    /// Spawns the countdown task for `session`, which should already be
    /// started.
    ///
    /// The task stops when the attempt completes for any reason, when the
    /// returned handle is cancelled, or when the handle is dropped. Must be
    /// called from within a tokio runtime.
    #[must_use]
    pub fn spawn(session: &SharedSession) -> TimerHandle {
        let token = CancellationToken::new();
        let id = {
            let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
            guard.attach_timer(token.clone());
            guard.id()
        };

        let start = Instant::now();
        let task = tokio::spawn(run(Arc::clone(session), id, token.clone(), start));
        debug!(session = %id, "exam timer spawned");

        TimerHandle {
            token,
            task: Some(task),
        }
    }
}

async fn run(
    session: SharedSession,
    id: SessionId,
    token: CancellationToken,
    start: Instant,
) -> TimerExit {
    let mut interval = time::interval_at(start + TICK_PERIOD, TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut countdown = Countdown::new();
    let mut last = start;

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                let exit = exit_on_cancel(&session, id);
                debug!(session = %id, ?exit, "exam timer stopped");
                return exit;
            }
            _ = interval.tick() => {
                let now = Instant::now();
                let due = countdown.advance(now.saturating_duration_since(last));
                last = now;
                if let Some(exit) = apply_ticks(&session, id, due) {
                    debug!(session = %id, ?exit, "exam timer finished");
                    return exit;
                }
            }
        }
    }
}

fn exit_on_cancel(session: &SharedSession, id: SessionId) -> TimerExit {
    match session.lock() {
        Ok(guard) if guard.is_in_progress() && guard.id() == id => TimerExit::Cancelled,
        Ok(_) => TimerExit::SessionEnded,
        Err(_) => TimerExit::Poisoned,
    }
}

fn apply_ticks(session: &SharedSession, id: SessionId, due: u64) -> Option<TimerExit> {
    let Ok(mut guard) = session.lock() else {
        error!(session = %id, "exam session lock poisoned, stopping timer");
        return Some(TimerExit::Poisoned);
    };
    if guard.id() != id {
        return Some(TimerExit::SessionEnded);
    }
    if due > 1 {
        debug!(session = %id, due, "catching up missed ticks");
    }
    for _ in 0..due {
        match guard.tick() {
            Outcome::Applied => {}
            Outcome::Completed(_) | Outcome::Ignored(Rejection::NotInProgress) => {
                return Some(TimerExit::SessionEnded);
            }
            Outcome::Ignored(Rejection::NoTimeLimit) => return Some(TimerExit::NoTimeLimit),
            Outcome::Ignored(_) => {}
        }
    }
    None
}

/// Owner of a running countdown task. Dropping it stops the task.
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<TimerExit>>,
}

impl TimerHandle {
    /// Ask the task to stop; it exits at its next wakeup.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the task to stop on its own or after [`Self::cancel`].
    pub async fn join(mut self) -> TimerExit {
        let Some(task) = self.task.take() else {
            return TimerExit::Cancelled;
        };
        match task.await {
            Ok(exit) => exit,
            Err(err) => {
                error!(error = %err, "exam timer task failed");
                TimerExit::Panicked
            }
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
