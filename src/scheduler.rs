//! Deferred completion of callback-form operations.
//!
//! Callback forms never complete synchronously: completions are handed to
//! a [`Scheduler`], either on the next tick ([`Scheduler::defer`]) or once
//! a deadline has passed ([`Scheduler::defer_until`]). Time is measured as
//! a [`Duration`] since the scheduler was created.
//!
//! [`TokioScheduler`] runs completions on a tokio runtime. Under a paused
//! clock (`tokio::time::pause`) timed completions resolve without slowing
//! tests down. [`ManualScheduler`] keeps a virtual clock and a task queue
//! that only move when the test says so.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::TRACING_TARGET;

/// Stand-in deadline for durations tokio's clock cannot represent.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send>;

/// Runs deferred completions.
pub trait Scheduler: Send + Sync {
    /// Time elapsed since the scheduler was created.
    fn now(&self) -> Duration;

    /// Run `task` on a later scheduling tick.
    fn defer(&self, task: Task);

    /// Run `task` once `now()` has reached `deadline`, and never on the
    /// current tick.
    fn defer_until(&self, deadline: Duration, task: Task);

    /// Block the calling thread until `deadline`.
    ///
    /// A virtual clock is moved to `deadline`. A real clock blocks for at
    /// least the remaining wall-clock time, whether or not `now()` follows.
    fn sleep_until(&self, deadline: Duration);
}

/// A scheduler backed by a tokio runtime.
///
/// Deferred tasks run on the runtime's blocking pool, since completions
/// commonly issue further blocking filesystem calls.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    start: Instant,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            start: Instant::now(),
        }
    }

    /// A scheduler on the runtime the caller is running in.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Like [`TokioScheduler::current`], but returns `None` outside a
    /// runtime.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn defer(&self, task: Task) {
        drop(self.handle.spawn_blocking(task));
    }

    fn defer_until(&self, deadline: Duration, task: Task) {
        let at = self
            .start
            .checked_add(deadline)
            .unwrap_or_else(|| Instant::now() + FAR_FUTURE);
        drop(self.handle.spawn(async move {
            tokio::time::sleep_until(at).await;
            drop(tokio::task::spawn_blocking(task));
        }));
    }

    /// Sleeps the thread with `std::thread::sleep`. On a paused runtime
    /// tokio's clock stays put, so `now()` lags behind the wall-clock time
    /// that has passed.
    fn sleep_until(&self, deadline: Duration) {
        let remaining = deadline.saturating_sub(self.now());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }
}

/// A deterministic scheduler driven by the test.
///
/// Nothing runs until [`ManualScheduler::run_until_idle`],
/// [`ManualScheduler::advance`] or [`ManualScheduler::run_all`] is called.
/// Tasks run in deadline order, ties broken by submission order, and the
/// virtual clock is moved to each task's deadline before it runs.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), Task>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, deadline: Duration, task: Task) {
        let mut state = self.state();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.insert((deadline, seq), task);
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.state().queue.len()
    }

    /// Run every task due at or before `limit`, including tasks those
    /// tasks schedule. Returns the number of tasks run.
    fn run_through(&self, limit: Duration) -> usize {
        let mut ran = 0;
        loop {
            let task = {
                let mut state = self.state();
                let due = state
                    .queue
                    .first_key_value()
                    .map(|(&(deadline, _), _)| deadline)
                    .filter(|deadline| *deadline <= limit);
                due.and_then(|deadline| {
                    state.now = state.now.max(deadline);
                    state.queue.pop_first().map(|(_, task)| task)
                })
            };

            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Run every task that is due without moving the clock.
    pub fn run_until_idle(&self) -> usize {
        let now = self.now();
        let ran = self.run_through(now);
        tracing::trace!(target: TRACING_TARGET, ran, ?now, "run until idle");
        ran
    }

    /// Move the clock forward by `by`, running tasks as their deadlines
    /// pass.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        let ran = self.run_through(target);
        let mut state = self.state();
        state.now = state.now.max(target);
        ran
    }

    /// Run every task, moving the clock as far as the last deadline.
    pub fn run_all(&self) -> usize {
        self.run_through(Duration::MAX)
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.state().now
    }

    fn defer(&self, task: Task) {
        let now = self.now();
        self.push(now, task);
    }

    fn defer_until(&self, deadline: Duration, task: Task) {
        self.push(deadline, task);
    }

    fn sleep_until(&self, deadline: Duration) {
        let mut state = self.state();
        state.now = state.now.max(deadline);
    }
}
