//! Interception of named operations.
//!
//! Every helper swaps both forms of one or more operations on the
//! [`OpTable`] and returns a [`Restore`] that puts back whatever was
//! installed immediately before. Replacements capture their policy when
//! they are installed, so completions already in flight keep the policy
//! after a restore; calls issued after a restore reach the prior
//! implementation.
//!
//! Interceptions can be layered on one name, but each [`Restore`] only
//! reinstates the layer it replaced. Restoring out of order can strand a
//! deeper layer.

mod read;
mod stat;

use std::backtrace::Backtrace;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::scheduler::Scheduler;
use crate::table::{Callback, OpPair, OpTable};
use crate::{Error, FsError, Value, TRACING_TARGET};

/// A replacement `(error, data)` pair returned by a result mutation.
pub type Reply = (Option<FsError>, Option<Value>);

/// Undoes an interception.
///
/// Call [`Restore::restore`] to put the previous implementations back.
/// Dropping a `Restore` that has not been restored does the same, so the
/// handle must be bound for as long as the interception should last:
/// `let _restore = ...` keeps it, `let _ = ...` undoes it on the spot.
#[must_use = "dropping a Restore undoes the interception"]
pub struct Restore {
    table: Arc<OpTable>,
    saved: Vec<(String, OpPair)>,
}

impl Restore {
    fn new(table: Arc<OpTable>, name: &str, original: OpPair) -> Self {
        Self {
            table,
            saved: vec![(name.to_string(), original)],
        }
    }

    /// Names this handle restores, in installation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.saved.iter().map(|(name, _)| name.as_str())
    }

    /// Combine two handles into one that restores both.
    pub fn join(mut self, mut other: Restore) -> Restore {
        self.saved.append(&mut other.saved);
        self
    }

    /// Reinstate the implementations captured at interception time.
    pub fn restore(mut self) {
        self.undo();
    }

    fn undo(&mut self) {
        for (name, original) in self.saved.drain(..).rev() {
            tracing::info!(target: TRACING_TARGET, op = %name, "Restore");
            self.table.register(name, original);
        }
    }
}

impl Drop for Restore {
    fn drop(&mut self) {
        self.undo();
    }
}

/// Installs interceptions on an [`OpTable`].
///
/// ```
/// use std::sync::Arc;
/// use fault_fs::{Builder, ManualScheduler, OpPair, Value};
///
/// let sched = Arc::new(ManualScheduler::new());
/// let interceptor = Builder::new().scheduler(sched.clone()).std_fs(false).build();
/// interceptor
///     .table()
///     .register("answer", OpPair::from_blocking(sched, |_| Ok(Value::Int(41))));
///
/// let restore = interceptor.pass("answer", 42u64).unwrap();
/// assert_eq!(interceptor.table().call_sync("answer", vec![]).unwrap(), Value::Int(42));
///
/// restore.restore();
/// assert_eq!(interceptor.table().call_sync("answer", vec![]).unwrap(), Value::Int(41));
/// ```
#[derive(Clone)]
pub struct Interceptor {
    table: Arc<OpTable>,
    scheduler: Arc<dyn Scheduler>,
    config: Config,
}

impl Interceptor {
    pub fn new(table: Arc<OpTable>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::with_config(table, scheduler, Config::default())
    }

    pub(crate) fn with_config(
        table: Arc<OpTable>,
        scheduler: Arc<dyn Scheduler>,
        config: Config,
    ) -> Self {
        Self {
            table,
            scheduler,
            config,
        }
    }

    pub fn table(&self) -> &Arc<OpTable> {
        &self.table
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// Swap `name` for the pair built by `make` from the current one.
    fn install(
        &self,
        name: &str,
        policy: &'static str,
        make: impl FnOnce(OpPair) -> OpPair,
    ) -> Result<Restore, Error> {
        let current = self.table.get(name)?;
        let original = self.table.replace(name, make(current))?;
        tracing::info!(target: TRACING_TARGET, op = %name, policy, "Intercept");
        Ok(Restore::new(self.table.clone(), name, original))
    }

    /// Apply `f` to the `(error, data)` result of every call to `name`.
    ///
    /// `f` may edit the values in place and return `None`, or return a
    /// replacement pair. A replacement may turn a success into a failure
    /// or the other way around. In the blocking form a resulting error is
    /// returned as `Err`, otherwise the data is returned (`Value::Unit` if
    /// there is none).
    pub fn mutate<F>(&self, name: &str, f: F) -> Result<Restore, Error>
    where
        F: Fn(Option<&mut FsError>, Option<&mut Value>) -> Option<Reply> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.install(name, "mutate", move |orig| {
            let callback_f = f.clone();
            let callback = move |args: Vec<Value>, cb: Callback| {
                let f = callback_f.clone();
                (orig.callback)(
                    args,
                    Box::new(move |err: Option<FsError>, data: Option<Value>| {
                        let (err, data) = apply(&*f, err, data);
                        cb(err, data)
                    }),
                )
            };
            let blocking = move |args: Vec<Value>| {
                let (err, data) = match (orig.blocking)(args) {
                    Ok(data) => (None, Some(data)),
                    Err(err) => (Some(err), None),
                };
                match apply(&*f, err, data) {
                    (Some(err), _) => Err(err),
                    (None, data) => Ok(data.unwrap_or_default()),
                }
            };
            OpPair::new(callback, blocking)
        })
    }

    /// Rewrite the ordered argument list of every call to `name` with `f`
    /// before it reaches the current implementation. Results pass through
    /// untouched.
    pub fn mutate_args<F>(&self, name: &str, f: F) -> Result<Restore, Error>
    where
        F: Fn(Vec<Value>) -> Vec<Value> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.install(name, "mutate_args", move |orig| {
            let callback_f = f.clone();
            let callback =
                move |args: Vec<Value>, cb: Callback| (orig.callback)(callback_f(args), cb);
            let blocking = move |args: Vec<Value>| (orig.blocking)(f(args));
            OpPair::new(callback, blocking)
        })
    }

    /// Make every call to `name` succeed with `data`, whatever the
    /// arguments.
    pub fn pass(&self, name: &str, data: impl Into<Value>) -> Result<Restore, Error> {
        let data = data.into();
        let scheduler = self.scheduler.clone();
        self.install(name, "pass", move |_| {
            let callback_data = data.clone();
            let callback = move |_args: Vec<Value>, cb: Callback| {
                let data = callback_data.clone();
                scheduler.defer(Box::new(move || cb(None, Some(data))));
            };
            let blocking = move |_args: Vec<Value>| -> Result<Value, FsError> { Ok(data.clone()) };
            OpPair::new(callback, blocking)
        })
    }

    /// Make every call to `name` fail with `error`.
    ///
    /// Each failing call records the stack it was issued from in
    /// [`FsError::callstack`]. Clones of one error share that slot, so when
    /// the same error is delivered more than once only the latest trace is
    /// visible.
    pub fn fail(&self, name: &str, error: FsError) -> Result<Restore, Error> {
        let scheduler = self.scheduler.clone();
        self.install(name, "fail", move |_| {
            let callback_error = error.clone();
            let callback = move |_args: Vec<Value>, cb: Callback| {
                let err = callback_error.clone();
                err.set_callstack(callstack());
                scheduler.defer(Box::new(move || cb(Some(err), None)));
            };
            let blocking = move |_args: Vec<Value>| -> Result<Value, FsError> {
                error.set_callstack(callstack());
                Err(error.clone())
            };
            OpPair::new(callback, blocking)
        })
    }

    /// Hold back the completion of every call to `name` until at least
    /// `duration` after the call was issued. The result is unchanged.
    pub fn delay(&self, name: &str, duration: Duration) -> Result<Restore, Error> {
        let scheduler = self.scheduler.clone();
        self.install(name, "delay", move |orig| {
            let callback_sched = scheduler.clone();
            let callback = move |args: Vec<Value>, cb: Callback| {
                let sched = callback_sched.clone();
                let deadline = sched.now().saturating_add(duration);
                (orig.callback)(
                    args,
                    Box::new(move |err: Option<FsError>, data: Option<Value>| {
                        sched.defer_until(deadline, Box::new(move || cb(err, data)))
                    }),
                )
            };
            let blocking = move |args: Vec<Value>| {
                let deadline = scheduler.now().saturating_add(duration);
                let result = (orig.blocking)(args);
                scheduler.sleep_until(deadline);
                result
            };
            OpPair::new(callback, blocking)
        })
    }
}

/// Run a result mutation, keeping the original values when it returns
/// `None`.
fn apply<F>(f: &F, mut err: Option<FsError>, mut data: Option<Value>) -> Reply
where
    F: Fn(Option<&mut FsError>, Option<&mut Value>) -> Option<Reply> + ?Sized,
{
    match f(err.as_mut(), data.as_mut()) {
        Some(reply) => reply,
        None => (err, data),
    }
}

fn callstack() -> String {
    let trace = format!("Error: trace\n{}", Backtrace::force_capture());
    tracing::trace!(target: TRACING_TARGET, "captured forced failure callstack");
    trace
}
