//! fault-fs makes filesystem calls misbehave on demand, so tests can cover
//! the paths real disks rarely take: short reads, failing calls, files that
//! claim to be something they are not, and slow I/O.
//!
//! # Operations and the table
//!
//! Code under test reaches the filesystem through an [`OpTable`], a shared
//! table of named operations (`read`, `stat`, `open`, ...). Each name has
//! two forms: a callback form, which completes later through a callback
//! taking `(error, data)`, and a blocking form, which returns a `Result`.
//! [`StdFs`] fills a table with operations backed by `std::fs`; any other
//! operation can be registered with [`OpTable::register`].
//!
//! # Interception
//!
//! An [`Interceptor`] swaps table entries for instrumented replacements.
//! Every helper returns a [`Restore`] handle that undoes the swap when
//! restored or dropped:
//!
//! * [`Interceptor::mutate`] edits or replaces the result of each call
//! * [`Interceptor::mutate_args`] rewrites the arguments of each call
//! * [`Interceptor::pass`] makes each call succeed with a fixed value
//! * [`Interceptor::fail`] makes each call fail with a given error
//! * [`Interceptor::delay`] holds back each completion for a duration
//! * [`Interceptor::stat_mutate`], [`Interceptor::stat_fail`] and
//!   [`Interceptor::stat_type`] act on `stat`, `lstat` and `fstat` at once
//! * [`Interceptor::zeno_read`] halves the length of every read
//!
//! ```
//! use std::sync::Arc;
//! use fault_fs::{Builder, FsError, ManualScheduler, Value};
//!
//! let sched = Arc::new(ManualScheduler::new());
//! let interceptor = Builder::new().scheduler(sched.clone()).build();
//! let table = interceptor.table().clone();
//!
//! let restore = interceptor
//!     .fail("stat", FsError::invalid_input("not today"))
//!     .unwrap();
//! let err = table.call_sync("stat", vec![Value::path("/")]).unwrap_err();
//! assert_eq!(err.message(), "not today");
//!
//! restore.restore();
//! assert!(table.call_sync("stat", vec![Value::path("/")]).is_ok());
//! ```
//!
//! # Scheduling
//!
//! Callback forms never complete synchronously. Completions go through a
//! [`Scheduler`]: [`TokioScheduler`] runs them on a tokio runtime, and
//! [`ManualScheduler`] queues them against a virtual clock the test moves
//! forward, which makes [`Interceptor::delay`] deterministic.
//!
//! # Concurrency
//!
//! The table may be shared across threads, but installing and restoring
//! interceptions on one name from several threads at once is not
//! supported. Tests are expected to install, exercise, and restore in
//! sequence.
//!
//! # Tracing
//!
//! The `tracing` crate is used to emit an event whenever an interception is
//! installed or restored, and finer grained events at `TRACE` level. To see
//! them, install a
//! [`tracing-subscriber`](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/)
//! and set `RUST_LOG=fault_fs=info`.

mod builder;
pub use builder::Builder;

mod config;

mod error;
pub use error::{Error, FsError, Result};

mod intercept;
pub use intercept::{Interceptor, Reply, Restore};

pub mod scheduler;
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};

mod stat;
pub use stat::{
    FileKind, Stat, S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK,
};

mod std_fs;
pub use std_fs::StdFs;

mod table;
pub use table::{BlockingOp, Callback, CallbackOp, OpPair, OpTable};

mod value;
pub use value::{Buffer, Fd, OpenFlags, Value};

const TRACING_TARGET: &str = "fault_fs";
