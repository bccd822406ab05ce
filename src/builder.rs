use std::sync::Arc;

use crate::config::Config;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::{Interceptor, OpPair, OpTable, StdFs};

/// A builder that can be used to configure an [`Interceptor`].
///
/// ## Examples
///
/// Inside a tokio runtime the defaults give an interceptor over a table
/// populated with the `std::fs` backend, completing callbacks on that
/// runtime:
///
/// ```no_run
/// # async fn example() {
/// let interceptor = fault_fs::Builder::new().build();
/// # }
/// ```
///
/// For deterministic tests, drive completions and time yourself:
///
/// ```
/// use std::sync::Arc;
/// use fault_fs::{Builder, ManualScheduler};
///
/// let sched = Arc::new(ManualScheduler::new());
/// let interceptor = Builder::new().scheduler(sched.clone()).build();
/// assert!(interceptor.table().contains("stat"));
/// ```
///
/// A builder can be reused to create several interceptors with the same
/// settings, each over its own table.
pub struct Builder {
    config: Config,
    scheduler: Option<Arc<dyn Scheduler>>,
    ops: Vec<(String, OpPair)>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            scheduler: None,
            ops: Vec::new(),
        }
    }

    /// Scheduler for deferred completions. Defaults to a
    /// [`TokioScheduler`] on the current runtime.
    pub fn scheduler(&mut self, value: Arc<dyn Scheduler>) -> &mut Self {
        self.scheduler = Some(value);
        self
    }

    /// Whether a newly built table gets the `std::fs` backed operations.
    pub fn std_fs(&mut self, value: bool) -> &mut Self {
        self.config.std_fs = value;
        self
    }

    /// Operation names `stat_mutate`, `stat_fail` and `stat_type` act on.
    pub fn stat_ops<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.stat_ops = names.into_iter().map(Into::into).collect();
        self
    }

    /// Operation name `zeno_read` acts on.
    pub fn read_op(&mut self, name: impl Into<String>) -> &mut Self {
        self.config.read_op = name.into();
        self
    }

    /// Register an extra operation on every table this builder creates.
    pub fn op(&mut self, name: impl Into<String>, pair: OpPair) -> &mut Self {
        self.ops.push((name.into(), pair));
        self
    }

    /// Build an interceptor over a new table.
    ///
    /// # Panics
    ///
    /// Panics if no scheduler was set and this is called outside a tokio
    /// runtime.
    pub fn build(&self) -> Interceptor {
        let scheduler = self.resolve_scheduler();
        let table = Arc::new(OpTable::new());
        if self.config.std_fs {
            StdFs::install(&table, scheduler.clone());
        }
        self.finish(table, scheduler)
    }

    /// Build an interceptor over an existing, shared table. The `std_fs`
    /// setting is ignored.
    pub fn build_on(&self, table: Arc<OpTable>) -> Interceptor {
        let scheduler = self.resolve_scheduler();
        self.finish(table, scheduler)
    }

    fn resolve_scheduler(&self) -> Arc<dyn Scheduler> {
        match &self.scheduler {
            Some(scheduler) => scheduler.clone(),
            None => Arc::new(TokioScheduler::current()),
        }
    }

    fn finish(&self, table: Arc<OpTable>, scheduler: Arc<dyn Scheduler>) -> Interceptor {
        for (name, pair) in &self.ops {
            table.register(name.clone(), pair.clone());
        }
        Interceptor::with_config(table, scheduler, self.config.clone())
    }
}
