//! The table of named filesystem operations.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::scheduler::Scheduler;
use crate::{Error, FsError, Value, TRACING_TARGET};

/// Completion callback of a callback-form operation: `(error, data)`.
pub type Callback = Box<dyn FnOnce(Option<FsError>, Option<Value>) + Send>;

/// The callback form of an operation. The callback is passed separately
/// from the ordered argument list.
pub type CallbackOp = Arc<dyn Fn(Vec<Value>, Callback) + Send + Sync>;

/// The blocking form of an operation.
pub type BlockingOp = Arc<dyn Fn(Vec<Value>) -> Result<Value, FsError> + Send + Sync>;

/// Both forms of one operation, sharing a name.
#[derive(Clone)]
pub struct OpPair {
    pub callback: CallbackOp,
    pub blocking: BlockingOp,
}

impl OpPair {
    pub fn new<C, B>(callback: C, blocking: B) -> Self
    where
        C: Fn(Vec<Value>, Callback) + Send + Sync + 'static,
        B: Fn(Vec<Value>) -> Result<Value, FsError> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            blocking: Arc::new(blocking),
        }
    }

    /// Derive the callback form from a blocking body: the body runs on a
    /// deferred task and its result is handed to the callback.
    pub fn from_blocking<B>(scheduler: Arc<dyn Scheduler>, blocking: B) -> Self
    where
        B: Fn(Vec<Value>) -> Result<Value, FsError> + Send + Sync + 'static,
    {
        let blocking: BlockingOp = Arc::new(blocking);
        let body = blocking.clone();
        let callback: CallbackOp = Arc::new(move |args: Vec<Value>, cb: Callback| {
            let body = body.clone();
            scheduler.defer(Box::new(move || match body(args) {
                Ok(data) => cb(None, Some(data)),
                Err(err) => cb(Some(err), None),
            }));
        });
        Self { callback, blocking }
    }
}

/// A shared table mapping operation names to their implementations.
///
/// The lock is only held while looking up or swapping an entry, never for
/// the duration of a call, so operations may call back into the table.
#[derive(Default)]
pub struct OpTable {
    ops: RwLock<IndexMap<String, OpPair>>,
}

impl OpTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, OpPair>> {
        self.ops.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, OpPair>> {
        self.ops.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register both forms of `name`, returning what was there before.
    pub fn register(&self, name: impl Into<String>, pair: OpPair) -> Option<OpPair> {
        let name = name.into();
        tracing::trace!(target: TRACING_TARGET, op = %name, "register");
        self.write().insert(name, pair)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<OpPair, Error> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownOp(name.to_string()))
    }

    /// Swap in `pair` for an already registered `name`, returning the
    /// implementation it replaced.
    pub(crate) fn replace(&self, name: &str, pair: OpPair) -> Result<OpPair, Error> {
        let mut ops = self.write();
        let slot = ops
            .get_mut(name)
            .ok_or_else(|| Error::UnknownOp(name.to_string()))?;
        Ok(std::mem::replace(slot, pair))
    }

    /// Invoke the callback form of `name`.
    ///
    /// Fails immediately, without calling `cb`, if `name` is unknown.
    pub fn call<F>(&self, name: &str, args: Vec<Value>, cb: F) -> Result<(), Error>
    where
        F: FnOnce(Option<FsError>, Option<Value>) + Send + 'static,
    {
        let op = self.get(name)?.callback;
        op(args, Box::new(cb));
        Ok(())
    }

    /// Invoke the blocking form of `name`.
    pub fn call_sync(&self, name: &str, args: Vec<Value>) -> Result<Value, FsError> {
        let op = self.get(name)?.blocking;
        op(args)
    }

    /// Invoke the callback form of `name` and wait for its completion.
    pub async fn call_async(&self, name: &str, args: Vec<Value>) -> Result<Value, FsError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.call(name, args, move |err, data| {
            let _ = tx.send((err, data));
        })?;

        match rx.await {
            Ok((Some(err), _)) => Err(err),
            Ok((None, data)) => Ok(data.unwrap_or_default()),
            Err(_) => Err(FsError::new(
                std::io::ErrorKind::Interrupted,
                format!("{name}: completion dropped"),
            )),
        }
    }
}
