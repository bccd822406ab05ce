use std::sync::Arc;

use super::{Interceptor, Reply, Restore};
use crate::{Error, FileKind, FsError, Value};

impl Interceptor {
    /// Run `op` against each stat-like operation name and join the handles.
    ///
    /// If one of the names is unknown, handles already taken are dropped,
    /// which restores them.
    fn each_stat_op(
        &self,
        mut op: impl FnMut(&str) -> Result<Restore, Error>,
    ) -> Result<Restore, Error> {
        let mut names = self.config.stat_ops.iter();
        let first = names
            .next()
            .ok_or_else(|| Error::UnknownOp("stat".to_string()))?;
        let mut restore = op(first)?;
        for name in names {
            restore = restore.join(op(name)?);
        }
        Ok(restore)
    }

    /// [`Interceptor::mutate`] applied to `stat`, `lstat` and `fstat` at
    /// once.
    pub fn stat_mutate<F>(&self, f: F) -> Result<Restore, Error>
    where
        F: Fn(Option<&mut FsError>, Option<&mut Value>) -> Option<Reply> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.each_stat_op(|name| {
            let f = f.clone();
            self.mutate(name, move |err, data| f(err, data))
        })
    }

    /// [`Interceptor::fail`] applied to `stat`, `lstat` and `fstat` with
    /// the same error.
    pub fn stat_fail(&self, error: FsError) -> Result<Restore, Error> {
        self.each_stat_op(|name| self.fail(name, error.clone()))
    }

    /// Make successful stat calls report `kind`.
    ///
    /// `kind` must be one of `File`, `Directory`, `CharacterDevice`,
    /// `BlockDevice`, `FIFO`, `SymbolicLink` or `Socket`; anything else
    /// fails with [`Error::InvalidType`] before any interception is made.
    pub fn stat_type(&self, kind: &str) -> Result<Restore, Error> {
        let kind: FileKind = kind.parse()?;
        self.stat_kind(kind)
    }

    /// Typed form of [`Interceptor::stat_type`].
    ///
    /// Only the type bits of `mode` are replaced; permission bits are kept.
    /// Failed calls are left alone.
    pub fn stat_kind(&self, kind: FileKind) -> Result<Restore, Error> {
        self.stat_mutate(move |err, data| {
            if err.is_none() {
                if let Some(stat) = data.and_then(Value::as_stat_mut) {
                    stat.set_kind(kind);
                }
            }
            None
        })
    }
}
