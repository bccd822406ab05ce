use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// A specialized [`Result`] type for fault-fs.
///
/// The error type defaults to a boxed error, which is generally useful for
/// fallible test cases, i.e. where you want to use the `?` operator to fail
/// the test rather than writing unwrap everywhere.
///
/// [`Result`]: std::result::Result
pub type Result<T = (), E = Box<dyn std::error::Error>> = std::result::Result<T, E>;

/// Errors raised while installing an interception.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operation name is not registered on the table.
    #[error("unknown operation: {0}")]
    UnknownOp(String),

    /// `stat_type` was given a name outside the seven recognized file types.
    #[error("invalid type: {0}")]
    InvalidType(String),
}

/// An error delivered by a filesystem operation.
///
/// Clones share the [`callstack`](FsError::callstack) slot and an identity:
/// [`FsError::ptr_eq`] tells whether a delivered error is a clone of the
/// one provided to [`Interceptor::fail`](crate::Interceptor::fail). Kind and
/// message are copied per clone, so [`FsError::set_message`] on one clone
/// does not show on the others.
#[derive(Debug, Clone)]
pub struct FsError {
    kind: io::ErrorKind,
    message: String,
    code: Option<i32>,
    syscall: Option<&'static str>,
    path: Option<PathBuf>,
    callstack: Arc<Mutex<Option<String>>>,
}

impl FsError {
    pub fn new(kind: io::ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            syscall: None,
            path: None,
            callstack: Arc::default(),
        }
    }

    /// An `InvalidInput` error, the equivalent of `EINVAL`.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(io::ErrorKind::InvalidInput, message)
    }

    pub fn with_syscall(mut self, syscall: &'static str) -> Self {
        self.syscall = Some(syscall);
        self
    }

    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// The raw OS error code, when the error came from the host.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn syscall(&self) -> Option<&'static str> {
        self.syscall
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The stack trace captured by the most recent forced failure that
    /// delivered this error, if any.
    pub fn callstack(&self) -> Option<String> {
        self.callstack
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_callstack(&self, trace: String) {
        *self
            .callstack
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(trace);
    }

    /// Returns true if `self` and `other` are clones of the same error.
    pub fn ptr_eq(&self, other: &FsError) -> bool {
        Arc::ptr_eq(&self.callstack, &other.callstack)
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(syscall) = self.syscall {
            write!(f, ", {syscall}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " '{}'", path.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for FsError {}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        let mut fs_err = FsError::new(err.kind(), err.to_string());
        fs_err.code = err.raw_os_error();
        fs_err
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        match err.code {
            Some(code) => io::Error::from_raw_os_error(code),
            None => io::Error::new(err.kind, err),
        }
    }
}

impl From<Error> for FsError {
    fn from(err: Error) -> Self {
        FsError::new(io::ErrorKind::Unsupported, err.to_string())
    }
}
