//! Dynamically typed arguments and results passed through the op table.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{FsError, Stat};

/// A file descriptor handed out by an `open` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fd(pub u32);

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A byte buffer shared between the caller and a pending read.
///
/// Reads complete asynchronously in the callback form, so the destination
/// buffer is reference counted; every clone points at the same bytes.
#[derive(Clone, Default)]
pub struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    /// A zero filled buffer of `len` bytes.
    pub fn alloc(len: usize) -> Self {
        Buffer::from(vec![0; len])
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.lock().clone()
    }

    pub fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Buffer(Arc::new(Mutex::new(bytes)))
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Buffer").field(&self.len()).finish()
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.lock() == *other.lock()
    }
}

/// How a file is opened, parsed from the usual `r`, `r+`, `w`, `w+`, `a`
/// and `a+` flag strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    pub truncate: bool,
}

impl OpenFlags {
    pub fn read_only() -> Self {
        OpenFlags {
            read: true,
            ..OpenFlags::default()
        }
    }

    pub fn to_options(self) -> std::fs::OpenOptions {
        let mut options = std::fs::OpenOptions::new();
        options
            .read(self.read)
            .write(self.write)
            .append(self.append)
            .create(self.create)
            .truncate(self.truncate);
        options
    }
}

impl FromStr for OpenFlags {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flags = match s {
            "r" => OpenFlags::read_only(),
            "r+" => OpenFlags {
                read: true,
                write: true,
                ..OpenFlags::default()
            },
            "w" | "w+" => OpenFlags {
                read: s == "w+",
                write: true,
                create: true,
                truncate: true,
                ..OpenFlags::default()
            },
            "a" | "a+" => OpenFlags {
                read: s == "a+",
                append: true,
                create: true,
                ..OpenFlags::default()
            },
            other => {
                return Err(FsError::invalid_input(format!(
                    "invalid open flags: {other}"
                )))
            }
        };
        Ok(flags)
    }
}

/// An argument to, or a result of, an operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// No meaningful value.
    #[default]
    Unit,
    /// A count, length, or offset.
    Int(u64),
    Fd(Fd),
    /// A file position; `None` reads from the current position.
    Position(Option<u64>),
    Bytes(Vec<u8>),
    Buffer(Buffer),
    Path(PathBuf),
    Text(String),
    Flags(OpenFlags),
    Stat(Stat),
}

impl Value {
    pub fn path(path: impl AsRef<Path>) -> Self {
        Value::Path(path.as_ref().to_path_buf())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_fd(&self) -> Option<Fd> {
        match self {
            Value::Fd(fd) => Some(*fd),
            _ => None,
        }
    }

    pub fn as_position(&self) -> Option<Option<u64>> {
        match self {
            Value::Position(pos) => Some(*pos),
            Value::Int(n) => Some(Some(*n)),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            Value::Text(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            Value::Buffer(buf) => Some(buf),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(path) => Some(path),
            Value::Text(text) => Some(Path::new(text)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<OpenFlags> {
        match self {
            Value::Flags(flags) => Some(*flags),
            Value::Text(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn as_stat(&self) -> Option<&Stat> {
        match self {
            Value::Stat(stat) => Some(stat),
            _ => None,
        }
    }

    pub fn as_stat_mut(&mut self) -> Option<&mut Stat> {
        match self {
            Value::Stat(stat) => Some(stat),
            _ => None,
        }
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Int(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as u64)
    }
}

impl From<Fd> for Value {
    fn from(fd: Fd) -> Self {
        Value::Fd(fd)
    }
}

impl From<Buffer> for Value {
    fn from(buf: Buffer) -> Self {
        Value::Buffer(buf)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<PathBuf> for Value {
    fn from(path: PathBuf) -> Self {
        Value::Path(path)
    }
}

impl From<&Path> for Value {
    fn from(path: &Path) -> Self {
        Value::Path(path.to_path_buf())
    }
}

impl From<OpenFlags> for Value {
    fn from(flags: OpenFlags) -> Self {
        Value::Flags(flags)
    }
}

impl From<Stat> for Value {
    fn from(stat: Stat) -> Self {
        Value::Stat(stat)
    }
}
