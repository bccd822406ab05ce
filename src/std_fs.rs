//! Operations backed by the host filesystem through `std::fs`.
//!
//! Argument lists, by operation:
//!
//! | name         | arguments                                 | result          |
//! |--------------|-------------------------------------------|-----------------|
//! | `open`       | path, flags                               | `Fd`            |
//! | `close`      | fd                                        | `Unit`          |
//! | `read`       | fd, buffer, offset, length, position      | `Int` (read)    |
//! | `write`      | fd, bytes, position (optional)            | `Int` (written) |
//! | `stat`       | path                                      | `Stat`          |
//! | `lstat`      | path                                      | `Stat`          |
//! | `fstat`      | fd                                        | `Stat`          |
//! | `readlink`   | path                                      | `Path`          |
//! | `read_file`  | path                                      | `Bytes`         |
//! | `write_file` | path, bytes                               | `Unit`          |
//! | `unlink`     | path                                      | `Unit`          |
//!
//! Flags may be given as [`OpenFlags`] or as a flag string such as `"r"`.
//! A position of `Position(None)` reads or writes at the current file
//! position, anything else uses positioned I/O.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;

use crate::scheduler::Scheduler;
use crate::{Buffer, Fd, FsError, OpPair, OpTable, OpenFlags, Stat, Value};

/// `EBADF` on Linux and macOS.
const EBADF: i32 = 9;

/// Descriptors below this are left to stdio.
const FIRST_FD: u32 = 3;

/// Open files, keyed by the descriptors handed out by `open`.
pub struct StdFs {
    files: Mutex<IndexMap<Fd, Arc<File>>>,
    next_fd: AtomicU32,
}

impl Default for StdFs {
    fn default() -> Self {
        Self {
            files: Mutex::default(),
            next_fd: AtomicU32::new(FIRST_FD),
        }
    }
}

impl StdFs {
    /// Register every `std::fs` operation on `table`. Callback forms run
    /// on `scheduler`.
    pub fn install(table: &OpTable, scheduler: Arc<dyn Scheduler>) -> Arc<StdFs> {
        let fs = Arc::new(StdFs::default());

        let ops: [(&str, fn(&StdFs, &[Value]) -> Result<Value, FsError>); 11] = [
            ("open", StdFs::open),
            ("close", StdFs::close),
            ("read", StdFs::read),
            ("write", StdFs::write),
            ("stat", StdFs::stat),
            ("lstat", StdFs::lstat),
            ("fstat", StdFs::fstat),
            ("readlink", StdFs::readlink),
            ("read_file", StdFs::read_file),
            ("write_file", StdFs::write_file),
            ("unlink", StdFs::unlink),
        ];

        for (name, op) in ops {
            let fs = fs.clone();
            table.register(
                name,
                OpPair::from_blocking(scheduler.clone(), move |args| op(&fs, &args)),
            );
        }

        fs
    }

    /// Number of descriptors currently open.
    pub fn open_files(&self) -> usize {
        self.files().len()
    }

    fn files(&self) -> std::sync::MutexGuard<'_, IndexMap<Fd, Arc<File>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn file(&self, fd: Fd, syscall: &'static str) -> Result<Arc<File>, FsError> {
        self.files().get(&fd).cloned().ok_or_else(|| {
            FsError::from(io::Error::from_raw_os_error(EBADF)).with_syscall(syscall)
        })
    }

    fn open(&self, args: &[Value]) -> Result<Value, FsError> {
        let path = arg(args, 0, "open", Value::as_path)?;
        let flags = args
            .get(1)
            .map(|flags| {
                flags
                    .as_flags()
                    .ok_or_else(|| bad_arg("open", 1))
            })
            .transpose()?
            .unwrap_or_else(OpenFlags::read_only);

        let file = flags
            .to_options()
            .open(path)
            .map_err(|e| io_err(e, "open", Some(path)))?;
        let fd = Fd(self.next_fd.fetch_add(1, Ordering::Relaxed));
        self.files().insert(fd, Arc::new(file));
        Ok(Value::Fd(fd))
    }

    fn close(&self, args: &[Value]) -> Result<Value, FsError> {
        let fd = arg(args, 0, "close", Value::as_fd)?;
        match self.files().shift_remove(&fd) {
            Some(_) => Ok(Value::Unit),
            None => Err(FsError::from(io::Error::from_raw_os_error(EBADF)).with_syscall("close")),
        }
    }

    fn read(&self, args: &[Value]) -> Result<Value, FsError> {
        let fd = arg(args, 0, "read", Value::as_fd)?;
        let buffer: &Buffer = arg(args, 1, "read", Value::as_buffer)?;
        let offset = arg(args, 2, "read", Value::as_int)? as usize;
        let length = arg(args, 3, "read", Value::as_int)? as usize;
        let position = match args.get(4) {
            Some(pos) => pos.as_position().ok_or_else(|| bad_arg("read", 4))?,
            None => None,
        };

        let file = self.file(fd, "read")?;
        let mut bytes = buffer.lock();
        let end = offset
            .checked_add(length)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| {
                FsError::invalid_input(format!(
                    "read of {length} bytes at offset {offset} overflows a {} byte buffer",
                    bytes.len()
                ))
                .with_syscall("read")
            })?;

        let dst = &mut bytes[offset..end];
        let n = match position {
            Some(pos) => file.read_at(dst, pos),
            None => (&*file).read(dst),
        }
        .map_err(|e| io_err(e, "read", None))?;
        Ok(Value::from(n))
    }

    fn write(&self, args: &[Value]) -> Result<Value, FsError> {
        let fd = arg(args, 0, "write", Value::as_fd)?;
        let data = arg(args, 1, "write", Value::as_bytes)?;
        let position = match args.get(2) {
            Some(pos) => pos.as_position().ok_or_else(|| bad_arg("write", 2))?,
            None => None,
        };

        let file = self.file(fd, "write")?;
        let n = match position {
            Some(pos) => file.write_at(data, pos),
            None => (&*file).write(data),
        }
        .map_err(|e| io_err(e, "write", None))?;
        Ok(Value::from(n))
    }

    fn stat(&self, args: &[Value]) -> Result<Value, FsError> {
        let path = arg(args, 0, "stat", Value::as_path)?;
        let meta = std::fs::metadata(path).map_err(|e| io_err(e, "stat", Some(path)))?;
        Ok(Value::Stat(Stat::from(&meta)))
    }

    fn lstat(&self, args: &[Value]) -> Result<Value, FsError> {
        let path = arg(args, 0, "lstat", Value::as_path)?;
        let meta = std::fs::symlink_metadata(path).map_err(|e| io_err(e, "lstat", Some(path)))?;
        Ok(Value::Stat(Stat::from(&meta)))
    }

    fn fstat(&self, args: &[Value]) -> Result<Value, FsError> {
        let fd = arg(args, 0, "fstat", Value::as_fd)?;
        let meta = self
            .file(fd, "fstat")?
            .metadata()
            .map_err(|e| io_err(e, "fstat", None))?;
        Ok(Value::Stat(Stat::from(&meta)))
    }

    fn readlink(&self, args: &[Value]) -> Result<Value, FsError> {
        let path = arg(args, 0, "readlink", Value::as_path)?;
        let target = std::fs::read_link(path).map_err(|e| io_err(e, "readlink", Some(path)))?;
        Ok(Value::Path(target))
    }

    fn read_file(&self, args: &[Value]) -> Result<Value, FsError> {
        let path = arg(args, 0, "read_file", Value::as_path)?;
        let bytes = std::fs::read(path).map_err(|e| io_err(e, "open", Some(path)))?;
        Ok(Value::Bytes(bytes))
    }

    fn write_file(&self, args: &[Value]) -> Result<Value, FsError> {
        let path = arg(args, 0, "write_file", Value::as_path)?;
        let data = arg(args, 1, "write_file", Value::as_bytes)?;
        std::fs::write(path, data).map_err(|e| io_err(e, "open", Some(path)))?;
        Ok(Value::Unit)
    }

    fn unlink(&self, args: &[Value]) -> Result<Value, FsError> {
        let path = arg(args, 0, "unlink", Value::as_path)?;
        std::fs::remove_file(path).map_err(|e| io_err(e, "unlink", Some(path)))?;
        Ok(Value::Unit)
    }
}

fn arg<'a, T>(
    args: &'a [Value],
    idx: usize,
    syscall: &'static str,
    get: impl FnOnce(&'a Value) -> Option<T>,
) -> Result<T, FsError> {
    args.get(idx).and_then(get).ok_or_else(|| bad_arg(syscall, idx))
}

fn bad_arg(syscall: &'static str, idx: usize) -> FsError {
    FsError::invalid_input(format!("invalid argument {idx}")).with_syscall(syscall)
}

fn io_err(err: io::Error, syscall: &'static str, path: Option<&Path>) -> FsError {
    let err = FsError::from(err).with_syscall(syscall);
    match path {
        Some(path) => err.with_path(path),
        None => err,
    }
}
