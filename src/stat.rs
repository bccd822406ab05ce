//! File status records and file type bits.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::Error;

/// Bit mask for the file type bit field of a mode.
pub const S_IFMT: u32 = 0o170000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFIFO: u32 = 0o010000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFSOCK: u32 = 0o140000;

/// The seven file types a status record can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Directory,
    CharacterDevice,
    BlockDevice,
    Fifo,
    SymbolicLink,
    Socket,
}

impl FileKind {
    pub const ALL: [FileKind; 7] = [
        FileKind::File,
        FileKind::Directory,
        FileKind::CharacterDevice,
        FileKind::BlockDevice,
        FileKind::Fifo,
        FileKind::SymbolicLink,
        FileKind::Socket,
    ];

    /// The type bits for this kind in the unix mode encoding.
    pub fn bits(self) -> u32 {
        match self {
            FileKind::File => S_IFREG,
            FileKind::Directory => S_IFDIR,
            FileKind::CharacterDevice => S_IFCHR,
            FileKind::BlockDevice => S_IFBLK,
            FileKind::Fifo => S_IFIFO,
            FileKind::SymbolicLink => S_IFLNK,
            FileKind::Socket => S_IFSOCK,
        }
    }

    pub fn from_mode(mode: u32) -> Option<FileKind> {
        FileKind::ALL
            .into_iter()
            .find(|kind| mode & S_IFMT == kind.bits())
    }

    pub fn name(self) -> &'static str {
        match self {
            FileKind::File => "File",
            FileKind::Directory => "Directory",
            FileKind::CharacterDevice => "CharacterDevice",
            FileKind::BlockDevice => "BlockDevice",
            FileKind::Fifo => "FIFO",
            FileKind::SymbolicLink => "SymbolicLink",
            FileKind::Socket => "Socket",
        }
    }
}

impl FromStr for FileKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::InvalidType(s.to_string()))
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status information returned by the stat family of operations.
///
/// `mode` holds both the file type bits and the permission bits, exactly
/// as `st_mode` does, so it can be rewritten by result mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stat {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: u64,
    pub blksize: u64,
    pub blocks: u64,
    /// Last access time, as a duration since the unix epoch.
    pub atime: Duration,
    /// Last modification time.
    pub mtime: Duration,
    /// Last status change time.
    pub ctime: Duration,
}

impl Stat {
    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_mode(self.mode)
    }

    /// The permission bits and set-id/sticky bits, without the type.
    pub fn permissions(&self) -> u32 {
        self.mode & !S_IFMT
    }

    /// Replace the type bits, keeping every other bit of `mode`.
    pub fn set_kind(&mut self, kind: FileKind) {
        self.mode = (self.mode & !S_IFMT) | kind.bits();
    }

    pub fn is_file(&self) -> bool {
        self.kind() == Some(FileKind::File)
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == Some(FileKind::Directory)
    }

    pub fn is_char_device(&self) -> bool {
        self.kind() == Some(FileKind::CharacterDevice)
    }

    pub fn is_block_device(&self) -> bool {
        self.kind() == Some(FileKind::BlockDevice)
    }

    pub fn is_fifo(&self) -> bool {
        self.kind() == Some(FileKind::Fifo)
    }

    pub fn is_symlink(&self) -> bool {
        self.kind() == Some(FileKind::SymbolicLink)
    }

    pub fn is_socket(&self) -> bool {
        self.kind() == Some(FileKind::Socket)
    }

    pub fn modified(&self) -> SystemTime {
        UNIX_EPOCH + self.mtime
    }
}

impl From<&std::fs::Metadata> for Stat {
    fn from(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        let time = |secs: i64, nsecs: i64| {
            Duration::new(secs.max(0) as u64, nsecs.clamp(0, 999_999_999) as u32)
        };

        Stat {
            dev: meta.dev(),
            ino: meta.ino(),
            mode: meta.mode(),
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev(),
            size: meta.size(),
            blksize: meta.blksize(),
            blocks: meta.blocks(),
            atime: time(meta.atime(), meta.atime_nsec()),
            mtime: time(meta.mtime(), meta.mtime_nsec()),
            ctime: time(meta.ctime(), meta.ctime_nsec()),
        }
    }
}
