//! The passthrough contract: the real filesystem operations the engine
//! delegates to.
//!
//! An implementation mirrors the intercepted OS calls one to one. The
//! engine never performs I/O itself; it only decides which path a call
//! goes to and calls back into the [`RealFs`] it was built with.

use std::io;
use std::ops::{BitOr, BitOrAssign};

/// How an open call treats an existing or missing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Create; fail if it exists
    CreateNew,
    /// Create or truncate
    CreateAlways,
    /// Open; fail if missing
    OpenExisting,
    /// Open or create
    OpenAlways,
    /// Truncate; fail if missing
    TruncateExisting,
}

impl Disposition {
    /// True when the call fails on a missing file instead of creating it
    #[must_use]
    pub fn requires_existing(self) -> bool {
        matches!(self, Disposition::OpenExisting | Disposition::TruncateExisting)
    }
}

/// Arguments of an open-or-create call besides the path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRequest {
    pub desired_access: u32,
    pub share_mode: u32,
    pub disposition: Disposition,
    pub flags_and_attributes: u32,
}

impl OpenRequest {
    pub const GENERIC_READ: u32 = 0x8000_0000;
    pub const GENERIC_WRITE: u32 = 0x4000_0000;

    #[must_use]
    pub fn read() -> Self {
        Self::new(Self::GENERIC_READ, Disposition::OpenExisting)
    }

    #[must_use]
    pub fn create(disposition: Disposition) -> Self {
        Self::new(Self::GENERIC_READ | Self::GENERIC_WRITE, disposition)
    }

    #[must_use]
    pub fn new(desired_access: u32, disposition: Disposition) -> Self {
        Self {
            desired_access,
            share_mode: 0,
            disposition,
            flags_and_attributes: FileAttributes::NORMAL.bits(),
        }
    }
}

/// Attribute bits of a file or directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileAttributes(u32);

impl FileAttributes {
    pub const READONLY: Self = Self(0x01);
    pub const DIRECTORY: Self = Self(0x10);
    pub const ARCHIVE: Self = Self(0x20);
    pub const NORMAL: Self = Self(0x80);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_directory(self) -> bool {
        self.contains(Self::DIRECTORY)
    }
}

impl BitOr for FileAttributes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FileAttributes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// 100-nanosecond intervals since 1601-01-01, as the OS reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FileTime(pub u64);

impl FileTime {
    /// Timestamp reported for virtual folders
    pub const SENTINEL: Self = Self(0);
}

/// Extended attributes of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeData {
    pub attributes: FileAttributes,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub size: u64,
}

impl AttributeData {
    /// What a virtual folder reports: a zero-size directory with sentinel times
    #[must_use]
    pub fn virtual_folder() -> Self {
        Self {
            attributes: FileAttributes::DIRECTORY,
            creation_time: FileTime::SENTINEL,
            last_access_time: FileTime::SENTINEL,
            last_write_time: FileTime::SENTINEL,
            size: 0,
        }
    }
}

/// One result of a directory search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindData {
    pub file_name: String,
    pub data: AttributeData,
}

/// Options of the extended find-first call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindOptions {
    /// Advisory: only directories are wanted
    pub directories_only: bool,
}

/// The real filesystem, as seen from the interception boundary.
///
/// Paths are passed exactly as the engine decided: either the caller's
/// original argument or a redirected absolute path.
pub trait RealFs: Send + Sync {
    /// Open file handle
    type File: Send;
    /// Open search handle
    type Search: Send;

    /// Host canonicalization: absolute, separators unified, `.`/`..` resolved
    fn full_path(&self, path: &str) -> io::Result<String>;

    fn open(&self, path: &str, request: &OpenRequest) -> io::Result<Self::File>;

    fn delete_file(&self, path: &str) -> io::Result<()>;

    fn create_directory(&self, path: &str) -> io::Result<()>;

    fn remove_directory(&self, path: &str) -> io::Result<()>;

    fn attributes(&self, path: &str) -> io::Result<FileAttributes>;

    fn attribute_data(&self, path: &str) -> io::Result<AttributeData>;

    /// Starts a search for `pattern` (a folder path ending in a glob)
    fn find_first(
        &self,
        pattern: &str,
        options: FindOptions,
    ) -> io::Result<(Self::Search, FindData)>;

    /// Next result, or `Ok(None)` once the search is exhausted
    fn find_next(&self, search: &mut Self::Search) -> io::Result<Option<FindData>>;

    fn find_close(&self, search: Self::Search) -> io::Result<()>;

    fn current_directory(&self) -> io::Result<String>;

    fn set_current_directory(&self, path: &str) -> io::Result<()>;
}
