//! An in-memory [`RealFs`] with Windows-like semantics.
//!
//! Names compare case-insensitively, the working directory is tracked, and
//! every delegated call is appended to a journal so callers can see exactly
//! which real operations happened and with which paths.

use std::collections::BTreeMap;
use std::io;

use parking_lot::Mutex;

use crate::glob;
use crate::host::{
    AttributeData, Disposition, FileAttributes, FileTime, FindData, FindOptions, OpenRequest,
    RealFs,
};
use crate::path::{fold, is_absolute, join, normalize, split_last};

/// One delegated call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open { path: String, disposition: Disposition },
    DeleteFile(String),
    CreateDirectory(String),
    RemoveDirectory(String),
    Attributes(String),
    AttributeData(String),
    FindFirst(String),
    FindNext,
    FindClose,
    CurrentDirectory,
    SetCurrentDirectory(String),
}

/// Handle of a file opened on a [`MemoryFs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile {
    /// Canonical path the handle was opened on
    pub path: String,
    pub disposition: Disposition,
}

/// Remaining results of a search
#[derive(Debug)]
pub struct MemorySearch {
    remaining: Vec<FindData>,
}

#[derive(Debug, Clone)]
struct Entry {
    path: String,
    contents: Option<Vec<u8>>,
    created: FileTime,
    written: FileTime,
}

impl Entry {
    fn is_dir(&self) -> bool {
        self.contents.is_none()
    }

    fn data(&self) -> AttributeData {
        let (attributes, size) = match &self.contents {
            Some(bytes) => (FileAttributes::ARCHIVE, bytes.len() as u64),
            None => (FileAttributes::DIRECTORY, 0),
        };
        AttributeData {
            attributes,
            creation_time: self.created,
            last_access_time: self.written,
            last_write_time: self.written,
            size,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Entry>,
    cwd: String,
    clock: u64,
    calls: Vec<Call>,
}

fn is_drive_root(path: &str) -> bool {
    let trimmed = path.trim_end_matches('\\');
    trimmed.is_empty() || (trimmed.len() == 2 && trimmed.ends_with(':'))
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path} not found"))
}

impl Inner {
    fn tick(&mut self) -> FileTime {
        self.clock += 1;
        FileTime(self.clock)
    }

    fn canonical(&self, path: &str) -> io::Result<String> {
        if path.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
        }
        if is_absolute(path) {
            Ok(normalize(path))
        } else {
            Ok(normalize(&join(&self.cwd, path)))
        }
    }

    fn get(&self, canonical: &str) -> Option<&Entry> {
        self.entries.get(&fold(canonical))
    }

    fn is_dir(&self, canonical: &str) -> bool {
        is_drive_root(canonical) || self.get(canonical).is_some_and(Entry::is_dir)
    }

    fn parent_exists(&self, canonical: &str) -> bool {
        let (parent, _) = split_last(canonical);
        self.is_dir(parent)
    }

    fn insert(&mut self, canonical: &str, contents: Option<Vec<u8>>) {
        let now = self.tick();
        let created = self.get(canonical).map_or(now, |entry| entry.created);
        _ = self.entries.insert(
            fold(canonical),
            Entry {
                path: canonical.to_string(),
                contents,
                created,
                written: now,
            },
        );
    }

    fn mkdir_all(&mut self, canonical: &str) {
        if self.is_dir(canonical) {
            return;
        }
        let (parent, _) = split_last(canonical);
        self.mkdir_all(parent);
        self.insert(canonical, None);
    }

    fn has_children(&self, canonical: &str) -> bool {
        let prefix = fold(&format!("{canonical}\\"));
        self.entries
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }
}

/// A case-insensitive in-memory filesystem
#[derive(Debug)]
pub struct MemoryFs {
    inner: Mutex<Inner>,
}

impl MemoryFs {
    /// A filesystem whose working directory `cwd` already exists
    #[must_use]
    pub fn new(cwd: &str) -> Self {
        let cwd = normalize(cwd);
        let mut inner = Inner::default();
        inner.mkdir_all(&cwd);
        inner.cwd = cwd;
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Creates a directory and its ancestors without journaling
    pub fn add_dir(&self, path: &str) {
        let mut inner = self.inner.lock();
        let canonical = normalize(path);
        inner.mkdir_all(&canonical);
    }

    /// Creates or replaces a file, creating its ancestors, without journaling
    pub fn add_file(&self, path: &str, contents: &[u8]) {
        let mut inner = self.inner.lock();
        let canonical = normalize(path);
        let (parent, _) = split_last(&canonical);
        inner.mkdir_all(parent);
        inner.insert(&canonical, Some(contents.to_vec()));
    }

    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        let inner = self.inner.lock();
        inner.get(&normalize(path)).is_some()
    }

    #[must_use]
    pub fn is_dir(&self, path: &str) -> bool {
        let inner = self.inner.lock();
        inner.get(&normalize(path)).is_some_and(Entry::is_dir)
    }

    /// File contents; `None` for directories and missing paths
    #[must_use]
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock();
        inner.get(&normalize(path))?.contents.clone()
    }

    /// Writes through an open handle
    pub fn write(&self, file: &MemoryFile, contents: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock();
        match inner.get(&file.path) {
            Some(entry) if !entry.is_dir() => {
                inner.insert(&file.path, Some(contents.to_vec()));
                Ok(())
            }
            _ => Err(not_found(&file.path)),
        }
    }

    /// Every path currently stored, in canonical case-insensitive order
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner.entries.values().map(|entry| entry.path.clone()).collect()
    }

    /// The delegated-call journal
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    /// Empties the journal
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }
}

impl RealFs for MemoryFs {
    type File = MemoryFile;
    type Search = MemorySearch;

    fn full_path(&self, path: &str) -> io::Result<String> {
        self.inner.lock().canonical(path)
    }

    fn open(&self, path: &str, request: &OpenRequest) -> io::Result<MemoryFile> {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::Open {
            path: path.to_string(),
            disposition: request.disposition,
        });
        let canonical = inner.canonical(path)?;

        let existing = inner.get(&canonical).map(Entry::is_dir);
        if existing == Some(true) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{canonical} is a directory"),
            ));
        }
        if !inner.parent_exists(&canonical) {
            return Err(not_found(&canonical));
        }

        let exists = existing.is_some();
        match request.disposition {
            Disposition::CreateNew if exists => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{canonical} already exists"),
                ));
            }
            Disposition::OpenExisting | Disposition::TruncateExisting if !exists => {
                return Err(not_found(&canonical));
            }
            Disposition::CreateNew | Disposition::CreateAlways | Disposition::TruncateExisting => {
                inner.insert(&canonical, Some(Vec::new()));
            }
            Disposition::OpenAlways if !exists => inner.insert(&canonical, Some(Vec::new())),
            Disposition::OpenAlways | Disposition::OpenExisting => {}
        }

        Ok(MemoryFile {
            path: canonical,
            disposition: request.disposition,
        })
    }

    fn delete_file(&self, path: &str) -> io::Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::DeleteFile(path.to_string()));
        let canonical = inner.canonical(path)?;
        match inner.get(&canonical).map(Entry::is_dir) {
            None => Err(not_found(&canonical)),
            Some(true) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{canonical} is a directory"),
            )),
            Some(false) => {
                _ = inner.entries.remove(&fold(&canonical));
                Ok(())
            }
        }
    }

    fn create_directory(&self, path: &str) -> io::Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::CreateDirectory(path.to_string()));
        let canonical = inner.canonical(path)?;
        if inner.get(&canonical).is_some() || is_drive_root(&canonical) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{canonical} already exists"),
            ));
        }
        if !inner.parent_exists(&canonical) {
            return Err(not_found(&canonical));
        }
        inner.insert(&canonical, None);
        Ok(())
    }

    fn remove_directory(&self, path: &str) -> io::Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::RemoveDirectory(path.to_string()));
        let canonical = inner.canonical(path)?;
        match inner.get(&canonical).map(Entry::is_dir) {
            None => Err(not_found(&canonical)),
            Some(false) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{canonical} is a file"),
            )),
            Some(true) if inner.has_children(&canonical) => Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("{canonical} is not empty"),
            )),
            Some(true) => {
                _ = inner.entries.remove(&fold(&canonical));
                Ok(())
            }
        }
    }

    fn attributes(&self, path: &str) -> io::Result<FileAttributes> {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::Attributes(path.to_string()));
        let canonical = inner.canonical(path)?;
        match inner.get(&canonical) {
            Some(entry) => Ok(entry.data().attributes),
            None if is_drive_root(&canonical) => Ok(FileAttributes::DIRECTORY),
            None => Err(not_found(&canonical)),
        }
    }

    fn attribute_data(&self, path: &str) -> io::Result<AttributeData> {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::AttributeData(path.to_string()));
        let canonical = inner.canonical(path)?;
        inner
            .get(&canonical)
            .map(Entry::data)
            .ok_or_else(|| not_found(&canonical))
    }

    fn find_first(
        &self,
        pattern: &str,
        options: FindOptions,
    ) -> io::Result<(MemorySearch, FindData)> {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::FindFirst(pattern.to_string()));
        let canonical = inner.canonical(pattern)?;
        let (folder, name_pattern) = split_last(&canonical);
        if !inner.is_dir(folder) {
            return Err(not_found(folder));
        }

        let mut remaining: Vec<FindData> = inner
            .entries
            .values()
            .filter(|entry| {
                let (parent, _) = split_last(&entry.path);
                fold(parent) == fold(folder)
            })
            .filter(|entry| !options.directories_only || entry.is_dir())
            .filter_map(|entry| {
                let (_, name) = split_last(&entry.path);
                glob::matches(name_pattern, name).then(|| FindData {
                    file_name: name.to_string(),
                    data: entry.data(),
                })
            })
            .collect();
        remaining.reverse();

        let first = remaining.pop().ok_or_else(|| not_found(&canonical))?;
        Ok((MemorySearch { remaining }, first))
    }

    fn find_next(&self, search: &mut MemorySearch) -> io::Result<Option<FindData>> {
        self.inner.lock().calls.push(Call::FindNext);
        Ok(search.remaining.pop())
    }

    fn find_close(&self, _search: MemorySearch) -> io::Result<()> {
        self.inner.lock().calls.push(Call::FindClose);
        Ok(())
    }

    fn current_directory(&self) -> io::Result<String> {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::CurrentDirectory);
        Ok(inner.cwd.clone())
    }

    fn set_current_directory(&self, path: &str) -> io::Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(Call::SetCurrentDirectory(path.to_string()));
        let canonical = inner.canonical(path)?;
        if !inner.is_dir(&canonical) {
            return Err(not_found(&canonical));
        }
        inner.cwd = canonical;
        Ok(())
    }
}
