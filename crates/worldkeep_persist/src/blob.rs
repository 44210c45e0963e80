//! Byte-blob storage primitives.
//!
//! Everything the persistence layer writes is an opaque blob at a path. A
//! missing blob is not an error: `read` returns `Ok(None)`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use worldkeep_foundation::{Error, ErrorKind, Result};

/// Fallible whole-blob storage.
pub trait BlobStore {
    /// Creates a directory and all of its parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_dir_all(&mut self, path: &Path) -> Result<()>;

    /// Reads a whole blob, or `None` if nothing exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be read.
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Writes a whole blob, replacing any previous contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be written.
    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Checks whether a blob exists at `path`.
    fn exists(&self, path: &Path) -> bool;
}

/// Filesystem-backed blob storage.
///
/// Writes go to a temporary file in the destination directory, which is
/// synced to disk and then renamed over the target. A reader sees either the
/// old blob or the complete new one.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileBlobStore;

impl FileBlobStore {
    /// Creates a filesystem blob store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BlobStore for FileBlobStore {
    fn create_dir_all(&mut self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| Error::io("create directory", path, &e))
    }

    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io("read", path, &e)),
        }
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = path.parent().ok_or_else(|| {
            Error::new(ErrorKind::IoError(format!(
                "no parent directory for '{}'",
                path.display()
            )))
        })?;
        let mut temp =
            NamedTempFile::new_in(dir).map_err(|e| Error::io("create temp file in", dir, &e))?;
        temp.write_all(bytes)
            .map_err(|e| Error::io("write", temp.path(), &e))?;
        temp.flush()
            .map_err(|e| Error::io("flush", temp.path(), &e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| Error::io("sync", temp.path(), &e))?;
        temp.persist(path)
            .map_err(|e| Error::io("replace", path, &e.error))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory blob storage for tests and headless runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlobStore {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryBlobStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of blobs held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no blobs are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns true if `path` was created as a directory.
    #[must_use]
    pub fn has_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    /// Iterates over the stored blob paths.
    pub fn paths(&self) -> impl Iterator<Item = &Path> + '_ {
        self.files.keys().map(PathBuf::as_path)
    }
}

impl BlobStore for MemoryBlobStore {
    fn create_dir_all(&mut self, path: &Path) -> Result<()> {
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                self.dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}
