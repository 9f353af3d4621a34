// rust/sen1floods-core/src/storage/traits.rs

//! The local side of file resolution as a trait.
//!
//! A resolver asks exactly three things of the cache: is a raster already
//! there, give me its bytes, and keep these bytes for next time.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// An open cached raster.
pub trait StorageReader: Read + Send {
    /// Length of the cached file in bytes.
    fn size(&self) -> u64;

    /// Reads whatever has not been consumed yet.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::Storage` if the file cannot be read.
    fn read_all(&mut self) -> Result<Vec<u8>>;
}

/// A pending cache entry.
///
/// Bytes written here become visible at the target path only once
/// [`finish`](StorageWriter::finish) succeeds. Dropping the writer instead
/// discards them.
pub trait StorageWriter: Write + Send {
    /// Publishes the written bytes at the target path.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::Storage` if the data cannot be flushed, synced
    /// or moved into place.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Cache storage, usable as `Arc<dyn StorageBackend>`.
///
/// Paths are relative to the backend's root.
pub trait StorageBackend: Send + Sync {
    /// True if a regular file is cached at `path`.
    ///
    /// A missing path or a directory is `false`, not an error.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::Storage` if the path exists but cannot be
    /// inspected.
    fn is_file(&self, path: &Path) -> Result<bool>;

    /// Opens the cached file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::Storage` if the file cannot be opened.
    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>>;

    /// Starts a new cache entry at `path`, replacing any existing one when
    /// finished. Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::Storage` if the directories or the staging file
    /// cannot be created.
    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>>;

    /// Where `path` lives, for error messages.
    fn locate(&self, path: &Path) -> PathBuf;
}
