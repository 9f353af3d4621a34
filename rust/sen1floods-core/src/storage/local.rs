// rust/sen1floods-core/src/storage/local.rs

//! The on-disk raster cache.
//!
//! Cached rasters live at `<context>/<logical_dir>/<filename>`. Reads of
//! small tiles go through a `BufReader`; full-size tiles are memory-mapped.
//! Writes are staged in a hidden sibling file and renamed into place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use super::traits::{StorageBackend, StorageReader, StorageWriter};
use crate::config::StorageConfig;
use crate::error::{FloodsError, Result};

/// The raster cache under a dataset context directory.
///
/// Nothing is created on disk until the first cache write.
pub struct LocalStorage {
    root: PathBuf,
    buffer_size: usize,
    use_mmap: bool,
    mmap_threshold: u64,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, config: &StorageConfig) -> Self {
        Self {
            root: root.into(),
            buffer_size: config.buffer_size.max(1),
            use_mmap: config.use_mmap,
            mmap_threshold: config.mmap_threshold,
        }
    }

    /// The context directory this cache is rooted at.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// `dir/.name.<pid>.partial` for a target of `dir/name`.
fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.{}.partial", std::process::id()))
}

impl StorageBackend for LocalStorage {
    fn is_file(&self, path: &Path) -> Result<bool> {
        let full = self.full_path(path);
        match fs::metadata(&full) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FloodsError::storage_with_source(full, "cannot inspect cache entry", e)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>> {
        let full = self.full_path(path);
        let file = File::open(&full)
            .map_err(|e| FloodsError::storage_with_source(&full, "cannot open cached file", e))?;
        let size = file
            .metadata()
            .map_err(|e| FloodsError::storage_with_source(&full, "cannot stat cached file", e))?
            .len();

        if !self.use_mmap || size == 0 || size < self.mmap_threshold {
            return Ok(Box::new(BufferedReader {
                inner: BufReader::with_capacity(self.buffer_size, file),
                size,
                path: full,
            }));
        }

        // SAFETY: the map is read-only and owned by the reader. A concurrent
        // writer replaces the file by rename, which leaves this inode intact.
        let map = unsafe { Mmap::map(&file) }
            .map_err(|e| FloodsError::storage_with_source(&full, "cannot map cached file", e))?;
        Ok(Box::new(MappedReader { map, offset: 0 }))
    }

    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>> {
        let target = self.full_path(path);
        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                FloodsError::storage_with_source(dir, "cannot create cache directory", e)
            })?;
        }

        let staging = staging_path(&target);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)
            .map_err(|e| FloodsError::storage_with_source(&staging, "cannot create cache file", e))?;

        Ok(Box::new(StagedWriter {
            inner: Some(BufWriter::with_capacity(self.buffer_size, file)),
            staging,
            target,
        }))
    }

    fn locate(&self, path: &Path) -> PathBuf {
        self.full_path(path)
    }
}

struct BufferedReader {
    inner: BufReader<File>,
    size: u64,
    path: PathBuf,
}

impl Read for BufferedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl StorageReader for BufferedReader {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.size as usize);
        self.inner
            .read_to_end(&mut bytes)
            .map_err(|e| FloodsError::storage_with_source(&self.path, "cannot read cached file", e))?;
        Ok(bytes)
    }
}

struct MappedReader {
    map: Mmap,
    offset: usize,
}

impl MappedReader {
    fn rest(&self) -> &[u8] {
        &self.map[self.offset.min(self.map.len())..]
    }
}

impl Read for MappedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.rest().read(buf)?;
        self.offset += n;
        Ok(n)
    }
}

impl StorageReader for MappedReader {
    fn size(&self) -> u64 {
        self.map.len() as u64
    }

    fn read_all(&mut self) -> Result<Vec<u8>> {
        let bytes = self.rest().to_vec();
        self.offset = self.map.len();
        Ok(bytes)
    }
}

/// Writes to `staging` and renames it over `target` on finish.
struct StagedWriter {
    // `None` once finished
    inner: Option<BufWriter<File>>,
    staging: PathBuf,
    target: PathBuf,
}

impl StagedWriter {
    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::other("cache writer already finished"))
    }

    fn publish(&mut self) -> Result<()> {
        let Some(mut writer) = self.inner.take() else {
            return Ok(());
        };
        writer
            .flush()
            .map_err(|e| FloodsError::storage_with_source(&self.staging, "cannot flush cache file", e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| FloodsError::storage_with_source(&self.staging, "cannot sync cache file", e))?;
        drop(writer);

        fs::rename(&self.staging, &self.target).map_err(|e| {
            FloodsError::storage_with_source(&self.target, "cannot move cache file into place", e)
        })
    }
}

impl Write for StagedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl StorageWriter for StagedWriter {
    fn finish(mut self: Box<Self>) -> Result<()> {
        let published = self.publish();
        if published.is_err() {
            let _ = fs::remove_file(&self.staging);
        }
        published
    }
}

impl Drop for StagedWriter {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            let _ = fs::remove_file(&self.staging);
        }
    }
}
