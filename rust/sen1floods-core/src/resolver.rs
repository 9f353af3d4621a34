// rust/sen1floods-core/src/resolver.rs

//! Cache-or-remote file resolution.
//!
//! Every image and mask referenced by a manifest lives under one of two
//! logical directories. A reference resolves to the local cache file at
//! `<context>/<dir>/<filename>` when one exists, otherwise to the remote
//! object at `/<dir>/<filename>`. Fetched files may be written back to the
//! cache; cached files are never revalidated against the remote.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::CacheWriteMode;
use crate::error::{FloodsError, Result};
use crate::raster::{Raster, RasterCodec};
use crate::remote::RemoteStore;
use crate::storage::StorageBackend;

/// Logical directory of the Sentinel-1 hand-labelled image tiles.
pub const S1_HAND_DIR: &str = "v1.1/data/flood_events/HandLabeled/S1Hand/";

/// Logical directory of the hand-labelled flood masks.
pub const LABEL_HAND_DIR: &str = "v1.1/data/flood_events/HandLabeled/LabelHand/";

/// What the resolver may do when a file is not in the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Fetch missing files from the remote store.
    pub allow_remote: bool,
    /// Write fetched files to the local cache.
    pub persist_cache: bool,
}

impl FetchPolicy {
    /// Only ever read the local cache.
    pub const LOCAL_ONLY: Self = Self {
        allow_remote: false,
        persist_cache: false,
    };

    /// Fetch missing files and keep them.
    pub const CACHE_IF_MISSING: Self = Self {
        allow_remote: true,
        persist_cache: true,
    };

    pub fn new(allow_remote: bool, persist_cache: bool) -> Self {
        Self {
            allow_remote,
            persist_cache,
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            allow_remote: false,
            persist_cache: true,
        }
    }
}

/// How an adapter obtains each file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Prefer the cache and fall back according to the policy.
    Cached(FetchPolicy),
    /// Always fetch remotely and never touch the cache.
    Uncached,
}

impl Default for FetchMode {
    fn default() -> Self {
        FetchMode::Cached(FetchPolicy::default())
    }
}

/// Resolves file references against the local cache and the remote store.
#[derive(Clone)]
pub struct FileResolver {
    local: Arc<dyn StorageBackend>,
    remote: Arc<dyn RemoteStore>,
    codec: Arc<dyn RasterCodec>,
    write_mode: CacheWriteMode,
}

impl FileResolver {
    pub fn new(
        local: Arc<dyn StorageBackend>,
        remote: Arc<dyn RemoteStore>,
        codec: Arc<dyn RasterCodec>,
        write_mode: CacheWriteMode,
    ) -> Self {
        Self {
            local,
            remote,
            codec,
            write_mode,
        }
    }

    pub fn codec(&self) -> &Arc<dyn RasterCodec> {
        &self.codec
    }

    pub fn write_mode(&self) -> CacheWriteMode {
        self.write_mode
    }

    /// Cache path of a reference, relative to the context.
    ///
    /// # Errors
    ///
    /// Returns a storage error if `filename` is not a plain file name.
    pub fn local_path(dir: &str, filename: &str) -> Result<PathBuf> {
        check_filename(dir, filename)?;
        Ok(Path::new(dir.trim_matches('/')).join(filename))
    }

    /// Remote path of a reference, rooted at `/`.
    pub fn remote_path(dir: &str, filename: &str) -> String {
        let dir = dir.trim_matches('/');
        if dir.is_empty() {
            format!("/{filename}")
        } else {
            format!("/{dir}/{filename}")
        }
    }

    /// Returns the raw bytes of a reference.
    ///
    /// A cached copy always wins, whatever the policy. Without one, the file
    /// is fetched if `policy.allow_remote` is set and written to the cache if
    /// `policy.persist_cache` is also set.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::NotAccessible` if the file is not cached and
    /// remote fetch is disallowed, or `FloodsError::RemoteFetch` if the fetch
    /// fails.
    pub fn resolve(&self, dir: &str, filename: &str, policy: FetchPolicy) -> Result<Vec<u8>> {
        let (bytes, _) = self.resolve_with(dir, filename, policy, |_| Ok(None))?;
        Ok(bytes)
    }

    /// Fetches a reference from the remote store without reading or writing
    /// the local cache.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::RemoteFetch` if the fetch fails.
    pub fn fetch_uncached(&self, dir: &str, filename: &str) -> Result<Vec<u8>> {
        check_filename(dir, filename)?;
        self.fetch(dir, filename)
    }

    /// Resolves and decodes a reference.
    ///
    /// Fetched bytes are decoded before anything is written, so a file the
    /// codec rejects never lands in the cache.
    ///
    /// # Errors
    ///
    /// Same as [`FileResolver::resolve`], plus `FloodsError::Codec` for
    /// undecodable bytes.
    pub fn load(&self, dir: &str, filename: &str, policy: FetchPolicy) -> Result<Raster> {
        let (bytes, decoded) =
            self.resolve_with(dir, filename, policy, |bytes| self.codec.decode(bytes).map(Some))?;
        match decoded {
            Some(raster) => Ok(raster),
            None => self.codec.decode(&bytes),
        }
    }

    /// Fetches and decodes a reference, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Same as [`FileResolver::fetch_uncached`], plus `FloodsError::Codec`.
    pub fn load_uncached(&self, dir: &str, filename: &str) -> Result<Raster> {
        let bytes = self.fetch_uncached(dir, filename)?;
        self.codec.decode(&bytes)
    }

    /// Loads a reference the way `mode` asks for.
    ///
    /// # Errors
    ///
    /// See [`FileResolver::load`] and [`FileResolver::load_uncached`].
    pub fn load_with(&self, dir: &str, filename: &str, mode: FetchMode) -> Result<Raster> {
        match mode {
            FetchMode::Cached(policy) => self.load(dir, filename, policy),
            FetchMode::Uncached => self.load_uncached(dir, filename),
        }
    }

    /// The one cache-or-fetch path behind `resolve` and `load`.
    ///
    /// `check` sees the bytes before anything is written to the cache and may
    /// hand back their decoded form; a failed check aborts without caching.
    fn resolve_with(
        &self,
        dir: &str,
        filename: &str,
        policy: FetchPolicy,
        check: impl FnOnce(&[u8]) -> Result<Option<Raster>>,
    ) -> Result<(Vec<u8>, Option<Raster>)> {
        let relative = Self::local_path(dir, filename)?;
        if let Some(bytes) = self.read_cached(&relative)? {
            let decoded = check(&bytes)?;
            return Ok((bytes, decoded));
        }
        if !policy.allow_remote {
            return Err(FloodsError::not_accessible(self.local.locate(&relative)));
        }

        let bytes = self.fetch(dir, filename)?;
        let decoded = check(&bytes)?;
        if policy.persist_cache {
            self.persist(&relative, &bytes, decoded.as_ref())?;
        }
        Ok((bytes, decoded))
    }

    fn read_cached(&self, relative: &Path) -> Result<Option<Vec<u8>>> {
        if !self.local.is_file(relative)? {
            return Ok(None);
        }
        tracing::debug!(path = %relative.display(), "cache hit");
        let mut reader = self.local.open_read(relative)?;
        reader.read_all().map(Some)
    }

    fn fetch(&self, dir: &str, filename: &str) -> Result<Vec<u8>> {
        let remote_path = Self::remote_path(dir, filename);
        let bytes = self.remote.read_bytes(&remote_path)?;
        tracing::info!(
            remote = %self.remote.describe(),
            path = %remote_path,
            bytes = bytes.len(),
            "fetched remote file"
        );
        Ok(bytes)
    }

    fn persist(&self, relative: &Path, fetched: &[u8], decoded: Option<&Raster>) -> Result<()> {
        match self.write_mode {
            CacheWriteMode::Raw => self.write_local(relative, fetched),
            CacheWriteMode::Reencode => {
                let encoded = match decoded {
                    Some(raster) => self.codec.encode(raster)?,
                    None => self.codec.encode(&self.codec.decode(fetched)?)?,
                };
                self.write_local(relative, &encoded)
            }
        }
    }

    fn write_local(&self, relative: &Path, bytes: &[u8]) -> Result<()> {
        let mut writer = self.local.open_write(relative)?;
        writer.write_all(bytes).map_err(|e| {
            FloodsError::storage_with_source(
                self.local.locate(relative),
                "failed to write cache entry",
                e,
            )
        })?;
        writer.finish()?;

        tracing::info!(
            path = %relative.display(),
            bytes = bytes.len(),
            mode = ?self.write_mode,
            "cached remote file"
        );
        Ok(())
    }
}

fn check_filename(dir: &str, filename: &str) -> Result<()> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
    {
        return Err(FloodsError::storage(
            Path::new(dir).join(filename),
            format!("'{filename}' is not a plain file name"),
        ));
    }
    Ok(())
}
