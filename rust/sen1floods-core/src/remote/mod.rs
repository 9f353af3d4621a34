// rust/sen1floods-core/src/remote/mod.rs

//! Remote data stores.
//!
//! The remote side of file resolution is a path-addressed blob store: given a
//! logical path rooted at `/` (for example
//! `/v1.1/data/flood_events/HandLabeled/S1Hand/Bolivia_103757_S1Hand.tif`)
//! it returns the raw bytes of the file. Reads block the caller and are not
//! retried; any failure surfaces as `FloodsError::RemoteFetch`.

use std::sync::Arc;

use crate::config::{RemoteBackendType, RemoteConfig};
use crate::error::{FloodsError, Result};

mod mirror;
#[cfg(feature = "s3")]
mod s3;

pub use mirror::MirrorStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

/// A path-addressed, read-only blob store.
pub trait RemoteStore: Send + Sync {
    /// Reads the whole object stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::RemoteFetch` if the object is missing or the
    /// store cannot be reached.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// Short human-readable description, used in logs.
    fn describe(&self) -> String;
}

/// Stand-in used when no remote backend is configured.
#[derive(Debug, Clone, Default)]
pub struct NoRemote;

impl RemoteStore for NoRemote {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        Err(FloodsError::remote_fetch(path, "no remote backend configured"))
    }

    fn describe(&self) -> String {
        "none".to_string()
    }
}

/// Builds the remote store selected by `config`.
///
/// # Errors
///
/// Returns a configuration error if the selected backend is missing its
/// settings or was not compiled in.
pub fn from_config(config: &RemoteConfig) -> Result<Arc<dyn RemoteStore>> {
    match config.backend {
        RemoteBackendType::None => Ok(Arc::new(NoRemote)),
        RemoteBackendType::Mirror => {
            let root = config.mirror_root.as_ref().ok_or_else(|| {
                FloodsError::config("remote.mirror_root is required when backend is 'mirror'")
            })?;
            Ok(Arc::new(MirrorStore::new(root)))
        }
        RemoteBackendType::S3 => build_s3(config),
    }
}

#[cfg(feature = "s3")]
fn build_s3(config: &RemoteConfig) -> Result<Arc<dyn RemoteStore>> {
    let s3_config = config.s3.as_ref().ok_or_else(|| {
        FloodsError::config("remote.s3 configuration is required when backend is 's3'")
    })?;
    Ok(Arc::new(S3Store::new(s3_config)?))
}

#[cfg(not(feature = "s3"))]
fn build_s3(_config: &RemoteConfig) -> Result<Arc<dyn RemoteStore>> {
    Err(FloodsError::config(
        "remote backend 's3' requires building with the `s3` feature",
    ))
}
