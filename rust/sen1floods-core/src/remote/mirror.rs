// rust/sen1floods-core/src/remote/mirror.rs

use std::fs;
use std::path::{Component, Path, PathBuf};

use super::RemoteStore;
use crate::error::{FloodsError, Result};

/// A remote store backed by a directory that mirrors the remote layout,
/// such as a network mount or a fully pulled checkout of the data registry.
#[derive(Debug, Clone)]
pub struct MirrorStore {
    root: PathBuf,
}

impl MirrorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(FloodsError::remote_fetch(path, "path escapes the mirror root"));
        }
        Ok(self.root.join(relative))
    }
}

impl RemoteStore for MirrorStore {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path)?;
        fs::read(&full_path).map_err(|e| {
            FloodsError::remote_fetch_with_source(
                path,
                format!("failed to read {}", full_path.display()),
                e,
            )
        })
    }

    fn describe(&self) -> String {
        format!("mirror:{}", self.root.display())
    }
}
