// rust/sen1floods-core/src/storage/mod.rs

//! Local cache storage.
//!
//! `StorageBackend` is the cache as the resolver sees it; `LocalStorage` is
//! the directory tree under the dataset context. A cache write only becomes
//! visible once its writer is finished.
//!
//! # Example
//!
//! ```no_run
//! use sen1floods_core::config::StorageConfig;
//! use sen1floods_core::storage::{LocalStorage, StorageBackend};
//! use std::io::Write;
//! use std::path::Path;
//!
//! let storage = LocalStorage::new("/data/sen1floods11", &StorageConfig::default());
//!
//! let mut writer = storage.open_write(Path::new("cache/tile.tif")).unwrap();
//! writer.write_all(b"II*\0").unwrap();
//! writer.finish().unwrap();
//!
//! let bytes = storage.open_read(Path::new("cache/tile.tif")).unwrap().read_all().unwrap();
//! assert_eq!(bytes.len(), 4);
//! ```

mod local;
mod traits;

pub use local::LocalStorage;
pub use traits::{StorageBackend, StorageReader, StorageWriter};
