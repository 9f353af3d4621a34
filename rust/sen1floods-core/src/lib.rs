// rust/sen1floods-core/src/lib.rs

//! Sen1Floods11 - Core Library
//!
//! Loads the Sen1Floods11 flood-detection dataset: split manifests, a local
//! file cache backed by a remote data store, TIFF decoding, and example
//! processing, exposed as restartable per-split example iterators.

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{CacheWriteMode, LoaderConfig};
pub use error::{FloodsError, Result};
pub use storage::{LocalStorage, StorageBackend, StorageReader, StorageWriter};

pub mod remote;
pub use remote::{MirrorStore, NoRemote, RemoteStore};
#[cfg(feature = "s3")]
pub use remote::S3Store;

pub mod raster;
pub use raster::{Raster, RasterCodec, RasterProfile, SampleType, TiffCodec};

pub mod manifest;
pub use manifest::{Manifest, ManifestEntry};

pub mod resolver;
pub use resolver::{FetchMode, FetchPolicy, FileResolver, LABEL_HAND_DIR, S1_HAND_DIR};

pub mod processing;
pub use processing::{normalize_image, remap_mask, ProcessFn, Processing};

pub mod dataset;
pub use dataset::{
    DatasetInfo, DatasetSource, Example, Examples, FeatureSchema, FloodDataset,
    Sen1Floods11Builder, Split, SplitSource, StreamOptions,
};

pub mod loader;
pub use loader::DatasetLoader;

#[cfg(test)]
mod testing;
