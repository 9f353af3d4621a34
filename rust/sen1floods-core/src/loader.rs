// rust/sen1floods-core/src/loader.rs

//! Top-level entry point.
//!
//! `DatasetLoader` wires a [`LoaderConfig`] into a local cache, a remote
//! store and a raster codec, and hands out both dataset adapters over the
//! same resolver.
//!
//! # Example
//!
//! ```no_run
//! use sen1floods_core::dataset::{DatasetSource, Split};
//! use sen1floods_core::{DatasetLoader, LoaderConfig};
//!
//! let loader = DatasetLoader::from_config(LoaderConfig::with_context("/data/sen1floods11")).unwrap();
//!
//! let dataset = loader.flood_dataset();
//! let train = dataset.open_split(Split::Train).unwrap();
//! println!("train has {} examples", train.len().unwrap());
//!
//! for example in train.examples(&loader.stream_options()).unwrap() {
//!     let example = example.unwrap();
//!     println!("{} -> {:?}", example.entry.image, example.image.dim());
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::config::LoaderConfig;
use crate::dataset::{BuilderOptions, FloodDataset, Sen1Floods11Builder, StreamOptions};
use crate::error::Result;
use crate::raster::{RasterCodec, TiffCodec};
use crate::remote::{self, RemoteStore};
use crate::resolver::FileResolver;
use crate::storage::{LocalStorage, StorageBackend};

/// Owns the resolver shared by both adapters.
pub struct DatasetLoader {
    config: LoaderConfig,
    resolver: FileResolver,
}

impl DatasetLoader {
    /// Creates a loader from a configuration file.
    ///
    /// The file is TOML; environment overrides are applied after loading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = LoaderConfig::from_file(path)?.with_env_overrides();
        Self::from_config(config)
    }

    /// Creates a loader whose remote store is built from `config.remote`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the remote store
    /// cannot be built.
    pub fn from_config(config: LoaderConfig) -> Result<Self> {
        config.validate()?;
        let remote = remote::from_config(&config.remote)?;
        Self::with_remote(config, remote)
    }

    /// Creates a loader around an existing remote store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_remote(config: LoaderConfig, remote: Arc<dyn RemoteStore>) -> Result<Self> {
        config.validate()?;

        let local: Arc<dyn StorageBackend> =
            Arc::new(LocalStorage::new(&config.context, &config.storage));
        let codec: Arc<dyn RasterCodec> = Arc::new(TiffCodec::new());
        let resolver = FileResolver::new(local, remote, codec, config.cache.write_mode);

        tracing::debug!(
            context = %config.context.display(),
            write_mode = ?config.cache.write_mode,
            "dataset loader ready"
        );

        Ok(Self { config, resolver })
    }

    /// The standalone four-split dataset.
    pub fn flood_dataset(&self) -> FloodDataset {
        FloodDataset::new(&self.config.context, self.resolver.clone())
    }

    /// The framework builder, honoring `no_cache` and `validate_schema`.
    pub fn builder(&self) -> Sen1Floods11Builder {
        self.builder_with(self.config.no_cache)
    }

    /// The framework builder with `no_cache` decided by the caller.
    pub fn builder_with(&self, no_cache: bool) -> Sen1Floods11Builder {
        let options = BuilderOptions {
            no_cache,
            validate_schema: self.config.dataset.validate_schema,
        };
        Sen1Floods11Builder::new(&self.config.context, self.resolver.clone(), options)
    }

    /// Stream options taken from the `[dataset]` section.
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions::from(&self.config.dataset)
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn resolver(&self) -> &FileResolver {
        &self.resolver
    }
}
