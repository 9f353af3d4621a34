// rust/sen1floods-core/src/dataset/builder.rs

//! The dataset as a framework builder.
//!
//! Three splits with a declared feature schema. Files missing from the
//! cache are always fetched and cached; with `no_cache` every file is read
//! from the remote and nothing is written locally. Images are normalized and
//! mask sentinels remapped before examples are handed out.

use std::path::{Path, PathBuf};

use crate::error::{FloodsError, Result};
use crate::processing::Processing;
use crate::resolver::{FetchMode, FetchPolicy, FileResolver};

use super::iterator::{Examples, SplitSource, StreamOptions};
use super::schema::{DatasetInfo, FeatureSchema};
use super::traits::{DatasetSource, Split};

/// Directory holding the builder's manifests, relative to the context.
pub const DATA_DIR: &str = "sen1floods11-dataset";

/// Options of the framework builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Read every file from the remote and never write the cache.
    pub no_cache: bool,
    /// Reject examples whose shapes differ from the declared schema.
    pub validate_schema: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            no_cache: false,
            validate_schema: true,
        }
    }
}

#[derive(Clone)]
pub struct Sen1Floods11Builder {
    context: PathBuf,
    resolver: FileResolver,
    options: BuilderOptions,
}

impl Sen1Floods11Builder {
    pub fn new(context: impl Into<PathBuf>, resolver: FileResolver, options: BuilderOptions) -> Self {
        Self {
            context: context.into(),
            resolver,
            options,
        }
    }

    pub fn context(&self) -> &Path {
        &self.context
    }

    pub fn options(&self) -> BuilderOptions {
        self.options
    }

    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            name: "sen1floods11".to_string(),
            version: "1.0.0".to_string(),
            description: "Sen1Floods11 - Dataset for flood detection using Sentinel-1 data."
                .to_string(),
            features: FeatureSchema::SEN1FLOODS11,
        }
    }

    /// Manifest path of `split`, or `None` for splits the builder lacks.
    pub fn manifest_path(&self, split: Split) -> Option<PathBuf> {
        let name = match split {
            Split::Train => "flood_train_data.csv",
            Split::Validation => "flood_valid_data.csv",
            Split::Test => "flood_test_data.csv",
            Split::Sample => return None,
        };
        Some(self.context.join(DATA_DIR).join(name))
    }

    pub fn fetch_mode(&self) -> FetchMode {
        if self.options.no_cache {
            FetchMode::Uncached
        } else {
            FetchMode::Cached(FetchPolicy::CACHE_IF_MISSING)
        }
    }

    /// Iterates `split` in manifest order.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::UnknownSplit` for the sample split and
    /// `FloodsError::FileAccess` if the manifest cannot be read.
    pub fn examples(&self, split: Split) -> Result<Examples> {
        self.open_split(split)?.examples(&StreamOptions::default())
    }
}

impl DatasetSource for Sen1Floods11Builder {
    fn list_splits(&self) -> Vec<Split> {
        vec![Split::Train, Split::Validation, Split::Test]
    }

    fn open_split(&self, split: Split) -> Result<SplitSource> {
        let manifest = self
            .manifest_path(split)
            .ok_or_else(|| FloodsError::unknown_split(split.as_str()))?;

        let source = SplitSource::new(split, manifest, self.resolver.clone(), Processing::Normalized)
            .with_fetch_mode(self.fetch_mode());
        Ok(if self.options.validate_schema {
            source.with_schema(self.info().features)
        } else {
            source
        })
    }
}
