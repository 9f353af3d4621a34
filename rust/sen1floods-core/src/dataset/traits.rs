// rust/sen1floods-core/src/dataset/traits.rs

use std::fmt;
use std::str::FromStr;

use ndarray::Array3;

use crate::error::{FloodsError, Result};
use crate::manifest::ManifestEntry;

use super::iterator::SplitSource;

/// A named partition of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Split {
    Train,
    Validation,
    Test,
    Sample,
}

impl Split {
    pub const ALL: [Split; 4] = [Split::Train, Split::Validation, Split::Test, Split::Sample];

    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "validation",
            Split::Test => "test",
            Split::Sample => "sample",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Split {
    type Err = FloodsError;

    fn from_str(s: &str) -> Result<Self> {
        Split::ALL
            .into_iter()
            .find(|split| split.as_str() == s)
            .ok_or_else(|| FloodsError::unknown_split(s))
    }
}

/// One decoded training example.
///
/// `image` is `(height, width, bands)` backscatter and `mask` is
/// `(height, width, 1)` labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    /// Position of the row in the order the examples were produced.
    pub index: usize,
    /// The manifest row the example was built from.
    pub entry: ManifestEntry,
    pub image: Array3<f32>,
    pub mask: Array3<i32>,
}

/// A dataset exposed as a fixed set of splits.
///
/// This is the only surface a host framework needs: it enumerates the splits
/// and opens a restartable example source for each.
pub trait DatasetSource {
    /// Returns the splits this dataset provides, in a stable order.
    fn list_splits(&self) -> Vec<Split>;

    /// Opens the example source for `split`.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::UnknownSplit` if the dataset does not provide
    /// `split`.
    fn open_split(&self, split: Split) -> Result<SplitSource>;

    /// Opens a split by name.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::UnknownSplit` for names that are not splits of
    /// this dataset.
    fn open_split_named(&self, name: &str) -> Result<SplitSource> {
        self.open_split(name.parse()?)
    }
}
