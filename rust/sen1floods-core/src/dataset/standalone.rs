// rust/sen1floods-core/src/dataset/standalone.rs

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::processing::Processing;
use crate::resolver::FileResolver;

use super::iterator::SplitSource;
use super::traits::{DatasetSource, Split};

/// The dataset as plain generators: four splits, decoded values passed
/// through untouched, and fetching controlled per pass by
/// [`StreamOptions`](super::StreamOptions).
#[derive(Clone)]
pub struct FloodDataset {
    context: PathBuf,
    resolver: FileResolver,
}

impl FloodDataset {
    pub fn new(context: impl Into<PathBuf>, resolver: FileResolver) -> Self {
        Self {
            context: context.into(),
            resolver,
        }
    }

    pub fn context(&self) -> &Path {
        &self.context
    }

    /// Manifest file of `split`, relative to the context.
    pub fn manifest_name(split: Split) -> &'static str {
        match split {
            Split::Train => "train_data.csv",
            Split::Validation => "valid_data.csv",
            Split::Test => "test_data.csv",
            Split::Sample => "sample_data.csv",
        }
    }

    pub fn manifest_path(&self, split: Split) -> PathBuf {
        self.context.join(Self::manifest_name(split))
    }
}

impl DatasetSource for FloodDataset {
    fn list_splits(&self) -> Vec<Split> {
        Split::ALL.to_vec()
    }

    fn open_split(&self, split: Split) -> Result<SplitSource> {
        Ok(SplitSource::new(
            split,
            self.manifest_path(split),
            self.resolver.clone(),
            Processing::Raw,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheWriteMode;
    use crate::error::FloodsError;
    use crate::dataset::StreamOptions;
    use crate::testing::{self, CountingRemote};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn dataset(context: &TempDir, remote: Arc<CountingRemote>) -> FloodDataset {
        let resolver = testing::resolver(context.path(), remote, CacheWriteMode::Raw);
        FloodDataset::new(context.path(), resolver)
    }

    #[test]
    fn test_lists_four_splits() {
        let context = TempDir::new().unwrap();
        let dataset = dataset(&context, Arc::new(CountingRemote::default()));
        assert_eq!(dataset.list_splits(), Split::ALL.to_vec());
    }

    #[test]
    fn test_split_manifest_mapping() {
        let context = TempDir::new().unwrap();
        let dataset = dataset(&context, Arc::new(CountingRemote::default()));

        let validation = dataset.open_split_named("validation").unwrap();
        assert_eq!(validation.split(), Split::Validation);
        assert_eq!(
            validation.manifest_path(),
            context.path().join("valid_data.csv")
        );
        assert_eq!(FloodDataset::manifest_name(Split::Sample), "sample_data.csv");

        assert!(matches!(
            dataset.open_split_named("holdout"),
            Err(FloodsError::UnknownSplit { .. })
        ));
    }

    #[test]
    fn test_sample_split_streams_raw_values() {
        let context = TempDir::new().unwrap();
        let remote = Arc::new(CountingRemote::default());
        testing::publish_pairs(&remote, 2, 4);
        testing::write_manifest(&context.path().join("sample_data.csv"), 2);

        let source = dataset(&context, remote.clone())
            .open_split(Split::Sample)
            .unwrap();
        assert_eq!(source.len().unwrap(), 2);

        let options = StreamOptions {
            stream: true,
            ..StreamOptions::default()
        };
        let examples: Vec<_> = source
            .examples(&options)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(examples.len(), 2);
        // Untransformed: values outside [0, 1] and the -1 sentinel survive
        assert!(examples[1].image.iter().any(|&v| v < 0.0));
        assert_eq!(examples[0].mask[[0, 0, 0]], -1);
        assert_eq!(remote.call_count(), 4);
    }
}
