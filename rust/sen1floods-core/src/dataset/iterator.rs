// rust/sen1floods-core/src/dataset/iterator.rs

use std::fmt;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::DatasetConfig;
use crate::error::Result;
use crate::manifest::{Manifest, ManifestEntries, ManifestEntry};
use crate::processing::{to_labels, ProcessFn, Processing};
use crate::resolver::{FetchMode, FetchPolicy, FileResolver, LABEL_HAND_DIR, S1_HAND_DIR};

use super::schema::FeatureSchema;
use super::traits::{Example, Split};

/// Per-iteration options.
#[derive(Clone)]
pub struct StreamOptions {
    /// Visit the manifest rows in random order.
    pub shuffle: bool,
    /// Seed for a reproducible shuffle.
    pub seed: Option<u64>,
    /// Fetch files missing from the local cache.
    pub stream: bool,
    /// Keep fetched files in the local cache.
    pub stream_cache: bool,
    /// Log and skip examples that fail instead of stopping.
    pub skip_errors: bool,
    /// Transform applied to each example after the built-in processing.
    pub process: Option<ProcessFn>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            shuffle: false,
            seed: None,
            stream: false,
            stream_cache: true,
            skip_errors: false,
            process: None,
        }
    }
}

impl fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamOptions")
            .field("shuffle", &self.shuffle)
            .field("seed", &self.seed)
            .field("stream", &self.stream)
            .field("stream_cache", &self.stream_cache)
            .field("skip_errors", &self.skip_errors)
            .field("process", &self.process.is_some())
            .finish()
    }
}

impl From<&DatasetConfig> for StreamOptions {
    fn from(config: &DatasetConfig) -> Self {
        Self {
            shuffle: config.shuffle,
            seed: config.seed,
            stream: config.stream,
            stream_cache: config.stream_cache,
            skip_errors: config.skip_errors,
            process: None,
        }
    }
}

impl StreamOptions {
    pub fn with_process(mut self, process: ProcessFn) -> Self {
        self.process = Some(process);
        self
    }

    /// Fetch policy implied by `stream` and `stream_cache`.
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy::new(self.stream, self.stream_cache)
    }
}

/// A restartable source of examples for one split.
///
/// Opening a source does not touch the manifest. Every call to
/// [`SplitSource::examples`] reads the manifest again and starts from its
/// first row.
#[derive(Clone)]
pub struct SplitSource {
    split: Split,
    manifest: PathBuf,
    resolver: FileResolver,
    processing: Processing,
    /// Fixed fetch mode; when `None` it comes from the stream options.
    fetch: Option<FetchMode>,
    schema: Option<FeatureSchema>,
}

impl SplitSource {
    pub fn new(
        split: Split,
        manifest: impl Into<PathBuf>,
        resolver: FileResolver,
        processing: Processing,
    ) -> Self {
        Self {
            split,
            manifest: manifest.into(),
            resolver,
            processing,
            fetch: None,
            schema: None,
        }
    }

    /// Ignores `stream`/`stream_cache` and always fetches with `mode`.
    pub fn with_fetch_mode(mut self, mode: FetchMode) -> Self {
        self.fetch = Some(mode);
        self
    }

    /// Rejects examples that do not match `schema`.
    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest
    }

    /// Fetch mode used for an iteration with `options`.
    pub fn fetch_mode(&self, options: &StreamOptions) -> FetchMode {
        self.fetch
            .unwrap_or_else(|| FetchMode::Cached(options.fetch_policy()))
    }

    /// Number of manifest rows. No file is resolved.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::FileAccess` if the manifest cannot be read.
    pub fn len(&self) -> Result<usize> {
        Ok(Manifest::open(&self.manifest)?.len())
    }

    /// Starts a fresh pass over the split.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::FileAccess` if the manifest cannot be read.
    /// Malformed rows surface as `FloodsError::Format` items of the iterator.
    pub fn examples(&self, options: &StreamOptions) -> Result<Examples> {
        let mut manifest = Manifest::open(&self.manifest)?;
        if options.shuffle {
            let mut rng = options
                .seed
                .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
            manifest.shuffle(&mut rng);
        }

        Ok(Examples {
            split: self.split,
            entries: manifest.into_entries(),
            resolver: self.resolver.clone(),
            fetch: self.fetch_mode(options),
            processing: self.processing,
            schema: self.schema,
            process: options.process.clone(),
            skip_errors: options.skip_errors,
            position: 0,
            skipped: 0,
            failed: false,
        })
    }
}

impl fmt::Debug for SplitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitSource")
            .field("split", &self.split)
            .field("manifest", &self.manifest)
            .field("processing", &self.processing)
            .field("fetch", &self.fetch)
            .field("schema", &self.schema)
            .finish()
    }
}

/// An iterator over the examples of one pass through a split.
///
/// The first error ends the pass unless errors are being skipped, in which
/// case the failing row is logged and the next row is tried.
pub struct Examples {
    split: Split,
    entries: ManifestEntries,
    resolver: FileResolver,
    fetch: FetchMode,
    processing: Processing,
    schema: Option<FeatureSchema>,
    process: Option<ProcessFn>,
    skip_errors: bool,
    position: usize,
    skipped: usize,
    failed: bool,
}

impl Examples {
    /// Number of rows skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Builds the example for the next row.
    ///
    /// Returns `Ok(None)` once the manifest is exhausted.
    pub fn next_example(&mut self) -> Result<Option<Example>> {
        let Some(entry) = self.entries.next() else {
            return Ok(None);
        };
        let index = self.position;
        self.position += 1;
        self.build(index, entry?).map(Some)
    }

    fn build(&self, index: usize, entry: ManifestEntry) -> Result<Example> {
        let image = self.resolver.load_with(S1_HAND_DIR, &entry.image, self.fetch)?;
        let mask = self.resolver.load_with(LABEL_HAND_DIR, &entry.mask, self.fetch)?;

        let mut example = Example {
            index,
            entry,
            image: image.into_parts().0,
            mask: to_labels(mask.data()),
        };
        self.processing.apply(&mut example);

        if let Some(process) = &self.process {
            example = process(example)?;
        }
        if let Some(schema) = &self.schema {
            schema.validate(&example)?;
        }
        Ok(example)
    }
}

impl Iterator for Examples {
    type Item = Result<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            match self.next_example() {
                Ok(Some(example)) => return Some(Ok(example)),
                Ok(None) => return None,
                Err(e) if self.skip_errors => {
                    self.skipped += 1;
                    tracing::warn!(
                        split = %self.split,
                        row = self.position - 1,
                        error = %e,
                        "skipping example"
                    );
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        (0, self.entries.size_hint().1)
    }
}

impl std::iter::FusedIterator for Examples {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheWriteMode;
    use crate::error::FloodsError;
    use crate::testing::{self, CountingRemote};
    use std::collections::HashSet;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    const SIZE: usize = 8;

    fn source(context: &TempDir, remote: Arc<CountingRemote>, rows: usize) -> SplitSource {
        let manifest = context.path().join("train_data.csv");
        testing::write_manifest(&manifest, rows);
        let resolver = testing::resolver(context.path(), remote, CacheWriteMode::Raw);
        SplitSource::new(Split::Train, manifest, resolver, Processing::Raw)
    }

    fn streaming() -> StreamOptions {
        StreamOptions {
            stream: true,
            ..StreamOptions::default()
        }
    }

    #[test]
    fn test_len_does_not_resolve_files() {
        let context = TempDir::new().unwrap();
        let remote = Arc::new(CountingRemote::default());
        let source = source(&context, remote.clone(), 5);

        assert_eq!(source.len().unwrap(), 5);
        assert_eq!(remote.call_count(), 0);
    }

    #[test]
    fn test_yields_one_example_per_row() {
        let context = TempDir::new().unwrap();
        testing::cache_pairs(context.path(), 3, SIZE);
        let source = source(&context, Arc::new(CountingRemote::default()), 3);

        let examples: Vec<Example> = source
            .examples(&StreamOptions::default())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(examples.len(), source.len().unwrap());
        for (i, example) in examples.iter().enumerate() {
            assert_eq!(example.index, i);
            assert_eq!(example.entry.image, testing::pair_names(i).0);
            assert_eq!(example.image.dim(), (SIZE, SIZE, 2));
            assert_eq!(example.mask.dim(), (SIZE, SIZE, 1));
            // Raw processing keeps the no-data sentinel
            assert_eq!(example.mask[[0, 0, 0]], -1);
        }
    }

    #[test]
    fn test_each_call_restarts() {
        let context = TempDir::new().unwrap();
        testing::cache_pairs(context.path(), 4, SIZE);
        let source = source(&context, Arc::new(CountingRemote::default()), 4);

        let mut first = source.examples(&StreamOptions::default()).unwrap();
        first.next().unwrap().unwrap();
        first.next().unwrap().unwrap();

        let second = source.examples(&StreamOptions::default()).unwrap();
        let indices: Vec<usize> = second.map(|e| e.unwrap().index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_shuffle_yields_same_pairs() {
        let context = TempDir::new().unwrap();
        testing::cache_pairs(context.path(), 6, SIZE);
        let source = source(&context, Arc::new(CountingRemote::default()), 6);

        let pairs = |options: &StreamOptions| -> HashSet<(String, String)> {
            source
                .examples(options)
                .unwrap()
                .map(|e| {
                    let e = e.unwrap();
                    (e.entry.image, e.entry.mask)
                })
                .collect()
        };

        let ordered = pairs(&StreamOptions::default());
        let shuffled = pairs(&StreamOptions {
            shuffle: true,
            seed: Some(42),
            ..StreamOptions::default()
        });
        assert_eq!(ordered.len(), 6);
        assert_eq!(ordered, shuffled);
    }

    #[test]
    fn test_missing_file_without_stream_stops_iteration() {
        let context = TempDir::new().unwrap();
        testing::cache_pairs(context.path(), 1, SIZE);
        let remote = Arc::new(CountingRemote::default());
        let source = source(&context, remote.clone(), 3);

        let mut examples = source.examples(&StreamOptions::default()).unwrap();
        assert!(examples.next().unwrap().is_ok());
        let err = examples.next().unwrap().unwrap_err();
        assert!(matches!(err, FloodsError::NotAccessible { .. }));
        assert!(examples.next().is_none());
        assert_eq!(remote.call_count(), 0);
    }

    #[test]
    fn test_stream_fetches_and_caches() {
        let context = TempDir::new().unwrap();
        let remote = Arc::new(CountingRemote::default());
        testing::publish_pairs(&remote, 2, SIZE);
        let source = source(&context, remote.clone(), 2);

        assert_eq!(source.examples(&streaming()).unwrap().count(), 2);
        assert_eq!(remote.call_count(), 4);

        // Everything is cached now; a second pass stays local
        let count = source
            .examples(&StreamOptions::default())
            .unwrap()
            .filter(|e| e.is_ok())
            .count();
        assert_eq!(count, 2);
        assert_eq!(remote.call_count(), 4);
    }

    #[test]
    fn test_stream_without_cache_leaves_context_untouched() {
        let context = TempDir::new().unwrap();
        let remote = Arc::new(CountingRemote::default());
        testing::publish_pairs(&remote, 2, SIZE);
        let source = source(&context, remote.clone(), 2);

        let options = StreamOptions {
            stream_cache: false,
            ..streaming()
        };
        assert!(source.examples(&options).unwrap().all(|e| e.is_ok()));
        assert!(!context.path().join("v1.1").exists());
    }

    #[test]
    fn test_malformed_row_stops_at_that_row() {
        let context = TempDir::new().unwrap();
        testing::cache_pairs(context.path(), 3, SIZE);
        let source = source(&context, Arc::new(CountingRemote::default()), 0);

        let (a, am) = testing::pair_names(0);
        let (b, bm) = testing::pair_names(1);
        let (c, cm) = testing::pair_names(2);
        fs::write(
            source.manifest_path(),
            format!("{a},{am}\n{b},{bm},extra\n{c},{cm}\n"),
        )
        .unwrap();

        let results: Vec<Result<Example>> =
            source.examples(&StreamOptions::default()).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(FloodsError::Format { line: 2, .. })));
    }

    #[test]
    fn test_skip_errors_continues_past_bad_rows() {
        let context = TempDir::new().unwrap();
        testing::cache_pairs(context.path(), 3, SIZE);
        let source = source(&context, Arc::new(CountingRemote::default()), 4);

        let mut examples = source
            .examples(&StreamOptions {
                skip_errors: true,
                ..StreamOptions::default()
            })
            .unwrap();
        let indices: Vec<usize> = examples.by_ref().map(|e| e.unwrap().index).collect();

        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(examples.skipped(), 1);
    }

    #[test]
    fn test_process_hook_runs_after_builtin_processing() {
        let context = TempDir::new().unwrap();
        testing::cache_pairs(context.path(), 1, SIZE);
        let manifest = context.path().join("train_data.csv");
        testing::write_manifest(&manifest, 1);
        let resolver = testing::resolver(
            context.path(),
            Arc::new(CountingRemote::default()),
            CacheWriteMode::Raw,
        );
        let source = SplitSource::new(Split::Train, manifest, resolver, Processing::Normalized);

        let process: ProcessFn = Arc::new(|mut example: Example| -> Result<Example> {
            assert_eq!(example.mask[[0, 0, 0]], 255);
            example.mask.mapv_inplace(|v| v.min(1));
            Ok(example)
        });
        let options = StreamOptions::default().with_process(process);

        let example = source.examples(&options).unwrap().next().unwrap().unwrap();
        assert_eq!(example.mask[[0, 0, 0]], 1);
        assert!(example.image.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_process_hook_error_is_propagated() {
        let context = TempDir::new().unwrap();
        testing::cache_pairs(context.path(), 2, SIZE);
        let source = source(&context, Arc::new(CountingRemote::default()), 2);

        let options = StreamOptions::default()
            .with_process(Arc::new(|_: Example| -> Result<Example> {
                Err(FloodsError::schema(0, "rejected"))
            }));
        let results: Vec<_> = source.examples(&options).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(FloodsError::Schema { .. })));
    }

    #[test]
    fn test_fixed_fetch_mode_overrides_options() {
        let context = TempDir::new().unwrap();
        let remote = Arc::new(CountingRemote::default());
        testing::publish_pairs(&remote, 1, SIZE);
        let source = source(&context, remote.clone(), 1).with_fetch_mode(FetchMode::Uncached);

        assert_eq!(source.fetch_mode(&StreamOptions::default()), FetchMode::Uncached);
        assert!(source
            .examples(&StreamOptions::default())
            .unwrap()
            .all(|e| e.is_ok()));
        assert_eq!(remote.call_count(), 2);
        assert!(!context.path().join("v1.1").exists());
    }

    #[test]
    fn test_missing_manifest() {
        let context = TempDir::new().unwrap();
        let resolver = testing::resolver(
            context.path(),
            Arc::new(CountingRemote::default()),
            CacheWriteMode::Raw,
        );
        let source = SplitSource::new(
            Split::Test,
            context.path().join("test_data.csv"),
            resolver,
            Processing::Raw,
        );

        assert!(matches!(source.len(), Err(FloodsError::FileAccess { .. })));
        assert!(matches!(
            source.examples(&StreamOptions::default()),
            Err(FloodsError::FileAccess { .. })
        ));
    }
}
