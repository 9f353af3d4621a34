//! Subcommand implementations.

use std::error::Error;
use std::io::Write;

use sen1floods_core::dataset::{DatasetSource, Split, SplitSource, StreamOptions};
use sen1floods_core::DatasetLoader;

type CommandResult = Result<(), Box<dyn Error>>;

/// Opens `split` from either adapter with the options the loader's
/// configuration implies.
fn open(
    loader: &DatasetLoader,
    split: Split,
    framework: bool,
    no_cache: bool,
) -> Result<(SplitSource, StreamOptions), Box<dyn Error>> {
    let config = loader.config();
    if framework {
        let builder = loader.builder_with(no_cache || config.no_cache);
        let stream = StreamOptions {
            skip_errors: config.dataset.skip_errors,
            ..StreamOptions::default()
        };
        Ok((builder.open_split(split)?, stream))
    } else {
        let mut stream = loader.stream_options();
        if no_cache {
            stream.stream_cache = false;
        }
        Ok((loader.flood_dataset().open_split(split)?, stream))
    }
}

pub fn splits(loader: &DatasetLoader, out: &mut impl Write) -> CommandResult {
    let dataset = loader.flood_dataset();
    for split in dataset.list_splits() {
        match dataset.open_split(split).and_then(|source| source.len()) {
            Ok(rows) => writeln!(out, "{split:<12}{rows:>8} examples")?,
            Err(e) => writeln!(out, "{split:<12} unavailable: {e}")?,
        }
    }
    Ok(())
}

/// Iterates a split with remote fetch enabled so that every file it
/// references ends up in the local cache (unless `no_cache` is set).
pub fn warm(
    loader: &DatasetLoader,
    split: Split,
    framework: bool,
    no_cache: bool,
    out: &mut impl Write,
) -> CommandResult {
    let (source, mut options) = open(loader, split, framework, no_cache)?;
    options.stream = true;
    options.shuffle = false;

    let total = source.len()?;
    tracing::info!("Warming {} from {} ({} rows)", split, source.manifest_path().display(), total);

    let mut examples = source.examples(&options)?;
    let mut warmed = 0usize;
    for example in examples.by_ref() {
        example?;
        warmed += 1;
    }

    writeln!(
        out,
        "{split}: {warmed} of {total} examples materialized, {} skipped",
        examples.skipped()
    )?;
    Ok(())
}

pub fn inspect(
    loader: &DatasetLoader,
    split: Split,
    limit: usize,
    framework: bool,
    out: &mut impl Write,
) -> CommandResult {
    let (source, options) = open(loader, split, framework, false)?;

    for example in source.examples(&options)?.take(limit) {
        let example = example?;
        let (image_min, image_max) = range(example.image.iter().copied());
        let (mask_min, mask_max) = range(example.mask.iter().map(|&v| v as f32));
        writeln!(
            out,
            "#{:<4} {}  image {:?} [{image_min:.4}, {image_max:.4}]  mask {:?} [{mask_min}, {mask_max}]",
            example.index,
            example.entry.image,
            example.image.dim(),
            example.mask.dim(),
        )?;
    }
    Ok(())
}

/// Smallest and largest finite value, or `(NaN, NaN)` if there is none.
fn range(values: impl Iterator<Item = f32>) -> (f32, f32) {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f32, f32)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })
        .unwrap_or((f32::NAN, f32::NAN))
}
