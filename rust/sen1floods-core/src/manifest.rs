// rust/sen1floods-core/src/manifest.rs

//! Split manifests.
//!
//! A manifest is a header-less, comma-separated file with one
//! `<image_filename>,<mask_filename>` row per example. Every line of the file
//! is a row, blank ones included, and the whole file is read up front so that
//! its length is known before any file is resolved. Rows are only parsed when
//! consumed: a malformed row, or one that is not UTF-8, aborts iteration at
//! that row rather than at open time.

use std::path::Path;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{FloodsError, Result};

/// One example's pair of file references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManifestEntry {
    /// Image filename, relative to the image directory.
    pub image: String,
    /// Mask filename, relative to the mask directory.
    pub mask: String,
    /// 1-based line of the row in its manifest.
    pub line: u64,
}

#[derive(Debug, Clone)]
struct ManifestRow {
    line: u64,
    raw: Vec<u8>,
}

/// An in-memory split manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: Arc<Path>,
    rows: Vec<ManifestRow>,
}

impl Manifest {
    /// Reads every row of the manifest at `path`.
    ///
    /// A single newline at the end of the file does not start a row.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::FileAccess` if the file is missing or unreadable.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| FloodsError::file_access(path, e))?;

        let mut lines: Vec<&[u8]> = bytes.split(|&b| b == b'\n').collect();
        if lines.last().is_some_and(|last| last.is_empty()) {
            lines.pop();
        }

        let rows: Vec<ManifestRow> = lines
            .into_iter()
            .zip(1u64..)
            .map(|(raw, line)| ManifestRow {
                line,
                raw: raw.strip_suffix(b"\r").unwrap_or(raw).to_vec(),
            })
            .collect();

        tracing::debug!(manifest = %path.display(), rows = rows.len(), "loaded manifest");

        Ok(Self {
            path: Arc::from(path),
            rows,
        })
    }

    /// Returns the number of rows, malformed ones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Puts the rows in a uniformly random order.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.rows.shuffle(rng);
    }

    /// Validates and returns every entry in order, stopping at the first
    /// malformed row.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::Format` for the first malformed row.
    pub fn entries(&self) -> Result<Vec<ManifestEntry>> {
        self.rows
            .iter()
            .map(|row| parse_row(&self.path, row))
            .collect()
    }

    /// Consumes the manifest, validating each row as it is pulled.
    pub fn into_entries(self) -> ManifestEntries {
        ManifestEntries {
            path: self.path,
            rows: self.rows.into_iter(),
        }
    }
}

/// Iterator over validated manifest entries.
#[derive(Debug)]
pub struct ManifestEntries {
    path: Arc<Path>,
    rows: std::vec::IntoIter<ManifestRow>,
}

impl Iterator for ManifestEntries {
    type Item = Result<ManifestEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(parse_row(&self.path, &row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for ManifestEntries {}

/// Splits one line into trimmed CSV fields. A blank line has none.
fn split_fields(path: &Path, row: &ManifestRow) -> Result<csv::ByteRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(row.raw.as_slice());

    let mut record = csv::ByteRecord::new();
    reader
        .read_byte_record(&mut record)
        .map_err(|e| FloodsError::format(path, row.line, e.to_string()))?;
    Ok(record)
}

fn parse_row(path: &Path, row: &ManifestRow) -> Result<ManifestEntry> {
    let record = split_fields(path, row)?;
    if record.len() != 2 {
        return Err(FloodsError::format(
            path,
            row.line,
            format!("expected 2 fields, found {}", record.len()),
        ));
    }

    let image = field(path, row.line, "image", &record[0])?;
    let mask = field(path, row.line, "mask", &record[1])?;

    Ok(ManifestEntry {
        image,
        mask,
        line: row.line,
    })
}

fn field(path: &Path, line: u64, column: &str, bytes: &[u8]) -> Result<String> {
    let name = std::str::from_utf8(bytes).map_err(|e| {
        FloodsError::format(path, line, format!("{column} filename is not UTF-8: {e}"))
    })?;
    check_filename(path, line, column, name)?;
    Ok(name.to_string())
}

fn check_filename(path: &Path, line: u64, column: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FloodsError::format(path, line, format!("empty {column} filename")));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(FloodsError::format(
            path,
            line,
            format!("{column} filename '{name}' must be a plain file name"),
        ));
    }
    Ok(())
}
