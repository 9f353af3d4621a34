// rust/sen1floods-core/src/testing.rs

//! Shared test doubles and fixture builders.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use ndarray::Array3;

use crate::config::{CacheWriteMode, StorageConfig};
use crate::error::{FloodsError, Result};
use crate::raster::{Raster, RasterCodec, SampleType, TiffCodec};
use crate::remote::RemoteStore;
use crate::resolver::{FileResolver, LABEL_HAND_DIR, S1_HAND_DIR};
use crate::storage::LocalStorage;

/// In-memory remote store that records every read.
#[derive(Default)]
pub(crate) struct CountingRemote {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
}

impl CountingRemote {
    pub(crate) fn with_object(self, path: &str, bytes: Vec<u8>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub(crate) fn insert(&self, path: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RemoteStore for CountingRemote {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(path.to_string());
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| FloodsError::remote_fetch(path, "no such object"))
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

/// Encodes a `(size, size, 2)` f32 tile whose samples span past both clip bounds.
pub(crate) fn tile_bytes(size: usize, seed: f32) -> Vec<u8> {
    let data = Array3::from_shape_fn((size, size, 2), |(r, c, b)| {
        seed + (r as f32 - c as f32) * 7.5 - b as f32 * 20.0
    });
    encode(data, SampleType::F32)
}

/// Encodes a `(size, size, 1)` i16 mask with a no-data pixel in the corner.
pub(crate) fn mask_bytes(size: usize) -> Vec<u8> {
    let mut data = Array3::from_shape_fn((size, size, 1), |(r, c, _)| ((r + c) % 2) as f32);
    data[[0, 0, 0]] = -1.0;
    encode(data, SampleType::I16)
}

fn encode(data: Array3<f32>, sample_type: SampleType) -> Vec<u8> {
    let raster = Raster::from_array(data, sample_type).unwrap();
    TiffCodec::new().encode(&raster).unwrap()
}

/// Image and mask file names for row `i`.
pub(crate) fn pair_names(i: usize) -> (String, String) {
    (format!("Tile_{i}_S1Hand.tif"), format!("Tile_{i}_LabelHand.tif"))
}

/// Writes a manifest listing `rows` pairs and returns its contents.
pub(crate) fn write_manifest(path: &Path, rows: usize) -> String {
    let content: String = (0..rows)
        .map(|i| {
            let (image, mask) = pair_names(i);
            format!("{image},{mask}\n")
        })
        .collect();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, &content).unwrap();
    content
}

/// Publishes `rows` image/mask pairs on the remote.
pub(crate) fn publish_pairs(remote: &CountingRemote, rows: usize, size: usize) {
    for i in 0..rows {
        let (image, mask) = pair_names(i);
        remote.insert(
            &FileResolver::remote_path(S1_HAND_DIR, &image),
            tile_bytes(size, i as f32),
        );
        remote.insert(&FileResolver::remote_path(LABEL_HAND_DIR, &mask), mask_bytes(size));
    }
}

/// Writes `rows` image/mask pairs straight into a local cache.
pub(crate) fn cache_pairs(context: &Path, rows: usize, size: usize) {
    for i in 0..rows {
        let (image, mask) = pair_names(i);
        let image_path = context.join(S1_HAND_DIR).join(image);
        let mask_path = context.join(LABEL_HAND_DIR).join(mask);
        fs::create_dir_all(image_path.parent().unwrap()).unwrap();
        fs::create_dir_all(mask_path.parent().unwrap()).unwrap();
        fs::write(image_path, tile_bytes(size, i as f32)).unwrap();
        fs::write(mask_path, mask_bytes(size)).unwrap();
    }
}

pub(crate) fn resolver(
    context: &Path,
    remote: Arc<dyn RemoteStore>,
    write_mode: CacheWriteMode,
) -> FileResolver {
    let local = LocalStorage::new(context, &StorageConfig::default());
    let codec: Arc<dyn RasterCodec> = Arc::new(TiffCodec::new());
    FileResolver::new(Arc::new(local), remote, codec, write_mode)
}
