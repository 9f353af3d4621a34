// rust/sen1floods-core/src/processing.rs

//! Per-example transforms.

use std::sync::Arc;

use ndarray::Array3;

use crate::dataset::Example;
use crate::error::Result;

/// Lower bound of backscatter values kept by [`normalize_image`].
pub const CLIP_MIN: f32 = -50.0;
/// Upper bound of backscatter values kept by [`normalize_image`].
pub const CLIP_MAX: f32 = 1.0;

/// Mask value marking pixels without a label.
pub const MASK_NO_DATA: i32 = -1;
/// Value the no-data sentinel is rewritten to, ignored by the loss.
pub const MASK_IGNORE: i32 = 255;

/// Caller-supplied transform applied to each assembled example.
pub type ProcessFn = Arc<dyn Fn(Example) -> Result<Example> + Send + Sync>;

/// Built-in transforms an adapter applies before any [`ProcessFn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Processing {
    /// Decoded values are passed through.
    #[default]
    Raw,
    /// Images are normalized and mask sentinels remapped.
    Normalized,
}

impl Processing {
    pub fn apply(self, example: &mut Example) {
        if self == Processing::Normalized {
            normalize_image(&mut example.image);
            remap_mask(&mut example.mask);
        }
    }
}

/// Maps one backscatter sample into `[0, 1]`.
///
/// Non-finite values count as zero, then the value is clipped to
/// `[CLIP_MIN, CLIP_MAX]` and rescaled linearly.
pub fn normalize_sample(value: f32) -> f32 {
    let value = if value.is_finite() { value } else { 0.0 };
    (value.clamp(CLIP_MIN, CLIP_MAX) - CLIP_MIN) / (CLIP_MAX - CLIP_MIN)
}

pub fn normalize_image(image: &mut Array3<f32>) {
    image.mapv_inplace(normalize_sample);
}

pub fn remap_mask(mask: &mut Array3<i32>) {
    mask.mapv_inplace(|v| if v == MASK_NO_DATA { MASK_IGNORE } else { v });
}

/// Converts decoded mask samples to integer labels.
///
/// Fractional values truncate toward zero and non-finite values become 0.
pub fn to_labels(samples: &Array3<f32>) -> Array3<i32> {
    samples.mapv(|v| v as i32)
}
