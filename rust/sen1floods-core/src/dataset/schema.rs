// rust/sen1floods-core/src/dataset/schema.rs

//! Declared output schema of the framework-facing dataset.

use crate::error::{FloodsError, Result};

use super::traits::Example;

/// Element type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Float32,
    Int32,
}

impl DType {
    pub fn as_str(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Int32 => "int32",
        }
    }
}

/// A fixed-shape 3-D array feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySpec {
    pub shape: [usize; 3],
    pub dtype: DType,
}

impl ArraySpec {
    fn check(&self, index: usize, name: &str, dim: (usize, usize, usize)) -> Result<()> {
        let actual = [dim.0, dim.1, dim.2];
        if actual != self.shape {
            return Err(FloodsError::schema(
                index,
                format!("{name} has shape {actual:?}, expected {:?}", self.shape),
            ));
        }
        Ok(())
    }
}

/// Features every example carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSchema {
    pub image: ArraySpec,
    pub mask: ArraySpec,
}

impl FeatureSchema {
    /// Two-band 512x512 backscatter tiles with single-band integer masks.
    pub const SEN1FLOODS11: Self = Self {
        image: ArraySpec {
            shape: [512, 512, 2],
            dtype: DType::Float32,
        },
        mask: ArraySpec {
            shape: [512, 512, 1],
            dtype: DType::Int32,
        },
    };

    /// Checks an example's array shapes against the schema.
    ///
    /// Element types are fixed by [`Example`] itself.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::Schema` naming the first mismatched feature.
    pub fn validate(&self, example: &Example) -> Result<()> {
        self.image.check(example.index, "image", example.image.dim())?;
        self.mask.check(example.index, "mask", example.mask.dim())
    }
}

/// Description of a dataset as reported to a host framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub features: FeatureSchema,
}
