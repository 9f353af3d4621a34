// rust/sen1floods-core/src/raster/mod.rs

//! Raster decoding and encoding.
//!
//! A decoded raster is a `(height, width, bands)` array of `f32` samples plus
//! the profile needed to write it back in its original sample type. The
//! codec itself is a trait so the resolver and the adapters never depend on
//! a particular file format.

use ndarray::Array3;

use crate::error::{FloodsError, Result};

mod geotiff;

pub use geotiff::TiffCodec;

/// Storage type of a single raster sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Size of one sample in bits.
    pub fn bits(self) -> u16 {
        match self {
            SampleType::U8 | SampleType::I8 => 8,
            SampleType::U16 | SampleType::I16 => 16,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 32,
            SampleType::F64 => 64,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, SampleType::I8 | SampleType::I16 | SampleType::I32)
    }
}

/// Format metadata carried alongside decoded samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterProfile {
    pub width: u32,
    pub height: u32,
    pub bands: u16,
    pub sample_type: SampleType,
}

/// A decoded raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    data: Array3<f32>,
    profile: RasterProfile,
}

impl Raster {
    /// Builds a raster from `(height, width, bands)` samples.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the array shape disagrees with the profile.
    pub fn new(data: Array3<f32>, profile: RasterProfile) -> Result<Self> {
        let expected = (
            profile.height as usize,
            profile.width as usize,
            profile.bands as usize,
        );
        if data.dim() != expected {
            return Err(FloodsError::codec(format!(
                "array shape {:?} does not match profile {}x{}x{}",
                data.dim(),
                profile.height,
                profile.width,
                profile.bands
            )));
        }
        Ok(Self { data, profile })
    }

    /// Builds a raster whose profile is derived from the array shape.
    pub fn from_array(data: Array3<f32>, sample_type: SampleType) -> Result<Self> {
        let (height, width, bands) = data.dim();
        let profile = RasterProfile {
            width: dim_u32(width, "width")?,
            height: dim_u32(height, "height")?,
            bands: u16::try_from(bands)
                .map_err(|_| FloodsError::codec(format!("{bands} bands exceed the u16 range")))?,
            sample_type,
        };
        Self::new(data, profile)
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn profile(&self) -> &RasterProfile {
        &self.profile
    }

    pub fn into_parts(self) -> (Array3<f32>, RasterProfile) {
        (self.data, self.profile)
    }
}

fn dim_u32(value: usize, name: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| FloodsError::codec(format!("{name} {value} exceeds the u32 range")))
}

/// Converts between encoded raster bytes and decoded rasters.
pub trait RasterCodec: Send + Sync {
    /// Decodes raw file bytes.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::Codec` if the bytes are not a supported raster.
    fn decode(&self, bytes: &[u8]) -> Result<Raster>;

    /// Encodes a raster in the sample type recorded by its profile.
    ///
    /// # Errors
    ///
    /// Returns `FloodsError::Codec` if the layout cannot be written.
    fn encode(&self, raster: &Raster) -> Result<Vec<u8>>;
}
