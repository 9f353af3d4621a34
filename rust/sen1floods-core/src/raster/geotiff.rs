// rust/sen1floods-core/src/raster/geotiff.rs

//! TIFF codec for Sentinel-1 tiles and hand-labelled masks.
//!
//! Decoding accepts strip or tiled, pixel-interleaved TIFFs. Single-band
//! rasters of any sample type decode, as do two-band float tiles; the `tiff`
//! decoder rejects other multi-band layouts. Encoding writes exactly the
//! layouts it can read back, as one uncompressed, pixel-interleaved strip in
//! the profile's sample type.

use std::io::Cursor;

use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

use super::{Raster, RasterCodec, RasterProfile, SampleType};
use crate::error::{FloodsError, Result};

const COMPRESSION_NONE: u16 = 1;
const PHOTOMETRIC_BLACK_IS_ZERO: u16 = 1;
const PLANAR_CHUNKY: u16 = 1;
const PLANAR_SEPARATE: u16 = 2;

const SAMPLE_FORMAT_UINT: u16 = 1;
const SAMPLE_FORMAT_INT: u16 = 2;
const SAMPLE_FORMAT_IEEEFP: u16 = 3;

/// Codec for baseline TIFF/GeoTIFF rasters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffCodec;

impl TiffCodec {
    pub fn new() -> Self {
        Self
    }
}

fn tiff_error(context: &'static str) -> impl Fn(tiff::TiffError) -> FloodsError {
    move |e| FloodsError::codec(format!("{context}: {e}"))
}

/// Widens decoded samples to `f32`, remembering the on-disk sample type.
fn widen(image: DecodingResult) -> Result<(Vec<f32>, SampleType)> {
    let widened = match image {
        DecodingResult::U8(v) => (v.into_iter().map(f32::from).collect(), SampleType::U8),
        DecodingResult::U16(v) => (v.into_iter().map(f32::from).collect(), SampleType::U16),
        DecodingResult::U32(v) => (v.into_iter().map(|s| s as f32).collect(), SampleType::U32),
        DecodingResult::I8(v) => (v.into_iter().map(f32::from).collect(), SampleType::I8),
        DecodingResult::I16(v) => (v.into_iter().map(f32::from).collect(), SampleType::I16),
        DecodingResult::I32(v) => (v.into_iter().map(|s| s as f32).collect(), SampleType::I32),
        DecodingResult::F32(v) => (v, SampleType::F32),
        DecodingResult::F64(v) => (v.into_iter().map(|s| s as f32).collect(), SampleType::F64),
        DecodingResult::U64(_) | DecodingResult::I64(_) => {
            return Err(FloodsError::codec("64-bit integer samples are not supported"));
        }
        DecodingResult::F16(_) => {
            return Err(FloodsError::codec("16-bit float samples are not supported"));
        }
    };
    Ok(widened)
}

impl RasterCodec for TiffCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Raster> {
        let mut decoder =
            Decoder::new(Cursor::new(bytes)).map_err(tiff_error("failed to read TIFF header"))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(tiff_error("failed to read TIFF dimensions"))?;
        let planar = match decoder
            .find_tag(Tag::PlanarConfiguration)
            .map_err(tiff_error("failed to read planar configuration"))?
        {
            Some(value) => value
                .into_u16()
                .map_err(tiff_error("invalid planar configuration"))?,
            None => PLANAR_CHUNKY,
        };

        let image = decoder
            .read_image()
            .map_err(tiff_error("failed to decode TIFF image"))?;
        let (samples, sample_type) = widen(image)?;

        let (height, width) = (height as usize, width as usize);
        let pixels = height * width;
        if pixels == 0 || samples.len() % pixels != 0 {
            return Err(FloodsError::codec(format!(
                "{} samples cannot fill a {height}x{width} raster",
                samples.len()
            )));
        }
        let bands = samples.len() / pixels;

        if planar == PLANAR_SEPARATE && bands > 1 {
            return Err(FloodsError::codec("planar multi-band TIFFs are not supported"));
        }

        let data = Array3::from_shape_vec((height, width, bands), samples).map_err(|e| {
            FloodsError::codec_with_source("decoded samples do not form a raster", e)
        })?;

        Raster::from_array(data, sample_type)
    }

    fn encode(&self, raster: &Raster) -> Result<Vec<u8>> {
        let data = raster.data();
        let profile = raster.profile();
        check_encodable(profile)?;

        match profile.sample_type {
            SampleType::U8 => write_tiff(&convert(data, |v| v as u8), profile),
            SampleType::U16 => write_tiff(&convert(data, |v| v as u16), profile),
            SampleType::U32 => write_tiff(&convert(data, |v| v as u32), profile),
            SampleType::I8 => write_tiff(&convert(data, |v| v as i8), profile),
            SampleType::I16 => write_tiff(&convert(data, |v| v as i16), profile),
            SampleType::I32 => write_tiff(&convert(data, |v| v as i32), profile),
            SampleType::F32 => write_tiff(&convert(data, |v| v), profile),
            SampleType::F64 => write_tiff(&convert(data, f64::from), profile),
        }
    }
}

/// Single-band rasters of any sample type, or two-band `f32` tiles.
fn check_encodable(profile: &RasterProfile) -> Result<()> {
    match (profile.bands, profile.sample_type) {
        (1, _) | (2, SampleType::F32) => Ok(()),
        (bands, sample_type) => Err(FloodsError::codec(format!(
            "cannot encode {bands}-band {sample_type:?} rasters"
        ))),
    }
}

fn sample_format(sample_type: SampleType) -> u16 {
    if sample_type.is_float() {
        SAMPLE_FORMAT_IEEEFP
    } else if sample_type.is_signed() {
        SAMPLE_FORMAT_INT
    } else {
        SAMPLE_FORMAT_UINT
    }
}

/// Flattens a `(height, width, bands)` array into interleaved samples.
fn convert<T>(data: &Array3<f32>, cast: impl Fn(f32) -> T) -> Vec<T> {
    data.iter().map(|&v| cast(v)).collect()
}

fn write_tiff<T>(samples: &[T], profile: &RasterProfile) -> Result<Vec<u8>>
where
    [T]: TiffValue,
{
    let bands = usize::from(profile.bands);
    let bits = vec![profile.sample_type.bits(); bands];
    let formats = vec![sample_format(profile.sample_type); bands];
    let byte_count = u32::try_from(std::mem::size_of_val(samples))
        .map_err(|_| FloodsError::codec("raster too large for a single TIFF strip"))?;

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder =
            TiffEncoder::new(&mut cursor).map_err(tiff_error("failed to start TIFF encoder"))?;
        let mut dir = encoder
            .new_directory()
            .map_err(tiff_error("failed to start TIFF directory"))?;

        let offset = dir
            .write_data(samples)
            .map_err(tiff_error("failed to write raster samples"))?;
        let offset = u32::try_from(offset)
            .map_err(|_| FloodsError::codec("strip offset exceeds classic TIFF range"))?;

        let tag_err = tiff_error("failed to write TIFF tags");
        dir.write_tag(Tag::ImageWidth, profile.width).map_err(&tag_err)?;
        dir.write_tag(Tag::ImageLength, profile.height).map_err(&tag_err)?;
        dir.write_tag(Tag::BitsPerSample, &bits[..]).map_err(&tag_err)?;
        dir.write_tag(Tag::Compression, COMPRESSION_NONE).map_err(&tag_err)?;
        dir.write_tag(Tag::PhotometricInterpretation, PHOTOMETRIC_BLACK_IS_ZERO)
            .map_err(&tag_err)?;
        dir.write_tag(Tag::StripOffsets, offset).map_err(&tag_err)?;
        dir.write_tag(Tag::SamplesPerPixel, profile.bands).map_err(&tag_err)?;
        dir.write_tag(Tag::RowsPerStrip, profile.height).map_err(&tag_err)?;
        dir.write_tag(Tag::StripByteCounts, byte_count).map_err(&tag_err)?;
        dir.write_tag(Tag::PlanarConfiguration, PLANAR_CHUNKY).map_err(&tag_err)?;
        dir.write_tag(Tag::SampleFormat, &formats[..]).map_err(&tag_err)?;

        dir.finish().map_err(tiff_error("failed to finish TIFF directory"))?;
    }

    Ok(cursor.into_inner())
}
