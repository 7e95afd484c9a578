//! 8/16-bit single-channel raster and tuning parameters for the adaptive
//! codec.

use crate::image::geom::IPoint;
use crate::utils::error::{CodecError, Result};

/// The sample storage of a [`JImage`]: exactly one of an 8-bit or a 16-bit
/// row-major buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplePlane {
    Bytes(Vec<u8>),
    Words(Vec<u16>),
}

impl SamplePlane {
    pub fn len(&self) -> usize {
        match self {
            SamplePlane::Bytes(b) => b.len(),
            SamplePlane::Words(w) => w.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bits per sample: 8 or 16.
    pub fn component_size(&self) -> u32 {
        match self {
            SamplePlane::Bytes(_) => 8,
            SamplePlane::Words(_) => 16,
        }
    }
}

/// A single-channel raster whose samples are either bytes or 16-bit words.
///
/// `depth` is the number of channels and must be 1; the field exists because
/// the serialized header carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JImage {
    pub size: IPoint,
    pub depth: u8,
    pub plane: SamplePlane,
}

impl JImage {
    /// Construct an 8-bit image from a row-major sample buffer.
    pub fn from_bytes(size: IPoint, samples: Vec<u8>) -> Result<Self> {
        Self::build(size, SamplePlane::Bytes(samples))
    }

    /// Construct a 16-bit image from a row-major sample buffer.
    pub fn from_words(size: IPoint, samples: Vec<u16>) -> Result<Self> {
        Self::build(size, SamplePlane::Words(samples))
    }

    fn build(size: IPoint, plane: SamplePlane) -> Result<Self> {
        if size.x < 1 || size.y < 1 {
            return Err(CodecError::InvalidDimensions(format!(
                "empty image size {}x{}",
                size.x, size.y
            )));
        }
        let expected = size.product() as usize;
        if plane.len() != expected {
            return Err(CodecError::InvalidDimensions(format!(
                "sample buffer holds {} samples, {}x{} image needs {}",
                plane.len(),
                size.x,
                size.y,
                expected
            )));
        }
        Ok(Self {
            size,
            depth: 1,
            plane,
        })
    }

    pub fn width(&self) -> i32 {
        self.size.x
    }

    pub fn height(&self) -> i32 {
        self.size.y
    }

    /// Bits per sample: 8 or 16.
    pub fn component_size(&self) -> u32 {
        self.plane.component_size()
    }
}

/// Tuning parameters for the adaptive codec.
///
/// `ratio` is an output-only diagnostic (compressed size over raw size); it
/// is never consumed by decode. See [`crate::codec::felics::compression_ratio`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompressParam {
    /// Golomb-Rice parameter M for escape coding; must be positive.
    pub golomb: u32,
    /// Fraction in [0,1] by which the two-neighbor prediction interval is
    /// widened on each side, as a fraction of `golomb`.
    pub padding: f32,
    /// Diagnostic compression ratio from the most recent encode, if the
    /// caller chose to record it.
    pub ratio: f32,
}

impl Default for CompressParam {
    fn default() -> Self {
        Self {
            golomb: 180,
            padding: 0.25,
            ratio: 0.0,
        }
    }
}
