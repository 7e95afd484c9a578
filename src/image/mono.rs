//! 16-bit single-channel raster used by the RAX codec.

use crate::image::geom::IPoint;
use crate::utils::error::{CodecError, Result};

/// One past the maximum valid sample value (samples occupy the low 15 bits).
pub const MAX_PIXEL_VALUE: i32 = 0x8000;

/// A single-channel raster of 16-bit samples, stored row-major.
///
/// The value 0 conventionally means "no data / masked"; valid samples occupy
/// the low 15 bits. A sample with the sign bit set is a defect to be cleaned
/// up with [`clamp_to_15_bit`] before encoding, not a legitimate value.
///
/// `offset` is an origin translation carried for downstream bookkeeping; the
/// codec itself never reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoImage {
    pub size: IPoint,
    pub offset: IPoint,
    pub pixels: Vec<i16>,
}

impl MonoImage {
    /// Construct an image from a row-major pixel buffer.
    ///
    /// The buffer length must equal `size.x * size.y`, and the area must be
    /// nonzero.
    pub fn new(size: IPoint, pixels: Vec<i16>) -> Result<Self> {
        if size.x < 1 || size.y < 1 {
            return Err(CodecError::InvalidDimensions(format!(
                "empty image size {}x{}",
                size.x, size.y
            )));
        }
        let expected = size.product() as usize;
        if pixels.len() != expected {
            return Err(CodecError::InvalidDimensions(format!(
                "pixel buffer holds {} samples, {}x{} image needs {}",
                pixels.len(),
                size.x,
                size.y,
                expected
            )));
        }
        Ok(Self {
            size,
            offset: IPoint::ZERO,
            pixels,
        })
    }

    /// Construct an image with all pixels zero (masked).
    pub fn blank(size: IPoint) -> Result<Self> {
        Self::constant(size, 0)
    }

    /// Construct an image filled with a single value.
    pub fn constant(size: IPoint, value: i16) -> Result<Self> {
        if size.x < 1 || size.y < 1 {
            return Err(CodecError::InvalidDimensions(format!(
                "empty image size {}x{}",
                size.x, size.y
            )));
        }
        let pixels = vec![value; size.product() as usize];
        Self::new(size, pixels)
    }

    /// Attach an origin offset (bookkeeping only).
    pub fn with_offset(mut self, offset: IPoint) -> Self {
        self.offset = offset;
        self
    }

    pub fn width(&self) -> i32 {
        self.size.x
    }

    pub fn height(&self) -> i32 {
        self.size.y
    }

    /// Number of pixels that are not the "no data" value 0.
    pub fn non_masked_pixel_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p != 0).count()
    }
}

/// Clamp a sample to the 15-bit range: hot pixels with the sign bit set are
/// pulled down to the maximum representable value.
pub fn clamp_to_15_bit(pixel: i16) -> i16 {
    if pixel < 0 {
        (MAX_PIXEL_VALUE - 1) as i16
    } else {
        pixel
    }
}
