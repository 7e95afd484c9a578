//! RAX: a byte-aligned predictive delta codec for 16-bit monochrome rasters.
//!
//! Each pixel is predicted from causal neighbors, and the residual is emitted
//! as a single signed byte. Residuals that do not fit (or that collide with
//! the reserved sentinel) escape to the raw 16-bit pixel value. The stream
//! starts with a 6-byte header:
//!
//! ```text
//! offset 0:   magic byte 0xfd
//! offset 1:   version byte, currently 1
//! offset 2-3: width  (u16, little-endian), 1..=2048
//! offset 4-5: height (u16, little-endian), 1..=2048
//! offset 6..: per-pixel: 1 residual byte, or 0x80 + raw pixel (u16 LE)
//! ```

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::image::geom::IPoint;
use crate::image::mono::MonoImage;
use crate::utils::error::{CodecError, Result};

pub const RAX_MAGIC: u8 = 0xfd;
pub const RAX_VERSION: u8 = 1;
pub const RAX_HEADER_LEN: usize = 6;

/// Largest width or height the format accepts.
pub const RAX_MAX_DIM: i32 = 2048;

/// Sentinel residual byte announcing a raw 16-bit pixel value.
const JUMP_SIGNAL: i8 = -128;

/// Seed value for the horizontal predictor on the first row.
const DEFAULT_PIXEL_VALUE: i32 = 20000;

/// Same effect as multiplying by 0.28, without floating point.
fn v1_scale(value: i32) -> i32 {
    value * 7 / 25
}

fn check_dimensions(size: IPoint) -> Result<()> {
    if size.x < 1 || size.x > RAX_MAX_DIM || size.y < 1 || size.y > RAX_MAX_DIM {
        return Err(CodecError::InvalidDimensions(format!(
            "{}x{} outside 1..={}",
            size.x, size.y, RAX_MAX_DIM
        )));
    }
    Ok(())
}

/// Predicts each pixel from its causal neighbors, in three regimes.
///
/// `h1`/`h2` are the running one-back and two-back reconstructed values on
/// the current row; the first row seeds them with a fixed default, the second
/// row with the image's first pixel, and later rows with the leading pixels
/// of the two rows above. Rows past the first blend the horizontal estimate
/// with the pixel directly above (and, from the third row on, its vertical
/// first difference).
struct RowPredictor {
    row: usize,
    h1: i32,
    h2: i32,
}

impl RowPredictor {
    /// Start a new row, given the reconstructed pixels of all previous rows.
    fn start_row(row: usize, width: usize, prior: &[i16]) -> Self {
        let (h1, h2) = match row {
            0 => (DEFAULT_PIXEL_VALUE, DEFAULT_PIXEL_VALUE),
            1 => {
                let p = prior[0] as i32;
                (p, p)
            }
            _ => {
                let offset = row * width;
                (
                    prior[offset - width] as i32,
                    prior[offset - 2 * width] as i32,
                )
            }
        };
        Self { row, h1, h2 }
    }

    /// Prediction for column `x`, given the already-reconstructed prefix.
    fn predict(&self, x: usize, width: usize, prior: &[i16]) -> i32 {
        let s = self.row * width + x;
        match self.row {
            0 => v1_scale(self.h1 - self.h2) + self.h1,
            1 => {
                let v1 = prior[s - width] as i32;
                (v1_scale(self.h1 - self.h2) + (self.h1 + v1)) / 2
            }
            _ => {
                let v1 = prior[s - width] as i32;
                let v2 = prior[s - 2 * width] as i32;
                (v1_scale((self.h1 - self.h2) + (v1 - v2)) + (self.h1 + v1)) / 2
            }
        }
    }

    /// Shift in the pixel just produced at the current column.
    fn advance(&mut self, pixel: i16) {
        self.h2 = self.h1;
        self.h1 = pixel as i32;
    }
}

/// Compress a 16-bit monochrome image to the RAX byte format.
///
/// Width and height must each be in `1..=2048`; anything else fails with
/// [`CodecError::InvalidDimensions`] before a single byte is written.
pub fn encode(image: &MonoImage) -> Result<Vec<u8>> {
    check_dimensions(image.size)?;
    let width = image.size.x as usize;
    let height = image.size.y as usize;
    let expected = width * height;
    if image.pixels.len() != expected {
        return Err(CodecError::InvalidDimensions(format!(
            "pixel buffer holds {} samples, expected {}",
            image.pixels.len(),
            expected
        )));
    }

    let mut out = Vec::with_capacity(RAX_HEADER_LEN + expected * 3 / 2);
    let mut header = [0u8; RAX_HEADER_LEN];
    header[0] = RAX_MAGIC;
    header[1] = RAX_VERSION;
    LittleEndian::write_u16(&mut header[2..4], width as u16);
    LittleEndian::write_u16(&mut header[4..6], height as u16);
    out.extend_from_slice(&header);

    let pixels = &image.pixels;
    for y in 0..height {
        let mut predictor = RowPredictor::start_row(y, width, pixels);
        for x in 0..width {
            let pixel = pixels[y * width + x];
            let prediction = predictor.predict(x, width, pixels);
            let error = pixel as i32 - prediction;
            if error >= JUMP_SIGNAL as i32 + 1 && error <= i8::MAX as i32 {
                out.push(error as u8);
            } else {
                out.push(JUMP_SIGNAL as u8);
                let mut raw = [0u8; 2];
                LittleEndian::write_u16(&mut raw, pixel as u16);
                out.extend_from_slice(&raw);
            }
            predictor.advance(pixel);
        }
    }

    debug!(
        "rax: encoded {}x{} image, {} -> {} bytes",
        width,
        height,
        expected * 2,
        out.len()
    );
    Ok(out)
}

/// Decompress a RAX byte stream, reconstructing the exact source image.
pub fn decode(bytes: &[u8]) -> Result<MonoImage> {
    if bytes.len() < RAX_HEADER_LEN {
        return Err(CodecError::MalformedHeader(format!(
            "{} bytes is shorter than the {}-byte header",
            bytes.len(),
            RAX_HEADER_LEN
        )));
    }
    if bytes[0] != RAX_MAGIC {
        return Err(CodecError::MalformedHeader(format!(
            "bad magic byte {:#04x}",
            bytes[0]
        )));
    }
    if bytes[1] != RAX_VERSION {
        return Err(CodecError::MalformedHeader(format!(
            "unexpected version {}",
            bytes[1]
        )));
    }
    let width = LittleEndian::read_u16(&bytes[2..4]) as i32;
    let height = LittleEndian::read_u16(&bytes[4..6]) as i32;
    let size = IPoint::new(width, height);
    check_dimensions(size)?;

    let width = width as usize;
    let height = height as usize;
    let mut pixels = vec![0i16; width * height];
    let mut stream = bytes[RAX_HEADER_LEN..].iter();
    let mut next_byte = || stream.next().copied().ok_or(CodecError::TruncatedStream);

    for y in 0..height {
        let mut predictor = RowPredictor::start_row(y, width, &pixels);
        for x in 0..width {
            let prediction = predictor.predict(x, width, &pixels);
            let delta = next_byte()? as i8;
            let pixel = if delta == JUMP_SIGNAL {
                let lo = next_byte()?;
                let hi = next_byte()?;
                (lo as u16 | (hi as u16) << 8) as i16
            } else {
                (prediction + delta as i32) as i16
            };
            pixels[y * width + x] = pixel;
            predictor.advance(pixel);
        }
    }

    MonoImage::new(size, pixels)
}

/// Heuristic sniff: does this byte buffer look like a RAX stream? Returns
/// the declared dimensions if so. False positives are possible on
/// adversarial input; this checks only the header, not the pixel stream.
pub fn looks_like_rax(bytes: &[u8]) -> Option<IPoint> {
    if bytes.len() < RAX_HEADER_LEN || bytes[0] != RAX_MAGIC {
        return None;
    }
    let width = LittleEndian::read_u16(&bytes[2..4]) as i32;
    let height = LittleEndian::read_u16(&bytes[4..6]) as i32;
    let size = IPoint::new(width, height);
    check_dimensions(size).ok()?;
    Some(size)
}
