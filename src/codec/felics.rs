//! Adaptive FELICS-style codec for 8- and 16-bit single-channel rasters.
//!
//! Every pixel is predicted to fall between its two causal neighbors. The
//! interval `[low, high]` spanned by the neighbors (widened by a configurable
//! padding) is coded with one flag bit plus a truncated-binary code centered
//! on the interval midpoint; pixels that escape the interval pay a 2-bit
//! marker plus a Golomb-Rice code of the overshoot. The serialized stream is
//! a flat array of 32-bit words beginning with a bit-packed header:
//!
//! ```text
//! [16] width      [16] height      [8] version (currently 1)
//! [16] golomb parameter M          [8] padding fraction x 100
//! [2]  depth (always 1)            [8] component size in bits (8 or 16)
//! [32] raw value of the first pixel
//! ```

use log::debug;

use crate::codec::bits::{BitReader, BitWriter, bytes_to_words};
use crate::image::geom::IPoint;
use crate::image::jimage::{CompressParam, JImage, SamplePlane};
use crate::utils::error::{CodecError, Result};

const BITS_WIDTH_OR_HEIGHT: u32 = 16;
const BITS_VERSION: u32 = 8;
const BITS_GOLOMB_M: u32 = 16;
const BITS_PADDING: u32 = 8;
const BITS_DEPTH: u32 = 2;
const BITS_COMPONENT_SIZE: u32 = 8;
const BITS_FIRST_PIXEL: u32 = 32;

const VERSION: u32 = 1;

const HEADER_BITS: u64 = (BITS_WIDTH_OR_HEIGHT * 2
    + BITS_VERSION
    + BITS_GOLOMB_M
    + BITS_PADDING
    + BITS_DEPTH
    + BITS_COMPONENT_SIZE
    + BITS_FIRST_PIXEL) as u64;

/// Amount by which each side of the `[low, high]` interval is widened.
/// Values just outside the neighbor span are usually noise on a flat area;
/// admitting them to the in-range path improves the ratio.
fn interval_padding(golomb: u32, padding_pct: u32) -> i32 {
    (golomb * padding_pct / 100) as i32
}

/// The two causal neighbors bounding the prediction interval, already
/// ordered. Shared verbatim between encode and decode: both sides see the
/// same reconstructed prefix, so the intervals replay exactly.
fn neighbor_bounds(
    pixels: &[i32],
    first_pixel: i32,
    width: usize,
    x: usize,
    y: usize,
    s: usize,
) -> (i32, i32) {
    let (a, b) = if y != 0 {
        if x == 0 {
            let above = pixels[s - width];
            // Width-1 images have no above-right neighbor
            let above_right = if width > 1 { pixels[s - width + 1] } else { above };
            (above, above_right)
        } else {
            (pixels[s - 1], pixels[s - width])
        }
    } else if x <= 1 {
        (first_pixel, first_pixel)
    } else {
        (pixels[s - 2], pixels[s - 1])
    };
    if a < b { (a, b) } else { (b, a) }
}

/// Fold an in-range pixel around the interval midpoint so that values
/// nearest the midpoint get the smallest indices, alternating below/above.
/// Purely a reindexing; [`unmap_pixel_from_center`] inverts it exactly.
fn map_pixel_to_center(pixel: i32, low: i32, high: i32) -> u32 {
    let middle = (low + high) >> 1;
    if pixel <= middle {
        ((middle - pixel) << 1) as u32
    } else {
        (((pixel - middle) << 1) - 1) as u32
    }
}

fn unmap_pixel_from_center(index: u32, low: i32, high: i32) -> i32 {
    let middle = (low + high) >> 1;
    let index = index as i32;
    if index & 1 == 0 {
        middle - (index >> 1)
    } else {
        middle + ((index + 1) >> 1)
    }
}

/// Compress a `JImage` into a flat array of 32-bit words.
///
/// The image must have depth 1 and dimensions representable in 16 bits; the
/// sample buffer length must match. A zero `golomb` parameter falls back to
/// the default, the way a missing parameter set would.
pub fn encode(image: &JImage, param: &CompressParam) -> Result<Vec<u32>> {
    if image.depth != 1 {
        return Err(CodecError::UnsupportedComponentWidth(format!(
            "depth {} (only single-channel images are supported)",
            image.depth
        )));
    }
    let width = image.size.x;
    let height = image.size.y;
    if width < 1 || width > 0xffff || height < 1 || height > 0xffff {
        return Err(CodecError::InvalidDimensions(format!(
            "{}x{} outside 1..=65535",
            width, height
        )));
    }
    let area = (width as usize) * (height as usize);
    if image.plane.len() != area {
        return Err(CodecError::InvalidDimensions(format!(
            "sample buffer holds {} samples, expected {}",
            image.plane.len(),
            area
        )));
    }

    let golomb = if param.golomb >= 1 {
        param.golomb.min(0xffff)
    } else {
        CompressParam::default().golomb
    };
    let padding_pct = ((param.padding.clamp(0.0, 1.0) * 100.0) as u32).min(100);
    let pad = interval_padding(golomb, padding_pct);

    let pixels: Vec<i32> = match &image.plane {
        SamplePlane::Bytes(samples) => samples.iter().map(|&p| p as i32).collect(),
        SamplePlane::Words(samples) => samples.iter().map(|&p| p as i32).collect(),
    };
    let component_size = image.component_size();

    let mut w = BitWriter::new();
    w.write(BITS_WIDTH_OR_HEIGHT, width as u32);
    w.write(BITS_WIDTH_OR_HEIGHT, height as u32);
    w.write(BITS_VERSION, VERSION);
    w.write(BITS_GOLOMB_M, golomb);
    w.write(BITS_PADDING, padding_pct);
    w.write(BITS_DEPTH, 1);
    w.write(BITS_COMPONENT_SIZE, component_size);
    w.write(BITS_FIRST_PIXEL, pixels[0] as u32);

    let width = width as usize;
    let height = height as usize;
    let mut s = 0;
    for y in 0..height {
        for x in 0..width {
            let (mut low, mut high) = neighbor_bounds(&pixels, pixels[0], width, x, y, s);
            low -= pad;
            high += pad;

            let pixel = pixels[s];
            if pixel < low {
                w.write(2, 0);
                w.write_golomb(golomb, ((low - 1) - pixel) as u32);
            } else if pixel > high {
                w.write(2, 1);
                w.write_golomb(golomb, (pixel - (high + 1)) as u32);
            } else {
                w.write(1, 1);
                // A one-point interval determines the pixel; nothing to code
                if low != high {
                    let centered = map_pixel_to_center(pixel, low, high);
                    w.write_truncated((high + 1 - low) as u32, centered);
                }
            }
            s += 1;
        }
    }

    let words = w.result();
    debug!(
        "felics: encoded {}x{} {}-bit image, {} -> {} bytes",
        width,
        height,
        component_size,
        area * component_size as usize / 8,
        words.len() * 4
    );
    Ok(words)
}

/// Decompress a word array produced by [`encode`], reconstructing the exact
/// source image including its component width.
pub fn decode(compressed: &[u32]) -> Result<JImage> {
    let mut r = BitReader::new(compressed);

    let width = r.read(BITS_WIDTH_OR_HEIGHT)? as i32;
    let height = r.read(BITS_WIDTH_OR_HEIGHT)? as i32;
    if width < 1 || height < 1 {
        return Err(CodecError::InvalidDimensions(format!(
            "{}x{} declared in header",
            width, height
        )));
    }
    let version = r.read(BITS_VERSION)?;
    if version != VERSION {
        return Err(CodecError::MalformedHeader(format!(
            "unexpected version {} != {}",
            version, VERSION
        )));
    }
    let golomb = r.read(BITS_GOLOMB_M)?;
    if golomb < 1 {
        return Err(CodecError::MalformedHeader(
            "golomb parameter 0".to_string(),
        ));
    }
    let padding_pct = r.read(BITS_PADDING)?;
    let depth = r.read(BITS_DEPTH)?;
    if depth != 1 {
        return Err(CodecError::UnsupportedComponentWidth(format!(
            "depth {}",
            depth
        )));
    }
    let component_size = r.read(BITS_COMPONENT_SIZE)?;
    if component_size != 8 && component_size != 16 {
        return Err(CodecError::UnsupportedComponentWidth(format!(
            "{} bits per component",
            component_size
        )));
    }
    let first_pixel = r.read(BITS_FIRST_PIXEL)? as i32;

    // Every pixel costs at least one bit, so a stream that cannot hold the
    // declared area is truncated no matter what its bits say. Checked before
    // the plane is sized, so a crafted header cannot trigger a huge
    // allocation.
    let area = width as u64 * height as u64;
    if (compressed.len() as u64) * 32 < HEADER_BITS + area {
        return Err(CodecError::TruncatedStream);
    }

    let pad = interval_padding(golomb, padding_pct);
    let width = width as usize;
    let height = height as usize;
    let mut pixels = vec![0i32; width * height];

    let mut s = 0;
    for y in 0..height {
        for x in 0..width {
            let (mut low, mut high) = neighbor_bounds(&pixels, first_pixel, width, x, y, s);
            low -= pad;
            high += pad;

            let pixel;
            if r.read(1)? == 1 {
                if low != high {
                    let centered = r.read_truncated((high + 1 - low) as u32)?;
                    pixel = unmap_pixel_from_center(centered, low, high);
                } else {
                    pixel = low;
                }
            } else if r.read(1)? == 1 {
                // Overshoot above the interval
                let t = r.read_golomb(golomb)?.min(i32::MAX as u32) as i32;
                pixel = high.saturating_add(1).saturating_add(t);
            } else {
                // Undershoot below the interval
                let t = r.read_golomb(golomb)?.min(i32::MAX as u32) as i32;
                pixel = low.saturating_sub(1).saturating_sub(t);
            }
            pixels[s] = pixel;
            s += 1;
        }
    }

    let size = IPoint::new(width as i32, height as i32);
    let plane = pack_plane(&pixels, component_size)?;
    Ok(JImage {
        size,
        depth: 1,
        plane,
    })
}

/// Repack decoded samples to their declared width, failing loudly on any
/// value that does not fit rather than truncating it.
fn pack_plane(pixels: &[i32], component_size: u32) -> Result<SamplePlane> {
    match component_size {
        8 => {
            let mut samples = Vec::with_capacity(pixels.len());
            for &p in pixels {
                if p & !0xff != 0 {
                    return Err(CodecError::SampleOverflow {
                        value: p as i64,
                        bits: 8,
                    });
                }
                samples.push(p as u8);
            }
            Ok(SamplePlane::Bytes(samples))
        }
        16 => {
            let mut samples = Vec::with_capacity(pixels.len());
            for &p in pixels {
                if p & !0xffff != 0 {
                    return Err(CodecError::SampleOverflow {
                        value: p as i64,
                        bits: 16,
                    });
                }
                samples.push(p as u16);
            }
            Ok(SamplePlane::Words(samples))
        }
        _ => Err(CodecError::UnsupportedComponentWidth(format!(
            "{} bits per component",
            component_size
        ))),
    }
}

/// Decode from a big-endian byte serialization of the word stream.
pub fn decode_bytes(bytes: &[u8]) -> Result<JImage> {
    decode(&bytes_to_words(bytes)?)
}

/// Diagnostic: compressed size over raw sample size. Suitable for the
/// `ratio` field of [`CompressParam`].
pub fn compression_ratio(image: &JImage, compressed: &[u32]) -> f32 {
    let raw_bytes = image.plane.len() * image.component_size() as usize / 8;
    (compressed.len() * 4) as f32 / raw_bytes as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_image(width: i32, height: i32) -> JImage {
        let samples = (0..width * height)
            .map(|i| (500 + (i % 61) * 37) as u16)
            .collect();
        JImage::from_words(IPoint::new(width, height), samples).unwrap()
    }

    #[test]
    fn test_center_mapping_inverts() {
        for low in [-50, 0, 3, 100] {
            for high in [low, low + 1, low + 2, low + 97] {
                for pixel in low..=high {
                    let index = map_pixel_to_center(pixel, low, high);
                    assert!((index as i32) < high + 1 - low);
                    assert_eq!(unmap_pixel_from_center(index, low, high), pixel);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_16_bit() {
        let img = word_image(23, 9);
        let words = encode(&img, &CompressParam::default()).unwrap();
        assert_eq!(decode(&words).unwrap(), img);
    }

    #[test]
    fn test_round_trip_8_bit() {
        let samples: Vec<u8> = (0..31 * 5).map(|i| (i * 7 % 251) as u8).collect();
        let img = JImage::from_bytes(IPoint::new(31, 5), samples).unwrap();
        let words = encode(&img, &CompressParam::default()).unwrap();
        let decoded = decode(&words).unwrap();
        assert_eq!(decoded, img);
        assert_eq!(decoded.component_size(), 8);
    }

    #[test]
    fn test_round_trip_width_one() {
        let samples = vec![9u16, 60000, 0, 3, 3];
        let img = JImage::from_words(IPoint::new(1, 5), samples).unwrap();
        let words = encode(&img, &CompressParam::default()).unwrap();
        assert_eq!(decode(&words).unwrap(), img);
    }

    #[test]
    fn test_escape_outlier_round_trips() {
        let mut samples = vec![32000u16; 64];
        samples[27] = 0;
        let img = JImage::from_words(IPoint::new(8, 8), samples).unwrap();
        let words = encode(&img, &CompressParam::default()).unwrap();
        assert_eq!(decode(&words).unwrap(), img);
    }

    #[test]
    fn test_zero_golomb_falls_back_to_default() {
        let img = word_image(6, 6);
        let param = CompressParam {
            golomb: 0,
            ..CompressParam::default()
        };
        let words = encode(&img, &param).unwrap();
        assert_eq!(words, encode(&img, &CompressParam::default()).unwrap());
    }

    #[test]
    fn test_decode_rejects_bad_version() {
        let img = word_image(4, 4);
        let mut words = encode(&img, &CompressParam::default()).unwrap();
        // Version byte sits at bits 32..40 of the stream
        words[1] ^= 0xff00_0000;
        assert!(matches!(
            decode(&words),
            Err(CodecError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_depth_and_component_size() {
        let img = word_image(4, 4);
        let words = encode(&img, &CompressParam::default()).unwrap();
        // Depth field: 2 bits at offset 64; component size: 8 bits at 66
        let mut bad_depth = words.clone();
        bad_depth[2] ^= 0x8000_0000;
        assert!(matches!(
            decode(&bad_depth),
            Err(CodecError::UnsupportedComponentWidth(_))
        ));
        let mut bad_component = words.clone();
        bad_component[2] ^= 0x2000_0000;
        assert!(matches!(
            decode(&bad_component),
            Err(CodecError::UnsupportedComponentWidth(_))
        ));
    }

    /// Writes the bit-packed header exactly as `encode` would.
    fn write_header(w: &mut BitWriter, width: u32, height: u32, component_size: u32, first: u32) {
        w.write(BITS_WIDTH_OR_HEIGHT, width);
        w.write(BITS_WIDTH_OR_HEIGHT, height);
        w.write(BITS_VERSION, VERSION);
        w.write(BITS_GOLOMB_M, 180);
        w.write(BITS_PADDING, 25);
        w.write(BITS_DEPTH, 1);
        w.write(BITS_COMPONENT_SIZE, component_size);
        w.write(BITS_FIRST_PIXEL, first);
    }

    #[test]
    fn test_decode_rejects_undersized_stream_for_declared_area() {
        // A valid-looking header declaring a 65535x65535 image followed by
        // no pixel data must fail cleanly, not size a 17 GB plane
        let mut w = BitWriter::new();
        write_header(&mut w, 0xffff, 0xffff, 16, 1000);
        let words = w.result();
        assert_eq!(decode(&words), Err(CodecError::TruncatedStream));
    }

    #[test]
    fn test_decode_rejects_zero_golomb() {
        let img = word_image(4, 4);
        let mut words = encode(&img, &CompressParam::default()).unwrap();
        // Golomb field occupies bits 40..56
        words[1] &= 0xff00_00ff;
        assert!(matches!(
            decode(&words),
            Err(CodecError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_decode_flags_sample_overflow() {
        // 1x1 8-bit image whose only pixel escapes high to 500: the interval
        // around the first pixel 0 is [-45, 45], so the overshoot is
        // 500 - 46 = 454
        let mut w = BitWriter::new();
        write_header(&mut w, 1, 1, 8, 0);
        w.write(2, 1);
        w.write_golomb(180, 454);
        let words = w.result();
        assert_eq!(
            decode(&words),
            Err(CodecError::SampleOverflow { value: 500, bits: 8 })
        );
    }

    #[test]
    fn test_decode_truncated_stream() {
        let img = word_image(16, 16);
        let words = encode(&img, &CompressParam::default()).unwrap();
        let truncated = &words[..words.len() - 1];
        assert_eq!(decode(truncated), Err(CodecError::TruncatedStream));
    }

    #[test]
    fn test_compression_ratio_diagnostic() {
        let img = JImage::from_words(IPoint::new(64, 64), vec![1000; 64 * 64]).unwrap();
        let words = encode(&img, &CompressParam::default()).unwrap();
        let ratio = compression_ratio(&img, &words);
        assert!(ratio > 0.0 && ratio < 0.5, "ratio {}", ratio);
    }
}
