//! # monopress
//!
//! Lossless predictive compression codecs for single-channel (grayscale)
//! rasters with 8- or 16-bit integer samples.
//!
//! Two formats are provided:
//! - `codec::rax`: a byte-aligned predictive delta codec for 16-bit
//!   monochrome images (`MonoImage`), with a 6-byte header and a sentinel
//!   escape for residuals that do not fit a signed byte.
//! - `codec::felics`: a bit-packed adaptive codec in the FELICS family for
//!   8- and 16-bit images (`JImage`), combining two-neighbor interval
//!   prediction with truncated-binary and Golomb-Rice coding.
//!
//! Both codecs are pure functions over caller-owned buffers: encode takes a
//! raster and returns an opaque byte/word buffer, decode reconstructs an
//! identical raster or fails with a [`CodecError`]. There is no file I/O and
//! no shared state; concurrent calls on independent buffers need no
//! synchronization.

// Re-export commonly used types at the crate root
pub use utils::error::{CodecError, Result};

// Core modules
pub mod utils {
    pub mod error;
}

pub mod image {
    pub mod geom;
    pub mod jimage;
    pub mod mono;
}

pub mod codec {
    pub mod bits;
    pub mod felics;
    pub mod rax;
}

// Public API exports
pub use image::geom::IPoint;
pub use image::jimage::{CompressParam, JImage, SamplePlane};
pub use image::mono::MonoImage;

#[cfg(test)]
mod tests {
    use crate::codec::rax;

    #[test]
    fn test_rax_magic() {
        assert_eq!(rax::RAX_MAGIC, 0xfd);
        assert_eq!(rax::RAX_VERSION, 1);
    }
}
