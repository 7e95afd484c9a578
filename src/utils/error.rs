use thiserror::Error;

/// Main error type for the monopress codecs.
///
/// All failures are synchronous and total: decode either returns a complete
/// raster or one of these; encode validates its input before writing any
/// output. There is no partial-success mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Width/height outside the valid range, or a pixel buffer whose length
    /// does not match the declared dimensions.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),
    /// Bad magic byte or unsupported format version.
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    /// Component size other than 8 or 16 bits, or depth other than 1.
    #[error("unsupported component width: {0}")]
    UnsupportedComponentWidth(String),
    /// The stream ended before the image was fully decoded.
    #[error("truncated stream")]
    TruncatedStream,
    /// A reconstructed sample does not fit the declared component width.
    #[error("sample value {value} does not fit in {bits} bits")]
    SampleOverflow { value: i64, bits: u32 },
}

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
