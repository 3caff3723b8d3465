use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Invalid cell size: {0} (must be a finite value > 0)")]
    InvalidCellSize(f64),

    #[error("Image has zero area: {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("Pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Color count must be at least 1")]
    InvalidColorCount,

    #[error("Invalid merge threshold: {0}")]
    InvalidThreshold(f64),

    #[error("Unknown grid type: {0}")]
    UnknownGridType(String),

    #[error("Invalid hex color: {0}")]
    InvalidHex(String),

    #[error("Image has no opaque pixels to build a palette from")]
    NoOpaquePixels,

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),
}
