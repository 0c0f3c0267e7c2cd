use std::fmt;

use thiserror::Error;

/// Result type used throughout the crate
pub type MatteResult<T> = Result<T, MatteError>;

/// Identifies which caller-supplied buffer failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Single-channel mask produced by a model
    Mask,
    /// RGBA guide image
    Guide,
    /// RGBA baseline used by the refinement operators
    Baseline,
    /// RGBA canvas mutated by the eraser
    Canvas,
    /// Single-channel float plane passed to the raw box filter
    Values,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mask => "mask",
            Self::Guide => "guide",
            Self::Baseline => "baseline",
            Self::Canvas => "canvas",
            Self::Values => "values",
        };
        f.write_str(name)
    }
}

/// Error type for matte processing
///
/// Buffer-size and dimension errors abort the call. Algorithmic degeneracies
/// never surface here; every stage substitutes a safe default instead. The one
/// exception is [`MatteError::InsufficientColorSamples`], which the matting
/// stage returns so that the pipeline can record it as a soft fallback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatteError {
    /// A raw buffer length does not match its declared dimensions
    #[error("{buffer} buffer has {actual} bytes, expected {expected} for {width}x{height}")]
    InvalidBufferSize {
        /// Which buffer was malformed
        buffer: BufferKind,
        /// Declared width
        width: u32,
        /// Declared height
        height: u32,
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Zero width or height
    #[error("Image has degenerate dimensions {width}x{height}")]
    DegenerateImage { width: u32, height: u32 },

    /// Too few definite samples in either trimap class to estimate colours
    ///
    /// Non-fatal: the pipeline keeps the pre-matting mask and continues.
    #[error("Insufficient color samples: {foreground} foreground, {background} background (need {required})")]
    InsufficientColorSamples {
        foreground: usize,
        background: usize,
        required: usize,
    },

    /// Two images that must share dimensions do not
    #[error("Image dimensions mismatch: expected {expected:?}, actual {actual:?}")]
    DimensionMismatch {
        /// Expected dimensions (width, height)
        expected: (u32, u32),
        /// Actual dimensions (width, height)
        actual: (u32, u32),
    },

    /// Invalid parameter provided to the operation
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Failed to decode or encode an image file
    #[error("Codec error: {0}")]
    Codec(String),

    /// The external mask model failed or is not configured
    #[error("Mask model failed: {0}")]
    Model(String),
}

impl MatteError {
    /// Returns `true` for errors the pipeline absorbs instead of aborting
    #[must_use]
    pub const fn is_soft_fallback(&self) -> bool {
        matches!(self, Self::InsufficientColorSamples { .. })
    }
}
