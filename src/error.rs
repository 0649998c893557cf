//! Error types for the phase-unwrapping library.

use thiserror::Error;

/// Result type for all fallible phasekit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the analysis and unwrapping operations.
///
/// Numeric edge cases (NaN/Inf from a zero intensity sum in the modulation
/// estimators) are documented outcomes, not errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Fewer fringe images than the estimator's minimum.
    #[error("not enough fringe images: need at least {needed}, got {got}")]
    InsufficientFrames { needed: usize, got: usize },

    /// Gray-code images must come in (pattern, inverted) pairs.
    #[error("gray-code image count must be even, got {0}")]
    OddImageCount(usize),

    /// Image count does not match the sum of per-frequency pattern counts.
    #[error("expected {expected} images for the given pattern counts, got {got}")]
    FrameCountMismatch { expected: usize, got: usize },

    /// Two input images disagree in width or height.
    #[error("image size mismatch: expected {expected_w}x{expected_h}, got {got_w}x{got_h}")]
    SizeMismatch {
        expected_w: u32,
        expected_h: u32,
        got_w: u32,
        got_h: u32,
    },

    /// The flood-fill seed lies outside the image or on a masked-out pixel.
    #[error("seed point ({x}, {y}) is outside the mask")]
    SeedOutsideMask { x: u32, y: u32 },

    /// The two centerline images have no common lit pixel.
    #[error("centerline intersection is empty")]
    EmptyIntersection,

    /// Image decoding failed.
    #[error("image load error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn size_mismatch(expected: (u32, u32), got: (u32, u32)) -> Self {
        Error::SizeMismatch {
            expected_w: expected.0,
            expected_h: expected.1,
            got_w: got.0,
            got_h: got.1,
        }
    }
}
