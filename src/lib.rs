//! # phasekit
//!
//! Structured-light fringe analysis and phase unwrapping.
//!
//! Starting from captured 8-bit grayscale fringe images, the crate recovers
//! an absolute (unwrapped) phase map of the scene. The building blocks are
//! loosely coupled and composed on demand:
//!
//! - [`fringe`] — N-step and three-step phase-shifting estimators for the
//!   wrapped phase and the per-pixel data modulation
//! - [`graycode`] — binarization and decoding of Gray-code pattern pairs
//!   into an integer fringe-order map
//! - [`phase_graycoding`] — wrapped phase + fringe order → absolute phase,
//!   with median-based spike correction
//! - [`multifrequency`] — temporal unwrapping from two or three fringe
//!   frequencies via equivalent-phase cascades
//! - [`centerline`] — seed-point detection and spatial flood-fill unwrapping
//!
//! All numeric kernels operate on owned [`Image2D`] buffers; image decoding
//! happens only in the path-based entry points.
//!
//! ## Quick start
//!
//! ```no_run
//! use phasekit::phase_graycoding::phase_graycoding_unwrap;
//!
//! fn main() -> phasekit::Result<()> {
//!     // 18 phase-shift captures followed by the Gray-code pattern pairs,
//!     // in lexicographic order.
//!     let ps: Vec<String> = (0..18).map(|i| format!("caps/{i:02}.png")).collect();
//!     let gc: Vec<String> = (18..30).map(|i| format!("caps/{i:02}.png")).collect();
//!
//!     let phi = phase_graycoding_unwrap(&ps, &gc, 18, 18)?;
//!     let (min, max) = phi.min_max();
//!     println!("absolute phase spans [{min:.3}, {max:.3}]");
//!     Ok(())
//! }
//! ```

pub mod centerline;
pub mod error;
pub mod filter;
pub mod fringe;
pub mod graycode;
pub mod image2d;
pub mod io;
pub mod multifrequency;
pub mod phase_graycoding;

pub use error::{Error, Result};
pub use image2d::{CodeWordStack, Image2D};
