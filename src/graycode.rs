//! Gray-code pattern decoding.
//!
//! The projected sequence encodes every fringe order as an n-bit Gray code,
//! captured as n (pattern, inverted-pattern) image pairs. Binarizing each
//! pair against its inverse is robust to global illumination; the Gray
//! property (adjacent code words differ in exactly one bit) keeps decode
//! errors at stripe transitions bounded to ±1 fringe.

use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::fringe::ensure_same_shape;
use crate::image2d::{CodeWordStack, Image2D};
use crate::io;

/// Largest bit-plane count whose decimal fits an i32 fringe order.
const MAX_PLANES: usize = 31;

fn validate_pair_count(count: usize) -> Result<usize> {
    if count == 0 {
        return Err(Error::InsufficientFrames { needed: 2, got: 0 });
    }
    if count % 2 != 0 {
        return Err(Error::OddImageCount(count));
    }
    let n = count / 2;
    assert!(n <= MAX_PLANES, "more than {MAX_PLANES} Gray-code bit planes");
    Ok(n)
}

/// Binarize one (pattern, inverted) pair: 1 where the pattern is brighter.
fn binarize_pair(pattern: &Image2D<u8>, inverted: &Image2D<u8>) -> Image2D<u8> {
    let (w, h) = pattern.dimensions();
    let bits = pattern
        .as_slice()
        .iter()
        .zip(inverted.as_slice())
        .map(|(&a, &b)| u8::from(a > b))
        .collect();
    Image2D::from_vec(w, h, bits)
}

// ── Code-word stack ──────────────────────────────────────────────────────────

/// Build the (n, H, W) code-word stack from 2n images, ordered as n
/// (pattern, inverted-pattern) pairs from most- to least-significant bit.
///
/// Fails with [`Error::OddImageCount`] when the count is odd.
pub fn gray_codeword<P: AsRef<Path>>(paths: &[P]) -> Result<CodeWordStack> {
    validate_pair_count(paths.len())?;
    let frames = io::load_gray_all(paths)?;
    gray_codeword_frames(&frames)
}

/// In-memory form of [`gray_codeword`].
pub fn gray_codeword_frames(frames: &[Image2D<u8>]) -> Result<CodeWordStack> {
    let n = validate_pair_count(frames.len())?;
    ensure_same_shape(frames)?;

    let slices = (0..n)
        .map(|k| binarize_pair(&frames[2 * k], &frames[2 * k + 1]))
        .collect();
    Ok(CodeWordStack::from_slices(slices))
}

// ── Gray → decimal ───────────────────────────────────────────────────────────

/// Decode the stack to integer fringe orders.
///
/// Standard Gray→binary conversion per pixel: the binary MSB equals the Gray
/// MSB, every later binary bit is the previous binary bit XOR the current
/// Gray bit, and the decimal is Σ binₖ·2^(n−1−k).
pub fn gray_to_dec(stack: &CodeWordStack) -> Image2D<i32> {
    let n = stack.len();
    let (w, h) = stack.dimensions();

    let mut bin: Vec<u8> = stack.slice(0).as_slice().to_vec();
    let mut dec: Vec<i32> = bin
        .iter()
        .map(|&b| if b != 0 { 1 << (n - 1) } else { 0 })
        .collect();

    for k in 1..n {
        let plane = stack.slice(k).as_slice();
        let weight = 1i32 << (n - k - 1);
        for ((b, d), &g) in bin.iter_mut().zip(dec.iter_mut()).zip(plane) {
            *b ^= g;
            if *b != 0 {
                *d += weight;
            }
        }
    }
    Image2D::from_vec(w, h, dec)
}

/// Fused form of [`gray_codeword`] + [`gray_to_dec`].
///
/// Streams through the image pairs one at a time, carrying only the running
/// binary buffer and the decimal accumulator instead of the full (n, H, W)
/// stack. The result is bit-identical to the unfused composition.
pub fn decimal_map<P: AsRef<Path>>(paths: &[P]) -> Result<Image2D<i32>> {
    let n = validate_pair_count(paths.len())?;

    let pattern = io::load_gray(&paths[0])?;
    let inverted = io::load_gray(&paths[1])?;
    if inverted.dimensions() != pattern.dimensions() {
        return Err(Error::size_mismatch(
            pattern.dimensions(),
            inverted.dimensions(),
        ));
    }
    let (w, h) = pattern.dimensions();

    let mut bin: Vec<u8> = pattern
        .as_slice()
        .iter()
        .zip(inverted.as_slice())
        .map(|(&a, &b)| u8::from(a > b))
        .collect();
    let mut dec: Vec<i32> = bin
        .iter()
        .map(|&b| if b != 0 { 1 << (n - 1) } else { 0 })
        .collect();

    for k in 1..n {
        let pattern = io::load_gray(&paths[2 * k])?;
        let inverted = io::load_gray(&paths[2 * k + 1])?;
        if pattern.dimensions() != (w, h) {
            return Err(Error::size_mismatch((w, h), pattern.dimensions()));
        }
        if inverted.dimensions() != (w, h) {
            return Err(Error::size_mismatch((w, h), inverted.dimensions()));
        }

        let weight = 1i32 << (n - k - 1);
        for ((b, d), (&a, &i)) in bin
            .iter_mut()
            .zip(dec.iter_mut())
            .zip(pattern.as_slice().iter().zip(inverted.as_slice()))
        {
            *b ^= u8::from(a > i);
            if *b != 0 {
                *d += weight;
            }
        }
    }
    debug!("decoded {n}-bit fringe order map ({w}x{h})");
    Ok(Image2D::from_vec(w, h, dec))
}

/// In-memory form of [`decimal_map`].
pub fn decimal_map_frames(frames: &[Image2D<u8>]) -> Result<Image2D<i32>> {
    validate_pair_count(frames.len())?;
    ensure_same_shape(frames)?;
    Ok(gray_to_dec(&gray_codeword_frames(frames)?))
}

// ── Masked extraction ────────────────────────────────────────────────────────

/// Fringe-order values at all mask-positive pixels, flattened row-major.
///
/// Capacity is reserved up front from the mask's nonzero count. Fails with
/// [`Error::SizeMismatch`] when the mask shape differs from the stack's.
pub fn decode(stack: &CodeWordStack, mask: &Image2D<u8>) -> Result<Vec<f32>> {
    if mask.dimensions() != stack.dimensions() {
        return Err(Error::size_mismatch(stack.dimensions(), mask.dimensions()));
    }

    let dec = gray_to_dec(stack);
    let mut coords = Vec::with_capacity(mask.count_nonzero());
    for (&m, &d) in mask.as_slice().iter().zip(dec.as_slice()) {
        if m != 0 {
            coords.push(d as f32);
        }
    }
    Ok(coords)
}
