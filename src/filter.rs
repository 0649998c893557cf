//! Shared image filters: the f32 median blur used by the spike-correction
//! step, Otsu binarization, and mask application.

use std::f64::consts::TAU;

use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use rayon::prelude::*;

use crate::image2d::Image2D;

/// Aperture of the median filter used to suppress fringe-order spikes.
const SPIKE_APERTURE: u32 = 5;

// ── Median blur ──────────────────────────────────────────────────────────────

/// Classical 2D median filter with edge replication.
///
/// `aperture` must be odd. The filter runs on f32 on purpose: the spike
/// correction only uses the result as a rounding reference, and f32 matches
/// the common filter-library signature the algorithm was designed against.
/// imageproc's own median filter is histogram-based over u8 samples, so this
/// one is written out by hand.
pub fn median_blur_f32(src: &Image2D<f32>, aperture: u32) -> Image2D<f32> {
    assert!(aperture % 2 == 1, "median aperture must be odd, got {aperture}");
    let (w, h) = src.dimensions();
    let r = (aperture / 2) as i64;

    let mut out = Image2D::new(w, h, 0.0f32);
    out.as_mut_slice()
        .par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let mut window = Vec::with_capacity((aperture * aperture) as usize);
            for x in 0..w as i64 {
                window.clear();
                for dy in -r..=r {
                    let sy = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
                    for dx in -r..=r {
                        let sx = (x + dx).clamp(0, w as i64 - 1) as u32;
                        window.push(src.at(sx, sy));
                    }
                }
                window.sort_unstable_by(|a, b| a.total_cmp(b));
                row[x as usize] = window[window.len() / 2];
            }
        });
    out
}

/// Subtract from every pixel the 2π multiple separating it from its local
/// 5×5 median.
///
/// A wrong fringe order (an off-by-one decode at a code transition) shows up
/// as an isolated ±2π spike against the surrounding absolute phase; rounding
/// the difference to the median recovers the consistent value. Pixels that
/// already agree with their neighborhood round to a zero offset and pass
/// through unchanged.
pub fn suppress_spikes(phi: &mut Image2D<f64>) {
    let median = median_blur_f32(&phi.map(|v| v as f32), SPIKE_APERTURE);
    phi.as_mut_slice()
        .par_iter_mut()
        .zip(median.as_slice().par_iter())
        .for_each(|(v, &m)| {
            let n = (*v - m as f64) / TAU;
            *v -= TAU * n.round();
        });
}

// ── Thresholding and masking ─────────────────────────────────────────────────

/// Otsu binarization to {0, 255}.
pub fn otsu_binarize(src: &Image2D<u8>) -> Image2D<u8> {
    let gray = src.to_gray_image();
    let level = otsu_level(&gray);
    threshold(&gray, level, ThresholdType::Binary).into()
}

/// Keep `src` where the mask byte is nonzero, zero elsewhere.
///
/// Any nonzero byte counts as inside, so {0, 1} and {0, 255} masks behave
/// the same.
pub fn mask_apply(src: &Image2D<u8>, mask: &Image2D<u8>) -> Image2D<u8> {
    assert_eq!(src.dimensions(), mask.dimensions(), "mask shape mismatch");
    let data = src
        .as_slice()
        .iter()
        .zip(mask.as_slice())
        .map(|(&s, &m)| if m != 0 { s } else { 0 })
        .collect();
    let (w, h) = src.dimensions();
    Image2D::from_vec(w, h, data)
}
