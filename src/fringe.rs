//! Phase-shifting fringe analysis.
//!
//! Both estimators recover the wrapped phase of a sinusoidal fringe pattern
//! from N intensity images shifted by 2π/N. The generalized N-step form works
//! for any N ≥ 3; the three-step closed form is cheaper when exactly three
//! patterns are available and uses the opposite atan2 sign convention.

use std::f64::consts::TAU;
use std::path::Path;

use log::debug;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::image2d::Image2D;
use crate::io;

/// Verify that every frame shares the shape of the first one.
pub(crate) fn ensure_same_shape(frames: &[Image2D<u8>]) -> Result<(u32, u32)> {
    let dims = frames[0].dimensions();
    for frame in &frames[1..] {
        if frame.dimensions() != dims {
            return Err(Error::size_mismatch(dims, frame.dimensions()));
        }
    }
    Ok(dims)
}

// ── N-step estimator ─────────────────────────────────────────────────────────

/// Per-pixel sine, cosine and intensity sums over all fringe frames.
struct Sums {
    w: u32,
    h: u32,
    sin: Vec<f64>,
    cos: Vec<f64>,
    intensity: Vec<f64>,
}

fn accumulate(frames: &[Image2D<u8>], n: usize) -> Result<Sums> {
    if frames.len() < 3 {
        return Err(Error::InsufficientFrames {
            needed: 3,
            got: frames.len(),
        });
    }
    let (w, h) = ensure_same_shape(frames)?;

    let len = frames[0].len();
    let mut sums = Sums {
        w,
        h,
        sin: vec![0.0; len],
        cos: vec![0.0; len],
        intensity: vec![0.0; len],
    };

    for (i, frame) in frames.iter().enumerate() {
        let delta = TAU * (i + 1) as f64 / n as f64;
        let (s, c) = delta.sin_cos();
        for (idx, &v) in frame.as_slice().iter().enumerate() {
            let v = v as f64;
            sums.sin[idx] += v * s;
            sums.cos[idx] += v * c;
            sums.intensity[idx] += v;
        }
    }
    Ok(sums)
}

/// Estimate the wrapped phase from N phase-shifted fringe images.
///
/// The i-th image is assumed shifted by δᵢ = 2π(i+1)/N. The result is
/// φ = −atan2(ΣIᵢ·sin δᵢ, ΣIᵢ·cos δᵢ) per pixel, in (−π, π].
/// Fails with [`Error::InsufficientFrames`] for fewer than three images.
pub fn nstep_phase_shifting<P: AsRef<Path>>(paths: &[P], n: usize) -> Result<Image2D<f64>> {
    let frames = io::load_gray_all(paths)?;
    nstep_phase_shifting_frames(&frames, n)
}

/// In-memory form of [`nstep_phase_shifting`].
pub fn nstep_phase_shifting_frames(frames: &[Image2D<u8>], n: usize) -> Result<Image2D<f64>> {
    let sums = accumulate(frames, n)?;
    debug!(
        "n-step phase: {} frames, {}x{}, N = {n}",
        frames.len(),
        sums.w,
        sums.h
    );

    let phase: Vec<f64> = sums
        .sin
        .par_iter()
        .zip(sums.cos.par_iter())
        .map(|(&s, &c)| -s.atan2(c))
        .collect();
    Ok(Image2D::from_vec(sums.w, sums.h, phase))
}

/// As [`nstep_phase_shifting`], additionally returning the data modulation
/// γ = √(S² + C²) / ΣI per pixel.
///
/// γ lies in [0, 1] for well-posed inputs and measures fringe contrast; low
/// values flag unreliable phase. Where ΣI = 0 the division yields NaN, which
/// is passed through for the caller to handle.
pub fn nstep_phase_shifting_modulation<P: AsRef<Path>>(
    paths: &[P],
    n: usize,
) -> Result<(Image2D<f64>, Image2D<f64>)> {
    let frames = io::load_gray_all(paths)?;
    nstep_phase_shifting_modulation_frames(&frames, n)
}

/// In-memory form of [`nstep_phase_shifting_modulation`].
pub fn nstep_phase_shifting_modulation_frames(
    frames: &[Image2D<u8>],
    n: usize,
) -> Result<(Image2D<f64>, Image2D<f64>)> {
    let sums = accumulate(frames, n)?;

    let (phase, modulation): (Vec<f64>, Vec<f64>) = sums
        .sin
        .par_iter()
        .zip(sums.cos.par_iter())
        .zip(sums.intensity.par_iter())
        .map(|((&s, &c), &total)| (-s.atan2(c), (s * s + c * c).sqrt() / total))
        .unzip();

    Ok((
        Image2D::from_vec(sums.w, sums.h, phase),
        Image2D::from_vec(sums.w, sums.h, modulation),
    ))
}

// ── Three-step closed form ───────────────────────────────────────────────────

fn three_frames(frames: &[Image2D<u8>]) -> Result<(&Image2D<u8>, &Image2D<u8>, &Image2D<u8>)> {
    if frames.len() != 3 {
        return Err(Error::InsufficientFrames {
            needed: 3,
            got: frames.len(),
        });
    }
    ensure_same_shape(frames)?;
    Ok((&frames[0], &frames[1], &frames[2]))
}

/// Closed-form three-step estimator: φ = atan2(√3·(I₀ − I₂), 2·I₁ − I₀ − I₂).
///
/// Requires exactly three images. Note the positive atan2 sign, which differs
/// from the generalized N-step sum on purpose.
pub fn three_step_phase_shifting<P: AsRef<Path>>(paths: &[P]) -> Result<Image2D<f64>> {
    let frames = io::load_gray_all(paths)?;
    three_step_phase_shifting_frames(&frames)
}

/// In-memory form of [`three_step_phase_shifting`].
pub fn three_step_phase_shifting_frames(frames: &[Image2D<u8>]) -> Result<Image2D<f64>> {
    let (i0, i1, i2) = three_frames(frames)?;
    let sqrt3 = 3.0f64.sqrt();

    let phase: Vec<f64> = i0
        .as_slice()
        .par_iter()
        .zip(i1.as_slice().par_iter())
        .zip(i2.as_slice().par_iter())
        .map(|((&a, &b), &c)| {
            let (a, b, c) = (a as f64, b as f64, c as f64);
            (sqrt3 * (a - c)).atan2(2.0 * b - a - c)
        })
        .collect();
    let (w, h) = i0.dimensions();
    Ok(Image2D::from_vec(w, h, phase))
}

/// As [`three_step_phase_shifting`], additionally returning the modulation
/// √(num² + den²) / (I₀ + I₁ + I₂) with num = √3·(I₀ − I₂) and
/// den = 2·I₁ − I₀ − I₂. A zero intensity sum yields NaN.
pub fn three_step_phase_shifting_modulation<P: AsRef<Path>>(
    paths: &[P],
) -> Result<(Image2D<f64>, Image2D<f64>)> {
    let frames = io::load_gray_all(paths)?;
    three_step_phase_shifting_modulation_frames(&frames)
}

/// In-memory form of [`three_step_phase_shifting_modulation`].
pub fn three_step_phase_shifting_modulation_frames(
    frames: &[Image2D<u8>],
) -> Result<(Image2D<f64>, Image2D<f64>)> {
    let (i0, i1, i2) = three_frames(frames)?;
    let sqrt3 = 3.0f64.sqrt();

    let (phase, modulation): (Vec<f64>, Vec<f64>) = i0
        .as_slice()
        .par_iter()
        .zip(i1.as_slice().par_iter())
        .zip(i2.as_slice().par_iter())
        .map(|((&a, &b), &c)| {
            let (a, b, c) = (a as f64, b as f64, c as f64);
            let num = sqrt3 * (a - c);
            let den = 2.0 * b - a - c;
            (num.atan2(den), (num * num + den * den).sqrt() / (a + b + c))
        })
        .unzip();

    let (w, h) = i0.dimensions();
    Ok((
        Image2D::from_vec(w, h, phase),
        Image2D::from_vec(w, h, modulation),
    ))
}

/// Synthesize one N-step fringe bundle for the phase profile `phi(x, y)`.
/// Shared by the unwrapping pipeline tests.
#[cfg(test)]
pub(crate) fn synth_fringes(
    w: u32,
    h: u32,
    n: usize,
    phi: impl Fn(u32, u32) -> f64,
) -> Vec<Image2D<u8>> {
    (0..n)
        .map(|i| {
            let delta = TAU * (i + 1) as f64 / n as f64;
            Image2D::from_fn(w, h, |x, y| {
                (128.0 + 100.0 * (phi(x, y) + delta).cos()).round() as u8
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn nstep_recovers_known_phase() {
        let truth = |x: u32, _: u32| -2.5 + 0.31 * x as f64; // stays inside (-π, π)
        let frames = synth_fringes(16, 4, 8, truth);
        let phi = nstep_phase_shifting_frames(&frames, 8).unwrap();
        for y in 0..4 {
            for x in 0..16 {
                assert_abs_diff_eq!(phi.at(x, y), truth(x, y), epsilon = 0.02);
            }
        }
    }

    #[test]
    fn nstep_output_stays_wrapped() {
        let frames = synth_fringes(64, 8, 4, |x, y| 0.4 * x as f64 + 0.1 * y as f64);
        let phi = nstep_phase_shifting_frames(&frames, 4).unwrap();
        for &v in phi.as_slice() {
            assert!(v > -PI - 1e-12 && v <= PI + 1e-12, "phase {v} out of range");
        }
    }

    #[test]
    fn nstep_rejects_two_frames() {
        let frames = vec![Image2D::new(4, 4, 0u8); 2];
        let err = nstep_phase_shifting_frames(&frames, 4).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientFrames { needed: 3, got: 2 }
        ));
    }

    #[test]
    fn nstep_rejects_mixed_shapes() {
        let frames = vec![
            Image2D::new(4, 4, 0u8),
            Image2D::new(4, 4, 0u8),
            Image2D::new(5, 4, 0u8),
        ];
        let err = nstep_phase_shifting_frames(&frames, 3).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }

    #[test]
    fn nstep_modulation_reflects_fringe_contrast() {
        // I = 128 + 100·cos(...) over a full cycle: √(S²+C²) = (N/2)·B and
        // ΣI ≈ N·128, so γ ≈ B/(2·128).
        let frames = synth_fringes(8, 8, 8, |x, _| 0.2 * x as f64);
        let (_, gamma) = nstep_phase_shifting_modulation_frames(&frames, 8).unwrap();
        for &g in gamma.as_slice() {
            assert_abs_diff_eq!(g, 100.0 / 256.0, epsilon = 0.02);
            assert!((0.0..=1.0).contains(&g));
        }
    }

    #[test]
    fn nstep_modulation_is_nan_where_intensity_is_zero() {
        let frames = vec![Image2D::new(2, 2, 0u8); 4];
        let (_, gamma) = nstep_phase_shifting_modulation_frames(&frames, 4).unwrap();
        assert!(gamma.as_slice().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn three_step_matches_closed_form_scenario() {
        let i0 = Image2D::from_vec(2, 2, vec![0u8, 255, 128, 64]);
        let i1 = Image2D::from_vec(2, 2, vec![255u8, 0, 64, 128]);
        let i2 = Image2D::from_vec(2, 2, vec![128u8, 128, 255, 0]);
        let frames = vec![i0.clone(), i1.clone(), i2.clone()];

        let phi = three_step_phase_shifting_frames(&frames).unwrap();
        assert_abs_diff_eq!(phi.at(0, 0), -0.5256, epsilon = 1e-4);

        let sqrt3 = 3.0f64.sqrt();
        for y in 0..2 {
            for x in 0..2 {
                let (a, b, c) = (
                    i0.at(x, y) as f64,
                    i1.at(x, y) as f64,
                    i2.at(x, y) as f64,
                );
                let expected = (sqrt3 * (a - c)).atan2(2.0 * b - a - c);
                assert_abs_diff_eq!(phi.at(x, y), expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn three_step_requires_exactly_three_frames() {
        let frames = vec![Image2D::new(2, 2, 0u8); 4];
        let err = three_step_phase_shifting_frames(&frames).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientFrames { needed: 3, got: 4 }
        ));
    }

    #[test]
    fn three_step_modulation_matches_component_magnitudes() {
        let i0 = Image2D::from_vec(1, 1, vec![200u8]);
        let i1 = Image2D::from_vec(1, 1, vec![100u8]);
        let i2 = Image2D::from_vec(1, 1, vec![50u8]);
        let (_, gamma) =
            three_step_phase_shifting_modulation_frames(&[i0, i1, i2]).unwrap();

        let num = 3.0f64.sqrt() * 150.0;
        let den = -50.0;
        let expected = (num * num + den * den).sqrt() / 350.0;
        assert_abs_diff_eq!(gamma.at(0, 0), expected, epsilon = 1e-12);
    }
}
