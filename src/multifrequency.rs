//! Temporal phase unwrapping from two or three fringe frequencies.
//!
//! The difference of two wrapped phases, taken modulo 2π, behaves like the
//! phase of a synthetic fringe whose period is the beat of the two inputs.
//! Choosing the pitches so that the widest synthetic period spans the whole
//! field makes that phase absolute, and each shorter wavelength is then
//! unwrapped against the next-longer one by integer fringe-count rounding.

use std::f64::consts::TAU;
use std::path::Path;

use log::debug;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::filter;
use crate::fringe;
use crate::image2d::Image2D;
use crate::io;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Per-pixel `mod(φ₁ − φ₂, 2π)` in [0, 2π).
///
/// Round-to-nearest remainder first, then +2π for negative results; this is
/// the Euclidean modulo the equivalent-phase formula requires.
fn equivalent_phase(phase1: &Image2D<f64>, phase2: &Image2D<f64>) -> Image2D<f64> {
    assert_eq!(phase1.dimensions(), phase2.dimensions());
    let eq: Vec<f64> = phase1
        .as_slice()
        .par_iter()
        .zip(phase2.as_slice().par_iter())
        .map(|(&a, &b)| {
            let diff = a - b;
            let mut m = diff - TAU * (diff / TAU).round();
            if m < 0.0 {
                m += TAU;
            }
            m
        })
        .collect();
    let (w, h) = phase1.dimensions();
    Image2D::from_vec(w, h, eq)
}

/// Unwrap `phase2` in place against the already-absolute `phase1` of the
/// longer equivalent wavelength `t1`: k = round((T₁/T₂·φ₁ − φ₂)/2π),
/// φ₂ ← φ₂ + 2π·k.
fn backward_unwrap(phase1: &Image2D<f64>, phase2: &mut Image2D<f64>, t1: f64, t2: f64) {
    let ratio = t1 / t2;
    phase2
        .as_mut_slice()
        .par_iter_mut()
        .zip(phase1.as_slice().par_iter())
        .for_each(|(p2, &p1)| {
            let k = (ratio * p1 - *p2) / TAU;
            *p2 += TAU * k.round();
        });
}

fn ensure_matching_phase(a: &Image2D<f64>, b: &Image2D<f64>) -> Result<()> {
    if a.dimensions() != b.dimensions() {
        return Err(Error::size_mismatch(a.dimensions(), b.dimensions()));
    }
    Ok(())
}

// ── Three frequencies ────────────────────────────────────────────────────────

/// Temporal unwrapping from three fringe frequencies.
///
/// `paths` holds the three N-step bundles back to back (N₁ then N₂ then N₃
/// images); fails with [`Error::FrameCountMismatch`] otherwise. `p` gives the
/// three fringe pitches, which must be pairwise distinct; the widest
/// equivalent period T₁₂₃ must span the field of view for the result to be
/// absolute.
pub fn three_freq_phase_unwrap<P: AsRef<Path>>(
    paths: &[P],
    p: [i32; 3],
    n: [usize; 3],
) -> Result<Image2D<f64>> {
    let expected = n[0] + n[1] + n[2];
    if paths.len() != expected {
        return Err(Error::FrameCountMismatch {
            expected,
            got: paths.len(),
        });
    }

    let frames = io::load_gray_all(paths)?;
    let phi1 = fringe::nstep_phase_shifting_frames(&frames[..n[0]], n[0])?;
    let phi2 = fringe::nstep_phase_shifting_frames(&frames[n[0]..n[0] + n[1]], n[1])?;
    let phi3 = fringe::nstep_phase_shifting_frames(&frames[expected - n[2]..], n[2])?;
    three_freq_unwrap_phases(phi1, phi2, phi3, p)
}

/// Cascade stage of [`three_freq_phase_unwrap`], starting from the three
/// wrapped phase maps.
pub fn three_freq_unwrap_phases(
    mut phi1: Image2D<f64>,
    mut phi2: Image2D<f64>,
    mut phi3: Image2D<f64>,
    p: [i32; 3],
) -> Result<Image2D<f64>> {
    assert!(
        p[0] != p[1] && p[1] != p[2] && p[0] != p[2],
        "fringe pitches must be pairwise distinct"
    );
    ensure_matching_phase(&phi1, &phi2)?;
    ensure_matching_phase(&phi1, &phi3)?;

    let (t1, t2, t3) = (p[0] as f64, p[1] as f64, p[2] as f64);
    let t12 = t1 * t2 / (t1 - t2).abs();
    let t23 = t2 * t3 / (t2 - t3).abs();
    let t123 = t12 * t3 / (t12 - t3).abs();
    debug!("three-frequency unwrap: T12 = {t12:.2}, T23 = {t23:.2}, T123 = {t123:.2}");

    let mut phi12 = equivalent_phase(&phi1, &phi2);
    let mut phi23 = equivalent_phase(&phi2, &phi3);
    let mut phi123 = equivalent_phase(&phi12, &phi3);

    // The widest equivalent phase is already absolute; clean its spikes
    // before they can seed fringe-order errors in the cascade.
    filter::suppress_spikes(&mut phi123);

    backward_unwrap(&phi123, &mut phi23, t123, t23);
    backward_unwrap(&phi23, &mut phi12, t23, t12);
    backward_unwrap(&phi12, &mut phi3, t12, t3);
    backward_unwrap(&phi3, &mut phi2, t3, t2);
    backward_unwrap(&phi2, &mut phi1, t2, t1);
    Ok(phi1)
}

// ── Two frequencies ──────────────────────────────────────────────────────────

/// Temporal unwrapping from two fringe frequencies; the equivalent period
/// T₁₂ = T₁T₂/|T₁−T₂| must span the field of view.
pub fn two_freq_phase_unwrap<P: AsRef<Path>>(
    paths: &[P],
    p: [i32; 2],
    n: [usize; 2],
) -> Result<Image2D<f64>> {
    let expected = n[0] + n[1];
    if paths.len() != expected {
        return Err(Error::FrameCountMismatch {
            expected,
            got: paths.len(),
        });
    }

    let frames = io::load_gray_all(paths)?;
    let phi1 = fringe::nstep_phase_shifting_frames(&frames[..n[0]], n[0])?;
    let phi2 = fringe::nstep_phase_shifting_frames(&frames[n[0]..], n[1])?;
    two_freq_unwrap_phases(phi1, phi2, p)
}

/// Cascade stage of [`two_freq_phase_unwrap`], starting from the two wrapped
/// phase maps.
pub fn two_freq_unwrap_phases(
    mut phi1: Image2D<f64>,
    mut phi2: Image2D<f64>,
    p: [i32; 2],
) -> Result<Image2D<f64>> {
    assert!(p[0] != p[1], "fringe pitches must be distinct");
    ensure_matching_phase(&phi1, &phi2)?;

    let (t1, t2) = (p[0] as f64, p[1] as f64);
    let t12 = t1 * t2 / (t1 - t2).abs();
    debug!("two-frequency unwrap: T12 = {t12:.2}");

    let mut phi12 = equivalent_phase(&phi1, &phi2);
    filter::suppress_spikes(&mut phi12);

    backward_unwrap(&phi12, &mut phi2, t12, t2);
    backward_unwrap(&phi2, &mut phi1, t2, t1);
    Ok(phi1)
}
