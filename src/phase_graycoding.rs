//! Absolute phase from phase shifting plus Gray coding.
//!
//! The wrapped phase supplies sub-fringe resolution, the decoded Gray code
//! the integer fringe order. Their transitions nominally coincide, so before
//! adding 2πk the wrapped phase is shifted by −π + π/p and rewrapped, which
//! moves its discontinuity half a fringe pixel away from the Gray
//! transitions; after the sum the shift is removed again. Residual off-by-one
//! decodes at the transitions survive as isolated ±2π spikes and are cleaned
//! by the median spike filter.

use std::f64::consts::{PI, TAU};
use std::path::Path;

use log::debug;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::filter;
use crate::fringe;
use crate::graycode;
use crate::image2d::Image2D;

/// Recover the absolute phase map from phase-shift images and Gray-code
/// images.
///
/// `paths_ps` are the N phase-shifted fringe captures, `paths_gc` the 2n
/// Gray-code pattern/inverse pairs, `p` the fringe pitch. Panics when `p` is
/// not positive.
pub fn phase_graycoding_unwrap<P: AsRef<Path>>(
    paths_ps: &[P],
    paths_gc: &[P],
    p: i32,
    n: usize,
) -> Result<Image2D<f64>> {
    let phi = fringe::nstep_phase_shifting(paths_ps, n)?;
    let orders = graycode::decimal_map(paths_gc)?;
    unwrap_with_fringe_orders(phi, &orders, p)
}

/// Combine an already-estimated wrapped phase with a fringe-order map.
///
/// Stage order is load-bearing: shift+rewrap first, then add 2πk, then
/// remove the shift, and only then run the spike correction.
pub fn unwrap_with_fringe_orders(
    mut phi: Image2D<f64>,
    orders: &Image2D<i32>,
    p: i32,
) -> Result<Image2D<f64>> {
    assert!(p > 0, "fringe pitch must be positive, got {p}");
    if orders.dimensions() != phi.dimensions() {
        return Err(Error::size_mismatch(phi.dimensions(), orders.dimensions()));
    }
    debug!(
        "phase+graycode unwrap: {}x{}, pitch {p}",
        phi.width(),
        phi.height()
    );

    let shift = -PI + PI / p as f64;
    phi.as_mut_slice()
        .par_iter_mut()
        .zip(orders.as_slice().par_iter())
        .for_each(|(v, &k)| {
            let shifted = *v + shift;
            let rewrapped = shifted.sin().atan2(shifted.cos());
            *v = rewrapped + TAU * k as f64 - shift;
        });

    filter::suppress_spikes(&mut phi);
    Ok(phi)
}
