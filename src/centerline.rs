//! Seed-point estimation and spatial flood-fill unwrapping.
//!
//! The two centerline captures (one vertical, one horizontal projected line)
//! locate a reliable starting pixel: each is masked, Otsu-binarized, and the
//! centroid of the line intersection becomes the seed. Unwrapping then grows
//! outward from the seed over the 8-connected mask region, removing the 2π
//! step between every pixel and the neighbor it was reached from.

use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::filter;
use crate::image2d::Image2D;
use crate::io;

/// 8-neighborhood scan order: the 3×3 window in row-major order, center
/// excluded. Fixed so results are reproducible.
const NEIGHBORS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

// ── Seed point ───────────────────────────────────────────────────────────────

/// Locate the unwrapping seed from vertical and horizontal centerline images.
///
/// Both images and the mask must agree in shape. Returns the rounded
/// centroid `(x, y)` of the intersection of the two binarized lines, or
/// [`Error::EmptyIntersection`] when the lines never cross inside the mask.
pub fn seed_point<P: AsRef<Path>>(
    path_clx: P,
    path_cly: P,
    mask: &Image2D<u8>,
) -> Result<(u32, u32)> {
    let clx = io::load_gray(path_clx)?;
    let cly = io::load_gray(path_cly)?;
    for img in [&clx, &cly] {
        if img.dimensions() != mask.dimensions() {
            return Err(Error::size_mismatch(mask.dimensions(), img.dimensions()));
        }
    }

    let bw1 = filter::otsu_binarize(&filter::mask_apply(&clx, mask));
    let bw2 = filter::otsu_binarize(&filter::mask_apply(&cly, mask));

    let (w, h) = mask.dimensions();
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    let mut count = 0usize;
    for y in 0..h {
        for x in 0..w {
            if bw1.at(x, y) != 0 && bw2.at(x, y) != 0 {
                sum_x += x as f64;
                sum_y += y as f64;
                count += 1;
            }
        }
    }
    if count == 0 {
        return Err(Error::EmptyIntersection);
    }

    let seed = (
        (sum_x / count as f64).round() as u32,
        (sum_y / count as f64).round() as u32,
    );
    debug!("seed point ({}, {}) from {count} intersection pixels", seed.0, seed.1);
    Ok(seed)
}

// ── Flood-fill unwrapping ────────────────────────────────────────────────────

/// Unwrap `phased` by BFS flood fill from `seed` over the mask region.
///
/// Every pixel is enqueued exactly once: it leaves the (locally copied) mask
/// the moment it is enqueued, so the traversal is deterministic given the
/// fixed neighbor order. Pixels outside the mask, and regions not connected
/// to the seed, keep their wrapped values.
pub fn spatial_unwrap(
    phased: &Image2D<f64>,
    seed: (u32, u32),
    mask: &Image2D<u8>,
) -> Result<Image2D<f64>> {
    if mask.dimensions() != phased.dimensions() {
        return Err(Error::size_mismatch(phased.dimensions(), mask.dimensions()));
    }
    let (w, h) = phased.dimensions();
    let (sx, sy) = seed;
    if sx >= w || sy >= h || mask.at(sx, sy) == 0 {
        return Err(Error::SeedOutsideMask { x: sx, y: sy });
    }

    // The caller's mask survives; only this copy is consumed by the fill.
    let mut mask = mask.clone();
    let mut unwrapped = phased.clone();

    let mut queue = VecDeque::new();
    queue.push_back((sx, sy));
    mask.set(sx, sy, 0);

    while let Some((px, py)) = queue.pop_front() {
        let continuous = unwrapped.at(px, py);
        let discontinuous = phased.at(px, py);

        for (dx, dy) in NEIGHBORS {
            let nx = px as i64 + dx;
            let ny = py as i64 + dy;
            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if mask.at(nx, ny) == 0 {
                continue;
            }

            // Carry the neighbor's wrapped offset over, minus its 2π step.
            let d = (phased.at(nx, ny) - discontinuous) / TAU;
            unwrapped.set(nx, ny, continuous + TAU * (d - d.round()));

            queue.push_back((nx, ny));
            mask.set(nx, ny, 0);
        }
    }
    Ok(unwrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn wrap(v: f64) -> f64 {
        v.sin().atan2(v.cos())
    }

    #[test]
    fn one_row_unwrap_repairs_the_step() {
        let phased = Image2D::from_vec(5, 1, vec![0.0, 1.0, 2.0, 3.0 - TAU, 3.0]);
        let mask = Image2D::new(5, 1, 1u8);
        let unwrapped = spatial_unwrap(&phased, (0, 0), &mask).unwrap();
        for (x, expected) in [0.0, 1.0, 2.0, 3.0, 3.0].into_iter().enumerate() {
            assert_abs_diff_eq!(unwrapped.at(x as u32, 0), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn unwrapped_field_differs_from_ramp_by_one_constant() {
        let truth = |x: u32, y: u32| 0.55 * x as f64 + 0.35 * y as f64;
        let phased = Image2D::from_fn(20, 14, |x, y| wrap(truth(x, y)));
        let mask = Image2D::new(20, 14, 255u8);

        let unwrapped = spatial_unwrap(&phased, (9, 7), &mask).unwrap();
        let offset = unwrapped.at(0, 0) - truth(0, 0);
        assert_abs_diff_eq!(offset / TAU, (offset / TAU).round(), epsilon = 1e-9);
        for y in 0..14 {
            for x in 0..20 {
                assert_abs_diff_eq!(
                    unwrapped.at(x, y),
                    truth(x, y) + offset,
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn neighbor_differences_stay_below_pi() {
        let phased = Image2D::from_fn(16, 16, |x, y| wrap(0.8 * x as f64 - 0.4 * y as f64));
        let mask = Image2D::new(16, 16, 1u8);
        let unwrapped = spatial_unwrap(&phased, (3, 12), &mask).unwrap();

        for y in 0..16u32 {
            for x in 0..16u32 {
                for (dx, dy) in NEIGHBORS {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= 16 || ny >= 16 {
                        continue;
                    }
                    let step =
                        (unwrapped.at(nx as u32, ny as u32) - unwrapped.at(x, y)).abs();
                    assert!(step <= std::f64::consts::PI + 1e-9, "step {step} at ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn masked_out_pixels_keep_wrapped_values() {
        let phased = Image2D::from_fn(8, 8, |x, _| wrap(0.9 * x as f64));
        let mut mask = Image2D::new(8, 8, 255u8);
        for y in 2..5 {
            for x in 5..8 {
                mask.set(x, y, 0);
            }
        }

        let unwrapped = spatial_unwrap(&phased, (0, 0), &mask).unwrap();
        for y in 2..5 {
            for x in 5..8 {
                assert_eq!(unwrapped.at(x, y), phased.at(x, y));
            }
        }
    }

    #[test]
    fn seed_must_lie_inside_the_mask() {
        let phased = Image2D::new(4, 4, 0.0f64);
        let mut mask = Image2D::new(4, 4, 255u8);
        mask.set(2, 2, 0);

        assert!(matches!(
            spatial_unwrap(&phased, (2, 2), &mask),
            Err(Error::SeedOutsideMask { x: 2, y: 2 })
        ));
        assert!(matches!(
            spatial_unwrap(&phased, (4, 0), &mask),
            Err(Error::SeedOutsideMask { x: 4, y: 0 })
        ));
    }

    #[test]
    fn mask_shape_must_match_phase() {
        let phased = Image2D::new(4, 4, 0.0f64);
        let mask = Image2D::new(4, 5, 255u8);
        assert!(matches!(
            spatial_unwrap(&phased, (0, 0), &mask),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn seed_point_finds_centerline_crossing() {
        let dir = tempfile::tempdir().unwrap();
        let vertical = Image2D::from_fn(6, 6, |x, _| if x == 4 { 255u8 } else { 0 });
        let horizontal = Image2D::from_fn(6, 6, |_, y| if y == 3 { 255u8 } else { 0 });
        let clx = dir.path().join("clx.png");
        let cly = dir.path().join("cly.png");
        vertical.to_gray_image().save(&clx).unwrap();
        horizontal.to_gray_image().save(&cly).unwrap();

        let mask = Image2D::new(6, 6, 1u8);
        assert_eq!(seed_point(&clx, &cly, &mask).unwrap(), (4, 3));
    }

    #[test]
    fn seed_point_reports_empty_intersection() {
        let dir = tempfile::tempdir().unwrap();
        // Vertical line only in the top rows, horizontal line at the bottom.
        let vertical = Image2D::from_fn(6, 6, |x, y| if x == 1 && y < 2 { 255u8 } else { 0 });
        let horizontal = Image2D::from_fn(6, 6, |_, y| if y == 5 { 255u8 } else { 0 });
        let clx = dir.path().join("clx.png");
        let cly = dir.path().join("cly.png");
        vertical.to_gray_image().save(&clx).unwrap();
        horizontal.to_gray_image().save(&cly).unwrap();

        let mask = Image2D::new(6, 6, 255u8);
        assert!(matches!(
            seed_point(&clx, &cly, &mask),
            Err(Error::EmptyIntersection)
        ));
    }
}
