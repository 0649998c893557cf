//! Unwrap a directory of captures with phase shifting + Gray coding and save
//! the normalized result as a PNG.
//!
//! Usage: `cargo run --example unwrap -- <image-dir> [N] [p]`
//!
//! The directory is read in lexicographic order: the first N images are the
//! phase-shift captures, the rest the Gray-code pattern pairs.

use std::path::PathBuf;

use phasekit::phase_graycoding::phase_graycoding_unwrap;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let dir = PathBuf::from(args.next().ok_or("usage: unwrap <image-dir> [N] [p]")?);
    let n: usize = args.next().map(|v| v.parse()).transpose()?.unwrap_or(18);
    let p: i32 = args.next().map(|v| v.parse()).transpose()?.unwrap_or(18);

    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    files.sort();
    if files.len() <= n {
        return Err(format!("{} images found, need more than N = {n}", files.len()).into());
    }

    let (ps, gc) = files.split_at(n);
    let phi = phase_graycoding_unwrap(ps, gc, p, n)?;

    let (min, max) = phi.min_max();
    let center = phi.at(phi.width() / 2, phi.height() / 2);
    println!("absolute phase: [{min:.4}, {max:.4}], center = {center:.4}");

    // Normalize to 8 bit for inspection.
    let range = (max - min).max(f64::EPSILON);
    let normalized = phi.map(|v| (255.0 * (v - min) / range).round() as u8);
    normalized.to_gray_image().save("unwrapped_phase.png")?;
    println!("saved unwrapped_phase.png");
    Ok(())
}
