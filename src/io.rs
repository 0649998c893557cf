//! Grayscale image loading.
//!
//! Decoding is delegated to the `image` crate; everything past this module
//! operates on owned [`Image2D`] buffers only.

use std::path::Path;

use log::trace;

use crate::error::{Error, Result};
use crate::image2d::Image2D;

/// Load a single image and convert it to 8-bit grayscale.
pub fn load_gray(path: impl AsRef<Path>) -> Result<Image2D<u8>> {
    let path = path.as_ref();
    let img = image::open(path)?.to_luma8();
    trace!("loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(img.into())
}

/// Load an ordered list of images, enforcing that they all share one shape.
pub fn load_gray_all<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Image2D<u8>>> {
    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        let frame = load_gray(path)?;
        if let Some(first) = frames.first() {
            let first: &Image2D<u8> = first;
            if frame.dimensions() != first.dimensions() {
                return Err(Error::size_mismatch(first.dimensions(), frame.dimensions()));
            }
        }
        frames.push(frame);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &std::path::Path, name: &str, img: &Image2D<u8>) -> std::path::PathBuf {
        let path = dir.join(name);
        img.to_gray_image().save(&path).unwrap();
        path
    }

    #[test]
    fn load_gray_round_trips_pixel_values() {
        let dir = tempfile::tempdir().unwrap();
        let img = Image2D::from_fn(5, 4, |x, y| (x * 50 + y * 10) as u8);
        let path = write_png(dir.path(), "a.png", &img);

        let loaded = load_gray(&path).unwrap();
        assert_eq!(loaded, img);
    }

    #[test]
    fn load_gray_all_rejects_mixed_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", &Image2D::new(4, 4, 0u8));
        let b = write_png(dir.path(), "b.png", &Image2D::new(4, 3, 0u8));

        let err = load_gray_all(&[a, b]).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }

    #[test]
    fn missing_file_surfaces_image_error() {
        let err = load_gray("definitely/not/here.png").unwrap_err();
        assert!(matches!(err, Error::Image(_)));
    }
}
