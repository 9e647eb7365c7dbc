//! Integer mean-pool downsampling of tile images.
//!
//! Binning by factor f averages f pixels per axis into one. Trailing pixels
//! that do not fill a whole bin are trimmed. The output geometry keeps the
//! physical positions honest: spacing grows by the factor and the origin
//! moves to the center of the first bin.

use crate::tile::TileImage;

/// Advance a row-major odometer index. Returns false after the last index.
fn next_index(index: &mut [usize], dims: &[usize]) -> bool {
    for a in (0..index.len()).rev() {
        index[a] += 1;
        if index[a] < dims[a] {
            return true;
        }
        index[a] = 0;
    }
    false
}

/// Mean-pool `image` by the per-axis integer `factors`.
///
/// # Panics
/// Panics if `factors` length does not match the image dimensionality, any
/// factor is zero, or any axis is shorter than its factor.
pub fn bin_image(image: &TileImage, factors: &[usize]) -> TileImage {
    assert_eq!(factors.len(), image.ndim(), "one binning factor per axis");
    assert!(factors.iter().all(|&f| f >= 1), "factors must be >= 1");
    if factors.iter().all(|&f| f == 1) {
        return image.clone();
    }

    let ndim = image.ndim();
    let out_shape: Vec<usize> = image
        .shape
        .iter()
        .zip(factors)
        .map(|(&s, &f)| s / f)
        .collect();
    assert!(
        out_shape.iter().all(|&s| s >= 1),
        "axis shorter than its binning factor"
    );

    let block_size: usize = factors.iter().product();
    let mut pixels = Vec::with_capacity(out_shape.iter().product());

    let mut out_index = vec![0usize; ndim];
    loop {
        let mut sum = 0.0f64;
        let mut block = vec![0usize; ndim];
        loop {
            let mut flat = 0;
            for a in 0..ndim {
                flat = flat * image.shape[a] + out_index[a] * factors[a] + block[a];
            }
            sum += image.pixels[flat] as f64;
            if !next_index(&mut block, factors) {
                break;
            }
        }
        pixels.push((sum / block_size as f64) as f32);
        if !next_index(&mut out_index, &out_shape) {
            break;
        }
    }

    let spacing: Vec<f64> = image
        .spacing
        .iter()
        .zip(factors)
        .map(|(&s, &f)| s * f as f64)
        .collect();
    let origin: Vec<f64> = image
        .origin
        .iter()
        .zip(image.spacing.iter().zip(factors))
        .map(|(&o, (&s, &f))| o + s * (f as f64 - 1.0) / 2.0)
        .collect();

    TileImage::new(pixels, out_shape, origin, spacing)
}
