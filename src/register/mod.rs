//! Pairwise tile registration.
//!
//! The engine treats the actual estimator as a pluggable
//! [`RegistrationPrimitive`]: given the fixed and moving tile images it
//! returns the homogeneous transform mapping moving physical coordinates
//! into fixed physical coordinates. [`TranslationPrimitive`] is the built-in
//! implementation, estimating a pure translation by phase correlation over
//! the physical overlap region of the pair.

pub mod binning;
pub mod phase_correlation;

pub use binning::bin_image;
pub use phase_correlation::{PhaseCorrelator, Shift};

use crate::error::RegistrationFailure;
use crate::math::HMat;
use crate::tile::TileImage;

/// Estimator turning a pair of placed tile images into the transform that
/// maps moving physical coordinates into fixed physical coordinates.
///
/// Implementations must be pure: no internal state mutation, so the same
/// inputs always give the same transform and calls can run concurrently.
pub trait RegistrationPrimitive: Sync {
    fn register(&self, fixed: &TileImage, moving: &TileImage)
        -> Result<HMat, RegistrationFailure>;
}

/// Translation-only registration via phase correlation of the overlap
/// region. 2-D images only.
#[derive(Debug, Clone)]
pub struct TranslationPrimitive {
    /// Minimum overlap extent in pixels per axis; anything narrower cannot
    /// produce a usable correlation peak.
    pub min_overlap_px: usize,
}

impl Default for TranslationPrimitive {
    fn default() -> Self {
        Self { min_overlap_px: 4 }
    }
}

impl RegistrationPrimitive for TranslationPrimitive {
    fn register(
        &self,
        fixed: &TileImage,
        moving: &TileImage,
    ) -> Result<HMat, RegistrationFailure> {
        let ndim = fixed.ndim();
        if ndim != 2 || moving.ndim() != 2 {
            return Err(RegistrationFailure::UnsupportedDimension {
                ndim: ndim.max(moving.ndim()),
            });
        }

        let (fixed_roi, moving_roi, shape) = self.extract_overlap(fixed, moving)?;
        let (height, width) = (shape[0], shape[1]);

        let correlator = PhaseCorrelator::new(width, height);
        let shift = correlator
            .estimate(&fixed_roi, &moving_roi, width, height)
            .ok_or(RegistrationFailure::DidNotConverge)?;

        // The moving image appears shifted by (dx, dy) grid steps relative
        // to the fixed image, so mapping moving coordinates into fixed
        // coordinates moves them the opposite way, in physical units.
        let translation = [
            -shift.dy * fixed.spacing[0],
            -shift.dx * fixed.spacing[1],
        ];
        Ok(HMat::translation(&translation))
    }
}

impl TranslationPrimitive {
    /// Sample both tiles over their common physical window onto one grid
    /// (the fixed tile's spacing), returning the two patches and the grid
    /// shape `[rows, cols]`.
    fn extract_overlap(
        &self,
        fixed: &TileImage,
        moving: &TileImage,
    ) -> Result<(Vec<f32>, Vec<f32>, [usize; 2]), RegistrationFailure> {
        let mut lo = [0.0f64; 2];
        let mut extent = [0usize; 2];
        for axis in 0..2 {
            let f_end = fixed.origin[axis] + fixed.spacing[axis] * fixed.shape[axis] as f64;
            let m_end = moving.origin[axis] + moving.spacing[axis] * moving.shape[axis] as f64;
            let start = fixed.origin[axis].max(moving.origin[axis]);
            let length = f_end.min(m_end) - start;
            if length <= 0.0 {
                return Err(RegistrationFailure::NoOverlap);
            }
            let n = (length / fixed.spacing[axis]).floor() as usize;
            if n < self.min_overlap_px {
                return Err(RegistrationFailure::DegenerateOverlap { axis, extent: n });
            }
            lo[axis] = start;
            extent[axis] = n;
        }

        let (rows, cols) = (extent[0], extent[1]);
        let mut fixed_roi = Vec::with_capacity(rows * cols);
        let mut moving_roi = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            let p0 = lo[0] + r as f64 * fixed.spacing[0];
            for c in 0..cols {
                let p1 = lo[1] + c as f64 * fixed.spacing[1];
                fixed_roi.push(sample_at_physical(fixed, p0, p1));
                moving_roi.push(sample_at_physical(moving, p0, p1));
            }
        }
        Ok((fixed_roi, moving_roi, [rows, cols]))
    }
}

/// Bilinear sample of a 2-D tile at a physical position, zero outside.
fn sample_at_physical(image: &TileImage, p0: f64, p1: f64) -> f32 {
    let y = (p0 - image.origin[0]) / image.spacing[0];
    let x = (p1 - image.origin[1]) / image.spacing[1];
    bilinear_sample(&image.pixels, image.shape[1], image.shape[0], x, y)
}

/// Bilinear interpolation over a row-major buffer, zero outside the bounds.
pub(crate) fn bilinear_sample(pixels: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    let x0 = x.floor() as isize;
    let y0 = y.floor() as isize;
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let at = |px: isize, py: isize| -> f32 {
        if px >= 0 && px < width as isize && py >= 0 && py < height as isize {
            pixels[py as usize * width + px as usize]
        } else {
            0.0
        }
    };

    let top = at(x0, y0) + fx * (at(x0 + 1, y0) - at(x0, y0));
    let bottom = at(x0, y0 + 1) + fx * (at(x0 + 1, y0 + 1) - at(x0, y0 + 1));
    top + fy * (bottom - top)
}
