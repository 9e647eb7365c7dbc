//! Timelapse drift correction.
//!
//! Both estimators produce a [`DriftTrajectory`]: one correction vector per
//! timepoint, where `x` is the column (axis 1) and `y` the row (axis 0)
//! component in full-resolution pixels. Applying a correction translates
//! the frame's content by exactly that vector, cancelling the random part
//! of the scene's motion while leaving the smooth part alone.

pub mod optical_flow;
pub mod particles;
pub mod stabilization;

pub use optical_flow::{estimate_flow, FlowField};
pub use particles::estimate_particle_drift;
pub use stabilization::estimate_stabilization_drift;

use glam::DVec2;

use crate::config::DriftMethod;
use crate::register::bilinear_sample;
use crate::tile::TileImage;

/// Per-timepoint drift corrections. Immutable once computed.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftTrajectory {
    pub corrections: Vec<DVec2>,
}

impl DriftTrajectory {
    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn get(&self, time: usize) -> Option<DVec2> {
        self.corrections.get(time).copied()
    }
}

/// Estimate drift corrections for a timelapse with the given method.
pub fn estimate_drift(frames: &[TileImage], method: &DriftMethod) -> DriftTrajectory {
    match method {
        DriftMethod::VirtualParticles(config) => estimate_particle_drift(frames, config),
        DriftMethod::Stabilization(config) => estimate_stabilization_drift(frames, config),
    }
}

/// Translate each frame's content by its correction vector, bilinear with
/// zero fill at the borders. Geometry metadata is left untouched.
pub fn apply_drift(frames: &[TileImage], trajectory: &DriftTrajectory) -> Vec<TileImage> {
    assert_eq!(
        frames.len(),
        trajectory.len(),
        "one correction per frame required"
    );

    frames
        .iter()
        .zip(trajectory.corrections.iter())
        .map(|(frame, &correction)| {
            assert_eq!(frame.ndim(), 2, "drift application expects 2-D frames");
            let height = frame.shape[0];
            let width = frame.shape[1];
            let mut pixels = Vec::with_capacity(width * height);
            for y in 0..height {
                for x in 0..width {
                    let sx = x as f64 - correction.x;
                    let sy = y as f64 - correction.y;
                    pixels.push(bilinear_sample(&frame.pixels, width, height, sx, sy));
                }
            }
            TileImage::new(
                pixels,
                frame.shape.clone(),
                frame.origin.clone(),
                frame.spacing.clone(),
            )
        })
        .collect()
}
