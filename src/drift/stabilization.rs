//! Phase-correlation drift estimation.
//!
//! The shift between each pair of consecutive frames is estimated by phase
//! correlation and accumulated into a trajectory of the scene's apparent
//! motion. Gaussian smoothing along time separates deliberate motion from
//! random drift; the correction per timepoint is the smoothed trajectory
//! minus the raw one.

use glam::DVec2;

use crate::config::StabilizationConfig;
use crate::drift::DriftTrajectory;
use crate::math::smooth_series;
use crate::register::PhaseCorrelator;
use crate::tile::TileImage;

/// Estimate per-timepoint drift corrections from cumulative frame shifts.
pub fn estimate_stabilization_drift(
    frames: &[TileImage],
    config: &StabilizationConfig,
) -> DriftTrajectory {
    config.validate();
    assert!(frames.len() >= 2, "drift estimation needs at least 2 frames");
    assert!(
        frames.iter().all(|f| f.ndim() == 2),
        "drift estimation expects 2-D frames"
    );
    assert!(
        frames.iter().all(|f| f.shape == frames[0].shape),
        "all frames must share one shape"
    );

    let height = frames[0].shape[0];
    let width = frames[0].shape[1];
    let correlator = PhaseCorrelator::new(width, height);

    // Cumulative scene trajectory; frame 0 is the anchor at zero.
    let mut cumulative = Vec::with_capacity(frames.len());
    let mut position = DVec2::ZERO;
    cumulative.push(position);
    for t in 0..frames.len() - 1 {
        let step = match correlator.estimate(
            &frames[t].pixels,
            &frames[t + 1].pixels,
            width,
            height,
        ) {
            Some(shift) => DVec2::new(shift.dx, shift.dy),
            None => {
                tracing::warn!(time = t, "no correlation peak between frames, assuming no shift");
                DVec2::ZERO
            }
        };
        position += step;
        cumulative.push(position);
    }

    let raw_x: Vec<f64> = cumulative.iter().map(|p| p.x).collect();
    let raw_y: Vec<f64> = cumulative.iter().map(|p| p.y).collect();
    let smooth_x = smooth_series(&raw_x, config.sigma);
    let smooth_y = smooth_series(&raw_y, config.sigma);

    let corrections = (0..frames.len())
        .map(|t| DVec2::new(smooth_x[t] - raw_x[t], smooth_y[t] - raw_y[t]))
        .collect();

    DriftTrajectory { corrections }
}
