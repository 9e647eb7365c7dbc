//! Virtual-particle drift estimation.
//!
//! A full pixel grid of virtual particles is seeded periodically and
//! advected forward through dense optical flow between consecutive
//! downsampled frames. Each particle's trajectory is smoothed along time;
//! the per-timepoint mean of (smoothed - raw) position is the random drift
//! component, with the smooth part of the motion left untouched. Particles
//! that leave the frame turn NaN and silently drop out of the mean from
//! the first timepoint their smoothing window is affected.

use glam::DVec2;

use crate::common::par_map_limited;
use crate::config::VirtualParticleConfig;
use crate::drift::optical_flow::{estimate_flow, FlowField};
use crate::drift::DriftTrajectory;
use crate::math::smooth_series;
use crate::register::bin_image;
use crate::tile::TileImage;

/// Estimate per-timepoint drift corrections from particle trajectories.
pub fn estimate_particle_drift(
    frames: &[TileImage],
    config: &VirtualParticleConfig,
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

    let zoom = config.zoom_factor;
    let small: Vec<TileImage> = if zoom > 1 {
        frames.iter().map(|f| bin_image(f, &[zoom, zoom])).collect()
    } else {
        frames.to_vec()
    };
    let height = small[0].shape[0];
    let width = small[0].shape[1];
    let n = small.len();

    tracing::debug!(
        frames = n,
        width,
        height,
        zoom,
        "estimating drift from virtual particles"
    );

    let pair_indices: Vec<usize> = (0..n - 1).collect();
    let flows: Vec<FlowField> = par_map_limited(
        &pair_indices,
        rayon::current_num_threads().max(1),
        |&t| {
            estimate_flow(
                &small[t].pixels,
                &small[t + 1].pixels,
                width,
                height,
                &config.flow,
            )
        },
    );

    let starts: Vec<usize> = (0..n)
        .step_by(config.particle_reinstantiation_stepsize)
        .collect();

    // Per chain: per-timepoint component sums and counts of (smoothed - raw).
    let chain_sums: Vec<Vec<(f64, usize, f64, usize)>> = par_map_limited(
        &starts,
        rayon::current_num_threads().max(1),
        |&start| {
            let positions = advect_chain(&flows, width, height, start, n);
            chain_deviation_sums(&positions, config.sigma_t)
        },
    );

    let mut corrections = Vec::with_capacity(n);
    for t in 0..n {
        let mut sum_x = 0.0;
        let mut count_x = 0usize;
        let mut sum_y = 0.0;
        let mut count_y = 0usize;
        for (&start, sums) in starts.iter().zip(chain_sums.iter()) {
            if t < start {
                continue;
            }
            let (sx, cx, sy, cy) = sums[t - start];
            sum_x += sx;
            count_x += cx;
            sum_y += sy;
            count_y += cy;
        }
        let x = if count_x > 0 { sum_x / count_x as f64 } else { 0.0 };
        let y = if count_y > 0 { sum_y / count_y as f64 } else { 0.0 };
        if count_x == 0 || count_y == 0 {
            tracing::warn!(time = t, "no particle survived to this timepoint");
        }
        corrections.push(DVec2::new(x, y) * zoom as f64);
    }

    DriftTrajectory { corrections }
}

/// Seed a full pixel grid at `start` and advect it forward to `end`.
/// Returns positions indexed `[t - start][particle]`; particles that leave
/// the frame become NaN and stay NaN.
pub(crate) fn advect_chain(
    flows: &[FlowField],
    width: usize,
    height: usize,
    start: usize,
    end: usize,
) -> Vec<Vec<DVec2>> {
    let mut grid = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            grid.push(DVec2::new(x as f64, y as f64));
        }
    }

    let mut positions = Vec::with_capacity(end - start);
    positions.push(grid);
    for t in start..end - 1 {
        let current = positions.last().expect("chain has a seed");
        let next: Vec<DVec2> = current
            .iter()
            .map(|&p| p + flows[t].sample(p))
            .collect();
        positions.push(next);
    }
    positions
}

/// Per-timepoint sums of (smoothed - raw) over a chain's particles, with
/// per-component finite counts: `(sum_x, count_x, sum_y, count_y)`.
pub(crate) fn chain_deviation_sums(
    positions: &[Vec<DVec2>],
    sigma_t: f64,
) -> Vec<(f64, usize, f64, usize)> {
    let steps = positions.len();
    let particles = positions[0].len();
    let mut sums = vec![(0.0, 0usize, 0.0, 0usize); steps];
    if steps == 1 {
        // A single-timepoint chain has nothing to smooth; deviations are 0.
        for s in sums.iter_mut() {
            s.1 = particles;
            s.3 = particles;
        }
        return sums;
    }

    let mut series_x = vec![0.0f64; steps];
    let mut series_y = vec![0.0f64; steps];
    for particle in 0..particles {
        for t in 0..steps {
            series_x[t] = positions[t][particle].x;
            series_y[t] = positions[t][particle].y;
        }
        let smooth_x = smooth_series(&series_x, sigma_t);
        let smooth_y = smooth_series(&series_y, sigma_t);
        for t in 0..steps {
            let dx = smooth_x[t] - series_x[t];
            if dx.is_finite() {
                sums[t].0 += dx;
                sums[t].1 += 1;
            }
            let dy = smooth_y[t] - series_y[t];
            if dy.is_finite() {
                sums[t].2 += dy;
                sums[t].3 += 1;
            }
        }
    }
    sums
}
