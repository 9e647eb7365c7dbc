//! Synthetic data helpers shared by unit tests.

use std::collections::HashMap;

use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::math::smooth_series;
use crate::register::bilinear_sample;
use crate::tile::{TileId, TileImage, TileLoadError, TileSource};

/// Route tracing output to the test harness; safe to call repeatedly.
pub(crate) fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic scene of Gaussian blobs, row-major `f32`.
pub(crate) fn blob_scene(width: usize, height: usize, num_blobs: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = vec![0.0f32; width * height];

    for _ in 0..num_blobs {
        let cx = rng.random_range(0.0..width as f64);
        let cy = rng.random_range(0.0..height as f64);
        let sigma: f64 = rng.random_range(1.5..3.5);
        let amplitude = rng.random_range(0.4..1.0);
        let radius = (3.0 * sigma).ceil() as isize;

        for dy in -radius..=radius {
            let y = cy.round() as isize + dy;
            if y < 0 || y >= height as isize {
                continue;
            }
            for dx in -radius..=radius {
                let x = cx.round() as isize + dx;
                if x < 0 || x >= width as isize {
                    continue;
                }
                let dist2 = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
                let value = amplitude * (-dist2 / (2.0 * sigma * sigma)).exp();
                scene[y as usize * width + x as usize] += value as f32;
            }
        }
    }
    scene
}

/// Translate image content by `(dx, dy)` pixels, bilinear with zero fill.
pub(crate) fn shift_pixels(
    image: &[f32],
    width: usize,
    height: usize,
    dx: f64,
    dy: f64,
) -> Vec<f32> {
    let mut shifted = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            shifted.push(bilinear_sample(
                image,
                width,
                height,
                x as f64 - dx,
                y as f64 - dy,
            ));
        }
    }
    shifted
}

/// Densely textured timelapse whose frames are one scene translated by a
/// random jitter trajectory. Returns the frames and the jitter (x = column,
/// y = row); the first frame has zero jitter.
pub(crate) fn jittered_timelapse(
    width: usize,
    height: usize,
    frames: usize,
    amplitude: f64,
    seed: u64,
) -> (Vec<TileImage>, Vec<DVec2>) {
    drifting_timelapse(width, height, frames, DVec2::ZERO, amplitude, seed)
}

/// Timelapse whose offset trajectory is a smooth linear drift plus random
/// jitter: `offset[t] = step * t + jitter[t]`. Returns the frames and the
/// full offset trajectory; the first frame has zero offset.
pub(crate) fn drifting_timelapse(
    width: usize,
    height: usize,
    frames: usize,
    step: DVec2,
    amplitude: f64,
    seed: u64,
) -> (Vec<TileImage>, Vec<DVec2>) {
    let scene = blob_scene(width, height, (width * height) / 16, seed);
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));

    let mut offsets = Vec::with_capacity(frames);
    offsets.push(DVec2::ZERO);
    for t in 1..frames {
        let jitter = if amplitude > 0.0 {
            DVec2::new(
                rng.random_range(-amplitude..amplitude),
                rng.random_range(-amplitude..amplitude),
            )
        } else {
            DVec2::ZERO
        };
        offsets.push(step * t as f64 + jitter);
    }

    let images = offsets
        .iter()
        .map(|o| {
            TileImage::new(
                shift_pixels(&scene, width, height, o.x, o.y),
                vec![height, width],
                vec![0.0, 0.0],
                vec![1.0, 1.0],
            )
        })
        .collect();

    (images, offsets)
}

/// Per-component `smooth(trajectory) - trajectory`, the correction a drift
/// estimator should reproduce for a known jitter trajectory.
pub(crate) fn smooth_minus_raw(trajectory: &[DVec2], sigma: f64) -> Vec<DVec2> {
    let raw_x: Vec<f64> = trajectory.iter().map(|p| p.x).collect();
    let raw_y: Vec<f64> = trajectory.iter().map(|p| p.y).collect();
    let smooth_x = smooth_series(&raw_x, sigma);
    let smooth_y = smooth_series(&raw_y, sigma);
    (0..trajectory.len())
        .map(|t| DVec2::new(smooth_x[t] - raw_x[t], smooth_y[t] - raw_y[t]))
        .collect()
}

/// In-memory tile source keyed by `(tile, channel, time)`.
pub(crate) struct MapSource {
    images: HashMap<(TileId, usize, usize), TileImage>,
}

impl MapSource {
    pub(crate) fn new() -> Self {
        Self {
            images: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, tile: TileId, channel: usize, time: usize, image: TileImage) {
        self.images.insert((tile, channel, time), image);
    }
}

impl TileSource for MapSource {
    fn image(
        &self,
        tile: TileId,
        channel: usize,
        time: usize,
    ) -> Result<TileImage, TileLoadError> {
        self.images.get(&(tile, channel, time)).cloned().ok_or_else(|| {
            TileLoadError::new(format!(
                "no image for tile {tile} channel {channel} at time {time}"
            ))
        })
    }
}
