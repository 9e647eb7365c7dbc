//! Dense iterative Lucas-Kanade optical flow.
//!
//! Estimates a per-pixel displacement field between two frames: content at
//! position `p` in the first frame appears at `p + flow(p)` in the second.
//! Each iteration warps the second frame by the current flow, then solves
//! the local least-squares system over a square window around every pixel
//! and adds the increment. Good for the small inter-frame motions drift
//! estimation deals with; large displacements need a pyramid this
//! deliberately does not have.

use glam::DVec2;

use crate::config::FlowConfig;

/// Dense 2-D displacement field. `u` is the column (x) component and `v`
/// the row (y) component, both row-major over the frame.
#[derive(Debug, Clone)]
pub struct FlowField {
    pub u: Vec<f32>,
    pub v: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl FlowField {
    pub fn zero(width: usize, height: usize) -> Self {
        Self {
            u: vec![0.0; width * height],
            v: vec![0.0; width * height],
            width,
            height,
        }
    }

    /// Bilinear flow sample at a fractional position. Positions outside
    /// the frame (or non-finite positions) yield NaN components.
    pub fn sample(&self, position: DVec2) -> DVec2 {
        let (x, y) = (position.x, position.y);
        if !x.is_finite()
            || !y.is_finite()
            || x < 0.0
            || y < 0.0
            || x > (self.width - 1) as f64
            || y > (self.height - 1) as f64
        {
            return DVec2::new(f64::NAN, f64::NAN);
        }

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        let lerp2 = |field: &[f32]| -> f64 {
            let p00 = field[y0 * self.width + x0] as f64;
            let p10 = field[y0 * self.width + x1] as f64;
            let p01 = field[y1 * self.width + x0] as f64;
            let p11 = field[y1 * self.width + x1] as f64;
            let top = p00 + fx * (p10 - p00);
            let bottom = p01 + fx * (p11 - p01);
            top + fy * (bottom - top)
        };

        DVec2::new(lerp2(&self.u), lerp2(&self.v))
    }
}

/// Estimate the dense flow carrying `prev` onto `next`.
pub fn estimate_flow(
    prev: &[f32],
    next: &[f32],
    width: usize,
    height: usize,
    config: &FlowConfig,
) -> FlowField {
    assert_eq!(prev.len(), width * height);
    assert_eq!(next.len(), width * height);
    config.validate();

    let mut flow = FlowField::zero(width, height);
    let (grad_x, grad_y) = spatial_gradients(prev, width, height);
    let radius = config.window_radius as isize;

    for _ in 0..config.iterations {
        // Warp the second frame back by the current flow so each iteration
        // only solves for the residual motion.
        let warped: Vec<f32> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                let idx = y * width + x;
                sample_clamped(
                    next,
                    width,
                    height,
                    x as f64 + flow.u[idx] as f64,
                    y as f64 + flow.v[idx] as f64,
                )
            })
            .collect();

        let mut du = vec![0.0f32; width * height];
        let mut dv = vec![0.0f32; width * height];

        for y in 0..height as isize {
            for x in 0..width as isize {
                let mut sum_xx = 0.0f64;
                let mut sum_xy = 0.0f64;
                let mut sum_yy = 0.0f64;
                let mut sum_xt = 0.0f64;
                let mut sum_yt = 0.0f64;

                for wy in -radius..=radius {
                    let py = (y + wy).clamp(0, height as isize - 1) as usize;
                    for wx in -radius..=radius {
                        let px = (x + wx).clamp(0, width as isize - 1) as usize;
                        let idx = py * width + px;
                        let ix = grad_x[idx] as f64;
                        let iy = grad_y[idx] as f64;
                        let it = (warped[idx] - prev[idx]) as f64;
                        sum_xx += ix * ix;
                        sum_xy += ix * iy;
                        sum_yy += iy * iy;
                        sum_xt += ix * it;
                        sum_yt += iy * it;
                    }
                }

                // Solve the 2x2 normal equations; skip flat windows.
                let det = sum_xx * sum_yy - sum_xy * sum_xy;
                if det.abs() > 1e-9 {
                    let idx = y as usize * width + x as usize;
                    du[idx] = ((-sum_yy * sum_xt + sum_xy * sum_yt) / det) as f32;
                    dv[idx] = ((sum_xy * sum_xt - sum_xx * sum_yt) / det) as f32;
                }
            }
        }

        for idx in 0..width * height {
            flow.u[idx] += du[idx];
            flow.v[idx] += dv[idx];
        }
    }

    flow
}

/// Central-difference spatial gradients, clamped at the borders.
fn spatial_gradients(image: &[f32], width: usize, height: usize) -> (Vec<f32>, Vec<f32>) {
    let mut gx = vec![0.0f32; width * height];
    let mut gy = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let xm = x.saturating_sub(1);
            let xp = (x + 1).min(width - 1);
            let ym = y.saturating_sub(1);
            let yp = (y + 1).min(height - 1);
            gx[y * width + x] = (image[y * width + xp] - image[y * width + xm]) / 2.0;
            gy[y * width + x] = (image[yp * width + x] - image[ym * width + x]) / 2.0;
        }
    }
    (gx, gy)
}

/// Bilinear sample clamped to the frame bounds.
fn sample_clamped(image: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    let x = x.clamp(0.0, (width - 1) as f64);
    let y = y.clamp(0.0, (height - 1) as f64);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let top = image[y0 * width + x0] + fx * (image[y0 * width + x1] - image[y0 * width + x0]);
    let bottom = image[y1 * width + x0] + fx * (image[y1 * width + x1] - image[y1 * width + x0]);
    top + fy * (bottom - top)
}
