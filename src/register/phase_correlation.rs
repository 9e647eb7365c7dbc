//! FFT phase correlation for translation estimation.
//!
//! Both images are Hann-windowed over their own extent, centered in a
//! square power-of-two frame, and correlated through the normalized
//! cross-power spectrum. The peak of
//! the inverse transform gives the integer shift; a parabolic fit through
//! the peak's neighbours refines it to sub-pixel accuracy.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Estimated shift in pixels: `target` equals `reference` shifted by
/// `(dx, dy)`, where `dx` runs along columns (axis 1) and `dy` along rows
/// (axis 0).
#[derive(Debug, Clone, Copy)]
pub struct Shift {
    pub dx: f64,
    pub dy: f64,
    /// Correlation peak height; low values mean the estimate is unreliable.
    pub peak: f64,
}

/// Phase correlator for a fixed image size. FFT plans are reused across
/// calls.
pub struct PhaseCorrelator {
    fft_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    min_peak: f32,
}

impl PhaseCorrelator {
    pub fn new(width: usize, height: usize) -> Self {
        let fft_size = width.max(height).next_power_of_two();
        let mut planner = FftPlanner::new();
        Self {
            forward: planner.plan_fft_forward(fft_size),
            inverse: planner.plan_fft_inverse(fft_size),
            fft_size,
            min_peak: 0.05,
        }
    }

    /// Estimate the translation between two same-sized images, or `None`
    /// when no usable correlation peak exists (e.g. featureless inputs).
    pub fn estimate(
        &self,
        reference: &[f32],
        target: &[f32],
        width: usize,
        height: usize,
    ) -> Option<Shift> {
        if reference.len() != width * height || target.len() != width * height {
            return None;
        }

        let ref_fft = self.fft_2d(&self.embed(reference, width, height));
        let tar_fft = self.fft_2d(&self.embed(target, width, height));

        let n = self.fft_size;
        let cross: Vec<Complex<f32>> = ref_fft
            .iter()
            .zip(tar_fft.iter())
            .map(|(&a, &b)| {
                // conj(reference) * target puts the correlation peak at
                // the shift that carries reference onto target.
                let product = a.conj() * b;
                let magnitude = product.norm();
                if magnitude > 1e-10 {
                    product / magnitude
                } else {
                    Complex::new(0.0, 0.0)
                }
            })
            .collect();

        let correlation = self.ifft_2d(cross);

        let mut peak_val = f32::NEG_INFINITY;
        let (mut peak_x, mut peak_y) = (0usize, 0usize);
        for y in 0..n {
            for x in 0..n {
                let v = correlation[y * n + x];
                if v > peak_val {
                    peak_val = v;
                    peak_x = x;
                    peak_y = y;
                }
            }
        }
        if peak_val < self.min_peak {
            return None;
        }

        // Peaks past the midpoint wrap around to negative shifts.
        let dx = if peak_x > n / 2 {
            peak_x as f64 - n as f64
        } else {
            peak_x as f64
        };
        let dy = if peak_y > n / 2 {
            peak_y as f64 - n as f64
        } else {
            peak_y as f64
        };

        let (dx, dy) = self.refine_parabolic(&correlation, peak_x, peak_y, dx, dy);

        Some(Shift {
            dx,
            dy,
            peak: peak_val as f64,
        })
    }

    /// Center the image in the square FFT frame, windowed per axis to the
    /// image's own extent so intensity tapers to zero where the zero
    /// padding begins.
    fn embed(&self, image: &[f32], width: usize, height: usize) -> Vec<f32> {
        let n = self.fft_size;
        let window_x = hann_window(width);
        let window_y = hann_window(height);
        let mut framed = vec![0.0f32; n * n];
        let off_x = (n - width) / 2;
        let off_y = (n - height) / 2;

        for y in 0..height {
            let wy = window_y[y];
            for x in 0..width {
                framed[(y + off_y) * n + (x + off_x)] = image[y * width + x] * window_x[x] * wy;
            }
        }
        framed
    }

    fn fft_2d(&self, image: &[f32]) -> Vec<Complex<f32>> {
        let n = self.fft_size;
        let mut data: Vec<Complex<f32>> = image.iter().map(|&v| Complex::new(v, 0.0)).collect();
        for row in 0..n {
            self.forward.process(&mut data[row * n..(row + 1) * n]);
        }
        transpose_square(&mut data, n);
        for row in 0..n {
            self.forward.process(&mut data[row * n..(row + 1) * n]);
        }
        transpose_square(&mut data, n);
        data
    }

    fn ifft_2d(&self, mut data: Vec<Complex<f32>>) -> Vec<f32> {
        let n = self.fft_size;
        for row in 0..n {
            self.inverse.process(&mut data[row * n..(row + 1) * n]);
        }
        transpose_square(&mut data, n);
        for row in 0..n {
            self.inverse.process(&mut data[row * n..(row + 1) * n]);
        }
        transpose_square(&mut data, n);

        let norm = 1.0 / (n * n) as f32;
        data.iter().map(|c| c.re * norm).collect()
    }

    /// Parabolic fit through the peak and its four neighbours, with
    /// wraparound indexing.
    fn refine_parabolic(
        &self,
        correlation: &[f32],
        peak_x: usize,
        peak_y: usize,
        dx: f64,
        dy: f64,
    ) -> (f64, f64) {
        let n = self.fft_size as isize;
        let at = |x: isize, y: isize| -> f32 {
            let xx = x.rem_euclid(n) as usize;
            let yy = y.rem_euclid(n) as usize;
            correlation[yy * self.fft_size + xx]
        };

        let (px, py) = (peak_x as isize, peak_y as isize);
        let center = at(px, py);
        let left = at(px - 1, py);
        let right = at(px + 1, py);
        let up = at(px, py - 1);
        let down = at(px, py + 1);

        let denom_x = 2.0 * (left + right - 2.0 * center);
        let denom_y = 2.0 * (up + down - 2.0 * center);

        let sub_x = if denom_x.abs() > 1e-10 {
            dx + (left - right) as f64 / denom_x as f64
        } else {
            dx
        };
        let sub_y = if denom_y.abs() > 1e-10 {
            dy + (up - down) as f64 / denom_y as f64
        } else {
            dy
        };
        (sub_x, sub_y)
    }
}

/// 1-D Hann window.
fn hann_window(size: usize) -> Vec<f32> {
    use std::f32::consts::PI;
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}

/// In-place square matrix transpose.
fn transpose_square(data: &mut [Complex<f32>], n: usize) {
    for i in 0..n {
        for j in (i + 1)..n {
            data.swap(i * n + j, j * n + i);
        }
    }
}
