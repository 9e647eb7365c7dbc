//! Gaussian smoothing along a time axis.
//!
//! Series are padded with their edge values (nearest mode). NaN samples
//! deliberately propagate through the kernel window: a sample that is
//! undefined at time t makes the smoothed value undefined wherever its
//! kernel support reaches, and NaN-aware averaging downstream drops those
//! entries instead of biasing the estimate.

/// Normalized 1-D Gaussian kernel with radius `ceil(4*sigma)`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    assert!(sigma > 0.0, "sigma must be positive, got {}", sigma);
    let radius = (4.0 * sigma).ceil() as usize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Smooth a scalar series with a Gaussian of width `sigma`, edge-padded.
pub fn smooth_series(values: &[f64], sigma: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = kernel.len() / 2;
    let last = values.len() - 1;

    (0..values.len())
        .map(|t| {
            let mut acc = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let offset = t as isize + k as isize - radius as isize;
                let idx = offset.clamp(0, last as isize) as usize;
                acc += w * values[idx];
            }
            acc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(2.0);
        let sum: f64 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(k.len() % 2, 1);
        for i in 0..k.len() / 2 {
            assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_smooth_constant_series_unchanged() {
        let values = vec![3.5; 20];
        let smoothed = smooth_series(&values, 2.0);
        for v in smoothed {
            assert!((v - 3.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_smooth_reduces_noise_amplitude() {
        // Alternating +/-1 around zero should shrink toward zero.
        let values: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let smoothed = smooth_series(&values, 2.0);
        for v in &smoothed[5..35] {
            assert!(v.abs() < 0.2, "residual noise {} too large", v);
        }
    }

    #[test]
    fn test_smooth_preserves_linear_trend_interior() {
        let values: Vec<f64> = (0..50).map(|i| i as f64 * 0.5).collect();
        let smoothed = smooth_series(&values, 1.5);
        // Away from the edges a linear ramp is an eigenfunction of a
        // symmetric kernel.
        for t in 10..40 {
            assert!((smoothed[t] - values[t]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_nan_propagates_through_window() {
        let mut values = vec![1.0; 30];
        values[15] = f64::NAN;
        let smoothed = smooth_series(&values, 1.0);
        let radius = gaussian_kernel(1.0).len() / 2;
        assert!(smoothed[15].is_nan());
        assert!(smoothed[15 - radius].is_nan());
        assert!(smoothed[15 + radius].is_nan());
        assert!(smoothed[15 - radius - 1].is_finite());
        assert!(smoothed[15 + radius + 1].is_finite());
    }

}
