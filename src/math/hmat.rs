//! Row-major homogeneous transform matrix for 2-D or 3-D physical space.

use std::ops::{Index, IndexMut, Mul};

/// Square (d+1)×(d+1) homogeneous matrix over `f64`, row-major.
///
/// For d = 2 the layout is:
/// ```text
/// | a  b  tx |   | m[(0,0)] m[(0,1)] m[(0,2)] |
/// | c  d  ty | = | m[(1,0)] m[(1,1)] m[(1,2)] |
/// | 0  0  1  |   | m[(2,0)] m[(2,1)] m[(2,2)] |
/// ```
///
/// Translation components live in the last column; point coordinates are
/// given in axis order (axis 0 first). Composition is plain matrix
/// multiplication: `a.mul_mat(&b)` applies `b` first, then `a`.
#[derive(Debug, Clone, PartialEq)]
pub struct HMat {
    dim: usize,
    data: Vec<f64>,
}

impl HMat {
    /// Identity matrix for `dim` spatial dimensions.
    pub fn identity(dim: usize) -> Self {
        assert!(dim >= 1, "HMat requires at least one spatial dimension");
        let n = dim + 1;
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self { dim, data }
    }

    /// Pure translation by `shift` (one component per spatial axis).
    pub fn translation(shift: &[f64]) -> Self {
        let mut m = Self::identity(shift.len());
        let n = shift.len() + 1;
        for (axis, &s) in shift.iter().enumerate() {
            m.data[axis * n + shift.len()] = s;
        }
        m
    }

    /// Build from a row-major `(dim+1)²` element array.
    pub fn from_data(dim: usize, data: Vec<f64>) -> Self {
        let n = dim + 1;
        assert_eq!(data.len(), n * n, "HMat data length must be (dim+1)^2");
        Self { dim, data }
    }

    /// Number of spatial dimensions (matrix is `(dim+1)` square).
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn n(&self) -> usize {
        self.dim + 1
    }

    /// Row-major element slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Matrix multiplication: `self * rhs` (apply `rhs` first).
    pub fn mul_mat(&self, rhs: &HMat) -> HMat {
        assert_eq!(self.dim, rhs.dim, "HMat dimension mismatch");
        let n = self.n();
        let mut out = vec![0.0; n * n];
        for r in 0..n {
            for c in 0..n {
                let mut acc = 0.0;
                for k in 0..n {
                    acc += self.data[r * n + k] * rhs.data[k * n + c];
                }
                out[r * n + c] = acc;
            }
        }
        HMat {
            dim: self.dim,
            data: out,
        }
    }

    /// Matrix inverse via Gauss-Jordan elimination with partial pivoting,
    /// or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<HMat> {
        let n = self.n();
        let mut a = self.data.clone();
        let mut inv = HMat::identity(self.dim).data;

        for col in 0..n {
            // Pivot: largest magnitude in this column at or below the diagonal.
            let mut pivot = col;
            for row in (col + 1)..n {
                if a[row * n + col].abs() > a[pivot * n + col].abs() {
                    pivot = row;
                }
            }
            if a[pivot * n + col].abs() < 1e-12 {
                return None;
            }
            if pivot != col {
                for k in 0..n {
                    a.swap(col * n + k, pivot * n + k);
                    inv.swap(col * n + k, pivot * n + k);
                }
            }

            let diag = a[col * n + col];
            for k in 0..n {
                a[col * n + k] /= diag;
                inv[col * n + k] /= diag;
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[row * n + col];
                if factor == 0.0 {
                    continue;
                }
                for k in 0..n {
                    a[row * n + k] -= factor * a[col * n + k];
                    inv[row * n + k] -= factor * inv[col * n + k];
                }
            }
        }

        Some(HMat {
            dim: self.dim,
            data: inv,
        })
    }

    /// Map a physical point (axis-order coordinates) through this transform.
    ///
    /// # Panics
    /// Panics if `p.len() != dim` or the homogeneous weight is near zero.
    pub fn transform_point(&self, p: &[f64]) -> Vec<f64> {
        assert_eq!(p.len(), self.dim, "point dimension mismatch");
        let n = self.n();
        let mut w = self.data[self.dim * n + self.dim];
        for (c, &x) in p.iter().enumerate() {
            w += self.data[self.dim * n + c] * x;
        }
        assert!(w.abs() > f64::EPSILON, "transform_point: point at infinity");

        let mut out = Vec::with_capacity(self.dim);
        for r in 0..self.dim {
            let mut acc = self.data[r * n + self.dim];
            for (c, &x) in p.iter().enumerate() {
                acc += self.data[r * n + c] * x;
            }
            out.push(acc / w);
        }
        out
    }

    /// Translation components (last column, one per spatial axis).
    pub fn translation_components(&self) -> Vec<f64> {
        let n = self.n();
        (0..self.dim).map(|r| self.data[r * n + self.dim]).collect()
    }

    /// A transform is valid when all elements are finite and it is invertible.
    pub fn is_valid(&self) -> bool {
        self.data.iter().all(|v| v.is_finite()) && self.inverse().is_some()
    }

    /// Frobenius norm of the difference from the identity matrix.
    pub fn deviation_from_identity(&self) -> f64 {
        let n = self.n();
        let mut acc = 0.0;
        for r in 0..n {
            for c in 0..n {
                let ident = if r == c { 1.0 } else { 0.0 };
                let d = self.data[r * n + c] - ident;
                acc += d * d;
            }
        }
        acc.sqrt()
    }
}

impl Index<(usize, usize)> for HMat {
    type Output = f64;
    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &f64 {
        &self.data[r * self.n() + c]
    }
}

impl IndexMut<(usize, usize)> for HMat {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f64 {
        let n = self.n();
        &mut self.data[r * n + c]
    }
}

impl Mul for &HMat {
    type Output = HMat;
    #[inline]
    fn mul(self, rhs: &HMat) -> HMat {
        self.mul_mat(rhs)
    }
}
