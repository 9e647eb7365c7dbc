//! Small numeric helpers shared across the crate.

pub mod gaussian;
pub mod hmat;

pub use gaussian::{gaussian_kernel, smooth_series};
pub use hmat::HMat;
