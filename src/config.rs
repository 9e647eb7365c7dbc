//! Configuration for registration and drift correction.
//!
//! All configs are plain data with `Default` implementations carrying the
//! values the pipeline was tuned with, plus a `validate()` that asserts the
//! invariants. Validation panics: a bad config is a programming error at the
//! call site, not a runtime condition to recover from.

use crate::tile::TileId;

/// How the reference tile is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceSelection {
    /// Tile with the largest total overlap with its neighbours; ties go to
    /// the lowest tile id.
    #[default]
    Auto,
    /// Use this tile. Must exist in the layout.
    Tile(TileId),
}

/// What to do when a pairwise registration fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the run with [`StitchError::Registration`](crate::error::StitchError).
    /// The default: a silently wrong transform corrupts every tile downstream
    /// of the failed edge.
    #[default]
    Abort,
    /// Record an identity transform for the failed edge and continue. Edges
    /// that took this path are flagged in the outcome.
    FallBackToIdentity,
}

/// Configuration for one registration run.
#[derive(Debug, Clone)]
pub struct StitchConfig {
    /// Per-axis integer downsampling applied to both images of a pair before
    /// the registration primitive runs. `None` registers at full resolution.
    /// Length must match the layout's dimensionality.
    pub registration_binning: Option<Vec<usize>>,
    /// Channel whose pixel data drives registration. The resulting
    /// transforms apply to every channel of the tile.
    pub registration_channel: usize,
    /// Reference tile choice.
    pub reference: ReferenceSelection,
    /// Pairwise failure handling.
    pub on_failure: FailurePolicy,
    /// Maximum registration tasks in flight at once. Bounds peak memory,
    /// since each task holds two tile images.
    pub max_concurrent: usize,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            registration_binning: Some(vec![2, 2]),
            registration_channel: 0,
            reference: ReferenceSelection::Auto,
            on_failure: FailurePolicy::Abort,
            max_concurrent: rayon::current_num_threads().max(1),
        }
    }
}

impl StitchConfig {
    pub fn validate(&self) {
        if let Some(factors) = &self.registration_binning {
            assert!(!factors.is_empty(), "binning factors must not be empty");
            assert!(
                factors.iter().all(|&f| f >= 1),
                "binning factors must be >= 1, got {:?}",
                factors
            );
        }
        assert!(self.max_concurrent > 0, "max_concurrent must be > 0");
    }
}

/// Dense optical-flow estimator parameters.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Half-width of the local least-squares window.
    pub window_radius: usize,
    /// Warp-and-refine iterations.
    pub iterations: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            window_radius: 3,
            iterations: 3,
        }
    }
}

impl FlowConfig {
    pub fn validate(&self) {
        assert!(self.window_radius >= 1, "window_radius must be >= 1");
        assert!(self.iterations >= 1, "iterations must be >= 1");
    }
}

/// Parameters of virtual-particle drift estimation.
#[derive(Debug, Clone)]
pub struct VirtualParticleConfig {
    /// Downsampling factor applied to each frame before flow estimation.
    /// Particle displacements are scaled back up by this factor.
    pub zoom_factor: usize,
    /// A fresh full grid of particles is seeded every this many timepoints,
    /// so chains stay short enough that few particles drift out of frame.
    pub particle_reinstantiation_stepsize: usize,
    /// Temporal Gaussian width separating smooth motion from random drift.
    pub sigma_t: f64,
    /// Optical-flow estimator parameters.
    pub flow: FlowConfig,
}

impl Default for VirtualParticleConfig {
    fn default() -> Self {
        Self {
            zoom_factor: 10,
            particle_reinstantiation_stepsize: 30,
            sigma_t: 3.0,
            flow: FlowConfig::default(),
        }
    }
}

impl VirtualParticleConfig {
    pub fn validate(&self) {
        assert!(self.zoom_factor >= 1, "zoom_factor must be >= 1");
        assert!(
            self.particle_reinstantiation_stepsize >= 2,
            "particle_reinstantiation_stepsize must be >= 2"
        );
        assert!(self.sigma_t > 0.0, "sigma_t must be positive");
        self.flow.validate();
    }
}

/// Parameters of phase-correlation stabilization.
#[derive(Debug, Clone)]
pub struct StabilizationConfig {
    /// Temporal Gaussian width separating smooth motion from random drift.
    pub sigma: f64,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self { sigma: 2.0 }
    }
}

impl StabilizationConfig {
    pub fn validate(&self) {
        assert!(self.sigma > 0.0, "sigma must be positive");
    }
}

/// Drift estimation method, with its parameters.
#[derive(Debug, Clone)]
pub enum DriftMethod {
    /// Track a dense grid of virtual particles through optical flow.
    /// Robust when frame content changes gradually.
    VirtualParticles(VirtualParticleConfig),
    /// Cumulative phase-correlation shifts. Cheaper, best when frames are
    /// dominated by a rigidly translating scene.
    Stabilization(StabilizationConfig),
}

impl Default for DriftMethod {
    fn default() -> Self {
        DriftMethod::VirtualParticles(VirtualParticleConfig::default())
    }
}

impl DriftMethod {
    pub fn validate(&self) {
        match self {
            DriftMethod::VirtualParticles(c) => c.validate(),
            DriftMethod::Stabilization(c) => c.validate(),
        }
    }
}
