//! Tilestitch - multi-view tile registration and drift correction.
//!
//! Resolves the relative placement of overlapping image tiles into per-tile
//! transforms in a common reference frame, and corrects random drift in
//! timelapse recordings. The stages are usable on their own:
//! - Overlap graph over a tile layout's physical bounding boxes
//! - Reference choice and widest-path registration pair selection
//! - Pairwise registration (pluggable primitive; phase correlation built in)
//! - Lazy task planning with bounded parallel materialization
//! - Global transform resolution along the selected pairs
//! - Drift estimation by virtual particles or frame stabilization
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tilestitch::{StitchConfig, TileRegistrator, TranslationPrimitive};
//!
//! let registrator = TileRegistrator::new(StitchConfig::default());
//! let outcome = registrator.register(&source, &layout, &TranslationPrimitive::default())?;
//!
//! for (tile, transform) in &outcome.transforms {
//!     println!("tile {tile}: {:?}", transform.translation_components());
//! }
//! ```

pub(crate) mod common;
pub mod config;
pub mod drift;
pub mod error;
pub(crate) mod graph;
pub(crate) mod math;
pub mod progress;
pub(crate) mod register;
pub(crate) mod resolve;
pub(crate) mod tasks;
pub mod tile;

mod pipeline;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Core data model
// ============================================================================

pub use math::HMat;
pub use tile::{TileGeometry, TileId, TileImage, TileLayout, TileLoadError, TileSource};

// ============================================================================
// Graph and pair selection
// ============================================================================

pub use graph::{
    build_overlap_graph, select_pairs, select_reference, OverlapGraph, RegistrationEdge,
    SpanningForest,
};

// ============================================================================
// Pairwise registration
// ============================================================================

pub use register::{bin_image, PhaseCorrelator, RegistrationPrimitive, Shift, TranslationPrimitive};

// ============================================================================
// Scheduling and resolution
// ============================================================================

pub use resolve::resolve_global_transforms;
pub use tasks::{EdgeTransform, RegistrationTask, TaskGraph};

// ============================================================================
// Drift correction
// ============================================================================

pub use drift::{
    apply_drift, estimate_drift, estimate_particle_drift, estimate_stabilization_drift,
    DriftTrajectory, FlowField,
};

// ============================================================================
// Configuration, errors, progress
// ============================================================================

pub use config::{
    DriftMethod, FailurePolicy, FlowConfig, ReferenceSelection, StabilizationConfig, StitchConfig,
    VirtualParticleConfig,
};
pub use error::{RegistrationFailure, StitchError};
pub use pipeline::{FrameKey, RegistrationOutcome, TileRegistrator, TimelapseOutcome};
pub use progress::{ProgressCallback, RegistrationProgress, RegistrationStage};

// SharedFn backs the progress callback type and is part of its signature.
pub use common::SharedFn;
