//! End-to-end registration runs.
//!
//! Ties the stages together: overlap graph, reference and pair selection,
//! task planning and materialization, global transform resolution. The
//! timelapse entry point repeats the materialization per timepoint over one
//! shared plan and returns a flat `(tile, channel, time)` keyed map; the
//! outcome is an immutable value, any accumulation across runs is the
//! caller's business.

use std::collections::HashMap;

use crate::config::StitchConfig;
use crate::error::StitchError;
use crate::graph::{build_overlap_graph, select_pairs, select_reference, SpanningForest};
use crate::math::HMat;
use crate::progress::{report_progress, ProgressCallback, RegistrationStage};
use crate::register::RegistrationPrimitive;
use crate::resolve::resolve_global_transforms;
use crate::tasks::{EdgeTransform, TaskGraph};
use crate::tile::{TileId, TileLayout, TileSource};

/// Flat composite key for timelapse results. `channel` records which
/// channel's pixel data drove the registration; the transform itself
/// applies to every channel of the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameKey {
    pub tile: TileId,
    pub channel: usize,
    pub time: usize,
}

/// Result of registering one timepoint.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub reference: TileId,
    /// Global transform per reachable tile, in the reference's physical
    /// frame. Unreachable tiles are deliberately absent.
    pub transforms: HashMap<TileId, HMat>,
    /// Tiles with no overlap path to the reference.
    pub unregistrable: Vec<TileId>,
    /// The pairwise transforms the globals were composed from.
    pub edges: Vec<EdgeTransform>,
}

/// Result of registering a timelapse.
#[derive(Debug, Clone)]
pub struct TimelapseOutcome {
    pub reference: TileId,
    pub transforms: HashMap<FrameKey, HMat>,
    pub unregistrable: Vec<TileId>,
}

/// Configured registration runner.
#[derive(Debug, Clone)]
pub struct TileRegistrator {
    config: StitchConfig,
    progress: ProgressCallback,
}

impl TileRegistrator {
    pub fn new(config: StitchConfig) -> Self {
        config.validate();
        Self {
            config,
            progress: ProgressCallback::default(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Register all tiles of a layout at timepoint 0.
    pub fn register(
        &self,
        source: &dyn TileSource,
        layout: &TileLayout,
        primitive: &dyn RegistrationPrimitive,
    ) -> Result<RegistrationOutcome, StitchError> {
        let (forest, ndim) = self.select(layout)?;
        let graph = TaskGraph::plan(&forest, &self.config, 0);
        let edges = graph.materialize(source, primitive, &self.progress)?;
        let transforms = resolve_global_transforms(&forest, &edges, ndim);

        tracing::info!(
            tiles = layout.len(),
            registered = transforms.len(),
            unregistrable = forest.unregistrable.len(),
            reference = %forest.reference,
            "registration run finished"
        );

        Ok(RegistrationOutcome {
            reference: forest.reference,
            transforms,
            unregistrable: forest.unregistrable,
            edges,
        })
    }

    /// Register all tiles at each of the given timepoints. The layout, the
    /// selected pairs and the reference are shared across timepoints; only
    /// pixel data differs per timepoint.
    pub fn register_timelapse(
        &self,
        source: &dyn TileSource,
        layout: &TileLayout,
        times: &[usize],
        primitive: &dyn RegistrationPrimitive,
    ) -> Result<TimelapseOutcome, StitchError> {
        let (forest, ndim) = self.select(layout)?;

        let channel = self.config.registration_channel;
        let mut transforms = HashMap::new();
        for (step, &time) in times.iter().enumerate() {
            let graph = TaskGraph::plan(&forest, &self.config, time);
            let edges = graph.materialize(source, primitive, &self.progress)?;
            let resolved = resolve_global_transforms(&forest, &edges, ndim);
            for (tile, transform) in resolved {
                transforms.insert(
                    FrameKey {
                        tile,
                        channel,
                        time,
                    },
                    transform,
                );
            }
            report_progress(
                &self.progress,
                step + 1,
                times.len(),
                RegistrationStage::Timepoints,
            );
            tracing::debug!(time, "timepoint registered");
        }

        tracing::info!(
            tiles = layout.len(),
            timepoints = times.len(),
            reference = %forest.reference,
            "timelapse registration finished"
        );

        Ok(TimelapseOutcome {
            reference: forest.reference,
            transforms,
            unregistrable: forest.unregistrable,
        })
    }

    /// Validate the layout, build the overlap graph and pick the pairs.
    fn select(&self, layout: &TileLayout) -> Result<(SpanningForest, usize), StitchError> {
        let ndim = validate_layout(layout)?;

        let overlap_graph = build_overlap_graph(layout);
        let reference = select_reference(&overlap_graph, self.config.reference)?;
        let forest = select_pairs(&overlap_graph, reference)?;

        tracing::info!(
            tiles = layout.len(),
            pairs = forest.edges.len(),
            reference = %reference,
            "selected registration pairs"
        );
        if !forest.unregistrable.is_empty() {
            tracing::warn!(
                tiles = ?forest.unregistrable,
                "tiles have no overlap path to the reference and will not be registered"
            );
        }

        Ok((forest, ndim))
    }
}

/// Check the layout is non-empty and dimensionally consistent, returning
/// its dimensionality.
fn validate_layout(layout: &TileLayout) -> Result<usize, StitchError> {
    let ndim = layout.ndim().ok_or(StitchError::EmptyLayout)?;
    for (tile, geometry) in layout.iter() {
        if geometry.ndim() != ndim {
            return Err(StitchError::DimensionMismatch {
                tile,
                expected: ndim,
                actual: geometry.ndim(),
            });
        }
    }
    Ok(ndim)
}
