//! Lazy registration task graph.
//!
//! Planning produces pure task descriptions (tile ids, timepoint, binning
//! factors) without touching pixel data. Materializing loads the images,
//! runs the registration primitive for every selected edge on a bounded
//! rayon pool, and blocks until all tasks finish. Nothing is cached:
//! materializing the same graph twice loads and registers twice.
//! Cancellation is dropping the graph before materializing it.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::common::try_par_map_limited;
use crate::config::{FailurePolicy, StitchConfig};
use crate::error::StitchError;
use crate::graph::{RegistrationEdge, SpanningForest};
use crate::math::HMat;
use crate::progress::{report_progress, ProgressCallback, RegistrationStage};
use crate::register::{bin_image, RegistrationPrimitive};
use crate::tile::{TileId, TileSource};

/// One planned pairwise registration. Pure data, no pixels.
#[derive(Debug, Clone)]
pub struct RegistrationTask {
    pub edge: RegistrationEdge,
    pub channel: usize,
    pub time: usize,
    pub binning: Option<Vec<usize>>,
}

/// Transform produced by one materialized task, mapping the moving tile's
/// physical coordinates into the fixed tile's.
#[derive(Debug, Clone)]
pub struct EdgeTransform {
    pub edge: RegistrationEdge,
    pub transform: HMat,
    /// True when registration failed and the identity transform was
    /// substituted under [`FailurePolicy::FallBackToIdentity`].
    pub fell_back: bool,
}

/// Planned registration work for one timepoint.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<RegistrationTask>,
    on_failure: FailurePolicy,
    max_concurrent: usize,
}

impl TaskGraph {
    /// Plan one task per selected edge. Touches no pixel data.
    pub fn plan(forest: &SpanningForest, config: &StitchConfig, time: usize) -> Self {
        config.validate();
        let tasks = forest
            .edges
            .iter()
            .map(|&edge| RegistrationTask {
                edge,
                channel: config.registration_channel,
                time,
                binning: config.registration_binning.clone(),
            })
            .collect();
        Self {
            tasks,
            on_failure: config.on_failure,
            max_concurrent: config.max_concurrent,
        }
    }

    pub fn tasks(&self) -> &[RegistrationTask] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Execute all tasks, loading images through `source` and registering
    /// with `primitive`. At most `max_concurrent` tasks run at once, each
    /// holding two tile images. Blocks until every task has finished.
    pub fn materialize(
        &self,
        source: &dyn TileSource,
        primitive: &dyn RegistrationPrimitive,
        progress: &ProgressCallback,
    ) -> Result<Vec<EdgeTransform>, StitchError> {
        let completed = AtomicUsize::new(0);
        let total = self.tasks.len();

        try_par_map_limited(&self.tasks, self.max_concurrent, |task| {
            let result = self.run_task(source, primitive, task);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            report_progress(progress, done, total, RegistrationStage::Pairs);
            result
        })
    }

    fn run_task(
        &self,
        source: &dyn TileSource,
        primitive: &dyn RegistrationPrimitive,
        task: &RegistrationTask,
    ) -> Result<EdgeTransform, StitchError> {
        let load = |tile: TileId| {
            source
                .image(tile, task.channel, task.time)
                .map_err(|source| StitchError::TileLoad { tile, source })
        };
        let mut fixed = load(task.edge.fixed)?;
        let mut moving = load(task.edge.moving)?;

        if let Some(factors) = &task.binning {
            fixed = bin_image(&fixed, factors);
            moving = bin_image(&moving, factors);
        }

        match primitive.register(&fixed, &moving) {
            Ok(transform) => Ok(EdgeTransform {
                edge: task.edge,
                transform,
                fell_back: false,
            }),
            Err(failure) => match self.on_failure {
                FailurePolicy::Abort => Err(StitchError::Registration {
                    moving: task.edge.moving,
                    fixed: task.edge.fixed,
                    source: failure,
                }),
                FailurePolicy::FallBackToIdentity => {
                    tracing::warn!(
                        moving = %task.edge.moving,
                        fixed = %task.edge.fixed,
                        %failure,
                        "pairwise registration failed, falling back to identity"
                    );
                    Ok(EdgeTransform {
                        edge: task.edge,
                        transform: HMat::identity(fixed.ndim()),
                        fell_back: true,
                    })
                }
            },
        }
    }
}
