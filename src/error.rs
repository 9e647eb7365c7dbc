//! Error types for the registration engine.

use thiserror::Error;

use crate::tile::{TileId, TileLoadError};

/// Errors that abort a registration run.
///
/// Deliberately absent: a tile pair without overlap is not an error (the
/// pair is simply not an edge of the overlap graph), and tiles that cannot
/// be reached from the reference are reported as data in the outcome, not
/// raised here.
#[derive(Debug, Error)]
pub enum StitchError {
    #[error("Tile layout is empty")]
    EmptyLayout,

    #[error("Tile {tile} has {actual} spatial dimensions, expected {expected}")]
    DimensionMismatch {
        tile: TileId,
        expected: usize,
        actual: usize,
    },

    #[error("Reference tile {tile} is not part of the layout")]
    UnknownReferenceTile { tile: TileId },

    #[error("Failed to load pixel data for tile {tile}: {source}")]
    TileLoad {
        tile: TileId,
        #[source]
        source: TileLoadError,
    },

    #[error("Registration of tile {moving} against tile {fixed} failed: {source}")]
    Registration {
        moving: TileId,
        fixed: TileId,
        #[source]
        source: RegistrationFailure,
    },
}

/// Ways a single pairwise registration can fail.
///
/// Whether a failure aborts the run or falls back to an identity transform
/// is decided by the configured [`FailurePolicy`](crate::config::FailurePolicy).
#[derive(Debug, Error)]
pub enum RegistrationFailure {
    #[error("Estimator did not converge")]
    DidNotConverge,

    #[error("Registration primitive does not support {ndim}-dimensional images")]
    UnsupportedDimension { ndim: usize },

    #[error("Tile pair has no physical overlap")]
    NoOverlap,

    #[error("Overlap region is only {extent} pixels wide on axis {axis}")]
    DegenerateOverlap { axis: usize, extent: usize },
}
