//! Tile identifiers, physical geometry and pixel data.
//!
//! A tile is a single field of view on a regular grid in physical space.
//! Geometry (origin, spacing, shape) is known up front from acquisition
//! metadata; pixel data is pulled lazily through [`TileSource`] only when a
//! registration task actually needs it.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Stable identifier of a tile within one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub usize);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical placement of a tile: per-axis origin, pixel spacing and pixel
/// count. Axis 0 is the slowest-varying axis (rows for 2-D data).
#[derive(Debug, Clone, PartialEq)]
pub struct TileGeometry {
    pub origin: Vec<f64>,
    pub spacing: Vec<f64>,
    pub shape: Vec<usize>,
}

impl TileGeometry {
    pub fn new(origin: Vec<f64>, spacing: Vec<f64>, shape: Vec<usize>) -> Self {
        assert_eq!(origin.len(), spacing.len(), "origin/spacing length mismatch");
        assert_eq!(origin.len(), shape.len(), "origin/shape length mismatch");
        assert!(
            spacing.iter().all(|&s| s > 0.0),
            "spacing must be positive on every axis"
        );
        Self {
            origin,
            spacing,
            shape,
        }
    }

    pub fn ndim(&self) -> usize {
        self.origin.len()
    }

    /// Half-open physical interval `[start, end)` covered on each axis.
    pub fn physical_extent(&self) -> Vec<(f64, f64)> {
        (0..self.ndim())
            .map(|a| {
                let start = self.origin[a];
                (start, start + self.spacing[a] * self.shape[a] as f64)
            })
            .collect()
    }
}

/// Tile geometries for one registration run, ordered by tile id.
#[derive(Debug, Clone, Default)]
pub struct TileLayout {
    tiles: BTreeMap<TileId, TileGeometry>,
}

impl TileLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TileId, geometry: TileGeometry) {
        self.tiles.insert(id, geometry);
    }

    pub fn get(&self, id: TileId) -> Option<&TileGeometry> {
        self.tiles.get(&id)
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.tiles.contains_key(&id)
    }

    /// Tile ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.tiles.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileId, &TileGeometry)> {
        self.tiles.iter().map(|(&id, g)| (id, g))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Dimensionality of the first tile, if any. Consistency across tiles is
    /// checked by the pipeline entry points.
    pub fn ndim(&self) -> Option<usize> {
        self.tiles.values().next().map(|g| g.ndim())
    }
}

impl FromIterator<(TileId, TileGeometry)> for TileLayout {
    fn from_iter<I: IntoIterator<Item = (TileId, TileGeometry)>>(iter: I) -> Self {
        Self {
            tiles: iter.into_iter().collect(),
        }
    }
}

/// Pixel data for one tile at one timepoint, spatial axes only. Row-major
/// with axis 0 slowest; for 2-D data `shape` is `[height, width]`.
#[derive(Debug, Clone)]
pub struct TileImage {
    pub pixels: Vec<f32>,
    pub shape: Vec<usize>,
    pub origin: Vec<f64>,
    pub spacing: Vec<f64>,
}

impl TileImage {
    pub fn new(pixels: Vec<f32>, shape: Vec<usize>, origin: Vec<f64>, spacing: Vec<f64>) -> Self {
        assert_eq!(
            pixels.len(),
            shape.iter().product::<usize>(),
            "pixel count does not match shape"
        );
        assert_eq!(shape.len(), origin.len(), "shape/origin length mismatch");
        assert_eq!(shape.len(), spacing.len(), "shape/spacing length mismatch");
        Self {
            pixels,
            shape,
            origin,
            spacing,
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Pixel at a 2-D position. Only valid for 2-D images.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f32 {
        debug_assert_eq!(self.ndim(), 2);
        self.pixels[row * self.shape[1] + col]
    }

    /// Pixel at an n-D index (row-major, axis 0 slowest).
    pub fn get(&self, index: &[usize]) -> f32 {
        debug_assert_eq!(index.len(), self.ndim());
        let mut flat = 0;
        for (a, &i) in index.iter().enumerate() {
            debug_assert!(i < self.shape[a]);
            flat = flat * self.shape[a] + i;
        }
        self.pixels[flat]
    }

    /// Geometry implied by this image's placement.
    pub fn geometry(&self) -> TileGeometry {
        TileGeometry::new(self.origin.clone(), self.spacing.clone(), self.shape.clone())
    }
}

/// Failure to produce pixel data for a tile.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TileLoadError {
    pub message: String,
}

impl TileLoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Lazy provider of tile pixel data.
///
/// Implementations decode files or synthesize data; channel and time axes
/// are indexed here so the returned image carries spatial axes only. The
/// engine calls this only while materializing registration tasks, once per
/// task per run; results are not cached across runs.
pub trait TileSource: Sync {
    fn image(&self, tile: TileId, channel: usize, time: usize)
        -> Result<TileImage, TileLoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_extent() {
        let g = TileGeometry::new(vec![10.0, -5.0], vec![0.5, 2.0], vec![100, 40]);
        let ext = g.physical_extent();
        assert_eq!(ext[0], (10.0, 60.0));
        assert_eq!(ext[1], (-5.0, 75.0));
    }

    #[test]
    fn test_layout_ordered_ids() {
        let layout: TileLayout = [3, 1, 2]
            .iter()
            .map(|&i| {
                (
                    TileId(i),
                    TileGeometry::new(vec![0.0, 0.0], vec![1.0, 1.0], vec![4, 4]),
                )
            })
            .collect();
        let ids: Vec<TileId> = layout.ids().collect();
        assert_eq!(ids, vec![TileId(1), TileId(2), TileId(3)]);
        assert_eq!(layout.ndim(), Some(2));
    }

    #[test]
    fn test_image_indexing() {
        let img = TileImage::new(
            (0..12).map(|v| v as f32).collect(),
            vec![3, 4],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
        );
        assert_eq!(img.at(0, 0), 0.0);
        assert_eq!(img.at(1, 2), 6.0);
        assert_eq!(img.get(&[2, 3]), 11.0);
    }

    #[test]
    fn test_image_get_3d() {
        let img = TileImage::new(
            (0..24).map(|v| v as f32).collect(),
            vec![2, 3, 4],
            vec![0.0; 3],
            vec![1.0; 3],
        );
        assert_eq!(img.get(&[0, 0, 0]), 0.0);
        assert_eq!(img.get(&[1, 2, 3]), 23.0);
    }

    #[test]
    #[should_panic(expected = "pixel count")]
    fn test_image_shape_mismatch_panics() {
        TileImage::new(vec![0.0; 5], vec![2, 3], vec![0.0, 0.0], vec![1.0, 1.0]);
    }
}
