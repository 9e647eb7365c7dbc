//! Overlap graph over a tile layout.
//!
//! Nodes are tiles; an undirected edge connects two tiles whose physical
//! bounding boxes intersect with strictly positive length on every axis.
//! Tiles that merely touch at a face or corner share no pixel content, so
//! they get no edge. The edge weight is the product of the per-axis
//! intersection lengths, i.e. the overlap volume in physical units.

pub mod selection;

pub use selection::{select_pairs, select_reference, RegistrationEdge, SpanningForest};

use std::collections::HashMap;

use crate::tile::{TileGeometry, TileId, TileLayout};

/// Undirected weighted overlap graph, index-based adjacency over the
/// layout's tiles in ascending id order.
#[derive(Debug, Clone)]
pub struct OverlapGraph {
    ids: Vec<TileId>,
    index: HashMap<TileId, usize>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

/// Physical overlap volume of two tile bounding boxes, or `None` when any
/// axis intersection is empty or degenerate.
pub fn overlap_volume(a: &TileGeometry, b: &TileGeometry) -> Option<f64> {
    debug_assert_eq!(a.ndim(), b.ndim());
    let mut volume = 1.0;
    for (&(a_start, a_end), &(b_start, b_end)) in
        a.physical_extent().iter().zip(b.physical_extent().iter())
    {
        let length = a_end.min(b_end) - a_start.max(b_start);
        if length <= 0.0 {
            return None;
        }
        volume *= length;
    }
    Some(volume)
}

/// Build the overlap graph for a layout. Isolated tiles stay as nodes so
/// they can be reported, not silently dropped.
pub fn build_overlap_graph(layout: &TileLayout) -> OverlapGraph {
    let ids: Vec<TileId> = layout.ids().collect();
    let index: HashMap<TileId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let mut adjacency = vec![Vec::new(); ids.len()];

    for i in 0..ids.len() {
        let gi = layout.get(ids[i]).expect("id from layout");
        for j in (i + 1)..ids.len() {
            let gj = layout.get(ids[j]).expect("id from layout");
            if let Some(volume) = overlap_volume(gi, gj) {
                adjacency[i].push((j, volume));
                adjacency[j].push((i, volume));
            }
        }
    }

    OverlapGraph {
        ids,
        index,
        adjacency,
    }
}

impl OverlapGraph {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Tile ids in ascending order.
    pub fn ids(&self) -> &[TileId] {
        &self.ids
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.index.contains_key(&id)
    }

    pub(crate) fn index_of(&self, id: TileId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(crate) fn id_at(&self, index: usize) -> TileId {
        self.ids[index]
    }

    pub(crate) fn neighbors_by_index(&self, index: usize) -> &[(usize, f64)] {
        &self.adjacency[index]
    }

    /// Overlapping neighbours of a tile with their overlap volumes.
    pub fn neighbors(&self, id: TileId) -> impl Iterator<Item = (TileId, f64)> + '_ {
        let idx = self.index_of(id);
        idx.into_iter()
            .flat_map(move |i| self.adjacency[i].iter().map(|&(j, w)| (self.ids[j], w)))
    }

    /// Overlap volume between two tiles, `None` when they share no edge.
    pub fn overlap(&self, a: TileId, b: TileId) -> Option<f64> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        self.adjacency[ia]
            .iter()
            .find(|&&(j, _)| j == ib)
            .map(|&(_, w)| w)
    }

    /// Sum of overlap volumes over all incident edges.
    pub fn total_overlap(&self, id: TileId) -> f64 {
        self.index_of(id)
            .map(|i| self.adjacency[i].iter().map(|&(_, w)| w).sum())
            .unwrap_or(0.0)
    }

    /// Tiles with no overlapping neighbour.
    pub fn isolated(&self) -> Vec<TileId> {
        self.ids
            .iter()
            .enumerate()
            .filter(|&(i, _)| self.adjacency[i].is_empty())
            .map(|(_, &id)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(origin: [f64; 2], shape: [usize; 2]) -> TileGeometry {
        TileGeometry::new(origin.to_vec(), vec![1.0, 1.0], shape.to_vec())
    }

    fn layout_of(geometries: Vec<TileGeometry>) -> TileLayout {
        geometries
            .into_iter()
            .enumerate()
            .map(|(i, g)| (TileId(i), g))
            .collect()
    }

    #[test]
    fn test_overlapping_tiles_get_edge_with_product_weight() {
        // 100x100 tiles with 10 units of overlap along axis 1.
        let layout = layout_of(vec![
            tile([0.0, 0.0], [100, 100]),
            tile([0.0, 90.0], [100, 100]),
        ]);
        let graph = build_overlap_graph(&layout);
        let w = graph.overlap(TileId(0), TileId(1)).unwrap();
        assert!((w - 100.0 * 10.0).abs() < 1e-9);
        assert!(graph.isolated().is_empty());
    }

    #[test]
    fn test_touching_tiles_share_no_edge() {
        let layout = layout_of(vec![
            tile([0.0, 0.0], [50, 50]),
            tile([0.0, 50.0], [50, 50]),
        ]);
        let graph = build_overlap_graph(&layout);
        assert!(graph.overlap(TileId(0), TileId(1)).is_none());
        assert_eq!(graph.isolated(), vec![TileId(0), TileId(1)]);
    }

    #[test]
    fn test_disjoint_tiles_share_no_edge() {
        let layout = layout_of(vec![
            tile([0.0, 0.0], [50, 50]),
            tile([200.0, 200.0], [50, 50]),
        ]);
        let graph = build_overlap_graph(&layout);
        assert!(graph.overlap(TileId(0), TileId(1)).is_none());
    }

    #[test]
    fn test_one_axis_overlap_is_not_enough() {
        // Overlap along axis 1 but disjoint along axis 0.
        let layout = layout_of(vec![
            tile([0.0, 0.0], [50, 50]),
            tile([100.0, 25.0], [50, 50]),
        ]);
        let graph = build_overlap_graph(&layout);
        assert!(graph.overlap(TileId(0), TileId(1)).is_none());
    }

    #[test]
    fn test_overlap_respects_spacing() {
        // Same pixel shapes, but spacing stretches tile extents.
        let a = TileGeometry::new(vec![0.0, 0.0], vec![2.0, 2.0], vec![50, 50]);
        let b = TileGeometry::new(vec![0.0, 80.0], vec![2.0, 2.0], vec![50, 50]);
        let w = overlap_volume(&a, &b).unwrap();
        assert!((w - 100.0 * 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_isolated_tile_flagged_but_kept() {
        let layout = layout_of(vec![
            tile([0.0, 0.0], [100, 100]),
            tile([0.0, 90.0], [100, 100]),
            tile([500.0, 500.0], [100, 100]),
        ]);
        let graph = build_overlap_graph(&layout);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.isolated(), vec![TileId(2)]);
        assert_eq!(graph.total_overlap(TileId(2)), 0.0);
    }

    #[test]
    fn test_total_overlap_sums_incident_edges() {
        let layout = layout_of(vec![
            tile([0.0, 0.0], [100, 100]),
            tile([0.0, 90.0], [100, 100]),
            tile([90.0, 0.0], [100, 100]),
        ]);
        let graph = build_overlap_graph(&layout);
        // Tile 0 overlaps tile 1 (100x10) and tile 2 (10x100).
        assert!((graph.total_overlap(TileId(0)) - 2000.0).abs() < 1e-9);
        let neighbors: Vec<TileId> = graph.neighbors(TileId(0)).map(|(id, _)| id).collect();
        assert_eq!(neighbors, vec![TileId(1), TileId(2)]);
    }

    #[test]
    fn test_3d_overlap() {
        let a = TileGeometry::new(vec![0.0; 3], vec![1.0; 3], vec![10, 10, 10]);
        let b = TileGeometry::new(vec![5.0, 5.0, 5.0], vec![1.0; 3], vec![10, 10, 10]);
        assert!((overlap_volume(&a, &b).unwrap() - 125.0).abs() < 1e-9);
    }
}
