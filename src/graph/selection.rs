//! Reference-tile choice and registration pair selection.
//!
//! The selector turns the undirected overlap graph into a directed spanning
//! forest rooted at the reference: every reachable tile gets exactly one
//! path of registration pairs leading to the reference. Paths are chosen to
//! maximize the smallest overlap along the way (a widest-path Dijkstra),
//! since the weakest pair bounds the quality of the whole chain; among paths
//! with the same bottleneck the larger total overlap wins.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::ReferenceSelection;
use crate::error::StitchError;
use crate::graph::OverlapGraph;
use crate::tile::TileId;

/// One selected registration pair. `moving` is registered onto `fixed`,
/// where `fixed` is one hop closer to the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistrationEdge {
    pub moving: TileId,
    pub fixed: TileId,
    pub overlap: f64,
}

/// Directed spanning forest of registration pairs rooted at the reference.
#[derive(Debug, Clone)]
pub struct SpanningForest {
    pub reference: TileId,
    /// One edge per reachable non-reference tile, ordered by moving tile id.
    pub edges: Vec<RegistrationEdge>,
    /// Tiles with no overlap path to the reference, ascending by id. These
    /// never receive a transform; defaulting them to identity would place
    /// them at an arbitrary position.
    pub unregistrable: Vec<TileId>,
}

impl SpanningForest {
    /// The tile `moving` is registered against, if `moving` is reachable.
    pub fn parent_of(&self, moving: TileId) -> Option<TileId> {
        self.edges
            .iter()
            .find(|e| e.moving == moving)
            .map(|e| e.fixed)
    }
}

/// Choose the reference tile.
///
/// `Auto` picks the tile with the largest total incident overlap, so the
/// reference sits centrally and registration chains stay short; ties go to
/// the lowest id for determinism. An explicit tile is validated against the
/// graph.
pub fn select_reference(
    graph: &OverlapGraph,
    selection: ReferenceSelection,
) -> Result<TileId, StitchError> {
    match selection {
        ReferenceSelection::Tile(tile) => {
            if graph.contains(tile) {
                Ok(tile)
            } else {
                Err(StitchError::UnknownReferenceTile { tile })
            }
        }
        ReferenceSelection::Auto => {
            let mut best: Option<(f64, TileId)> = None;
            for &id in graph.ids() {
                let total = graph.total_overlap(id);
                let better = match best {
                    None => true,
                    Some((best_total, best_id)) => {
                        total > best_total || (total == best_total && id < best_id)
                    }
                };
                if better {
                    best = Some((total, id));
                }
            }
            best.map(|(_, id)| id).ok_or(StitchError::EmptyLayout)
        }
    }
}

/// Candidate path head in the widest-path search. Ordered by bottleneck
/// overlap, then total overlap, then lowest node index, so the heap pops a
/// deterministic best candidate.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    bottleneck: f64,
    total: f64,
    node: usize,
    parent: Option<usize>,
}

impl Candidate {
    fn key(&self) -> (f64, f64) {
        (self.bottleneck, self.total)
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bottleneck
            .total_cmp(&other.bottleneck)
            .then(self.total.total_cmp(&other.total))
            .then(other.node.cmp(&self.node))
    }
}

/// Select registration pairs as the widest-path spanning tree rooted at
/// `reference`. Exactly one path per reachable tile; tiles outside the
/// reference's connected component are listed as unregistrable.
pub fn select_pairs(graph: &OverlapGraph, reference: TileId) -> Result<SpanningForest, StitchError> {
    let root = graph
        .index_of(reference)
        .ok_or(StitchError::UnknownReferenceTile { tile: reference })?;

    let mut best: Vec<Option<(f64, f64)>> = vec![None; graph.len()];
    let mut settled_parent: Vec<Option<Option<usize>>> = vec![None; graph.len()];
    let mut heap = BinaryHeap::new();

    heap.push(Candidate {
        bottleneck: f64::INFINITY,
        total: 0.0,
        node: root,
        parent: None,
    });
    best[root] = Some((f64::INFINITY, 0.0));

    while let Some(candidate) = heap.pop() {
        if settled_parent[candidate.node].is_some() {
            continue;
        }
        settled_parent[candidate.node] = Some(candidate.parent);

        for &(neighbor, weight) in graph.neighbors_by_index(candidate.node) {
            if settled_parent[neighbor].is_some() {
                continue;
            }
            let next = Candidate {
                bottleneck: candidate.bottleneck.min(weight),
                total: candidate.total + weight,
                node: neighbor,
                parent: Some(candidate.node),
            };
            let improves = match best[neighbor] {
                None => true,
                Some(current) => next.key() > current,
            };
            if improves {
                best[neighbor] = Some(next.key());
                heap.push(next);
            }
        }
    }

    let mut edges = Vec::new();
    let mut unregistrable = Vec::new();
    for node in 0..graph.len() {
        match settled_parent[node] {
            Some(Some(parent)) => {
                let moving = graph.id_at(node);
                let fixed = graph.id_at(parent);
                let overlap = graph
                    .overlap(moving, fixed)
                    .expect("parent is an overlap neighbour");
                edges.push(RegistrationEdge {
                    moving,
                    fixed,
                    overlap,
                });
            }
            Some(None) => {} // the reference itself
            None => unregistrable.push(graph.id_at(node)),
        }
    }
    edges.sort_by_key(|e| e.moving);
    unregistrable.sort();

    Ok(SpanningForest {
        reference,
        edges,
        unregistrable,
    })
}
