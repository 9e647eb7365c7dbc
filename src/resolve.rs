//! Global transform resolution.
//!
//! Composes pairwise edge transforms along the spanning forest into one
//! transform per reachable tile, expressed in the reference tile's physical
//! coordinate frame. Pure: same forest and edge transforms always give the
//! same result.

use std::collections::HashMap;

use crate::graph::SpanningForest;
use crate::math::HMat;
use crate::tasks::EdgeTransform;
use crate::tile::TileId;

/// Resolve per-tile global transforms. The reference maps to the identity;
/// each child's transform is its parent's global transform composed with
/// the child→parent edge transform. Tiles without a path to the reference
/// are absent from the map.
pub fn resolve_global_transforms(
    forest: &SpanningForest,
    edges: &[EdgeTransform],
    ndim: usize,
) -> HashMap<TileId, HMat> {
    let mut children: HashMap<TileId, Vec<&EdgeTransform>> = HashMap::new();
    for edge in edges {
        children.entry(edge.edge.fixed).or_default().push(edge);
    }

    let mut transforms = HashMap::with_capacity(edges.len() + 1);
    transforms.insert(forest.reference, HMat::identity(ndim));

    let mut frontier = vec![forest.reference];
    while let Some(parent) = frontier.pop() {
        let parent_global = transforms[&parent].clone();
        if let Some(child_edges) = children.get(&parent) {
            for edge in child_edges {
                let global = parent_global.mul_mat(&edge.transform);
                transforms.insert(edge.edge.moving, global);
                frontier.push(edge.edge.moving);
            }
        }
    }

    transforms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RegistrationEdge;

    fn edge(moving: usize, fixed: usize, transform: HMat) -> EdgeTransform {
        EdgeTransform {
            edge: RegistrationEdge {
                moving: TileId(moving),
                fixed: TileId(fixed),
                overlap: 1.0,
            },
            transform,
            fell_back: false,
        }
    }

    fn forest(reference: usize, edges: &[EdgeTransform]) -> SpanningForest {
        SpanningForest {
            reference: TileId(reference),
            edges: edges.iter().map(|e| e.edge).collect(),
            unregistrable: Vec::new(),
        }
    }

    #[test]
    fn test_reference_maps_to_identity() {
        let edges = [edge(1, 0, HMat::translation(&[5.0, 0.0]))];
        let forest = forest(0, &edges);
        let transforms = resolve_global_transforms(&forest, &edges, 2);

        assert_eq!(transforms[&TileId(0)], HMat::identity(2));
        assert_eq!(
            transforms[&TileId(1)].translation_components(),
            vec![5.0, 0.0]
        );
    }

    #[test]
    fn test_chain_composes_root_to_leaf() {
        // Tile 2 reaches the reference through tile 1. A shear on the
        // outer edge makes composition order observable.
        let shear = HMat::from_data(2, vec![1.0, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let step = HMat::translation(&[0.0, 4.0]);
        let edges = [edge(1, 0, shear.clone()), edge(2, 1, step.clone())];
        let forest = forest(0, &edges);
        let transforms = resolve_global_transforms(&forest, &edges, 2);

        // global[2] = T(1->0) * T(2->1): translate first, then shear.
        let expected = shear.mul_mat(&step);
        assert_eq!(transforms[&TileId(2)], expected);
        let p = transforms[&TileId(2)].transform_point(&[0.0, 0.0]);
        assert!((p[0] - 2.0).abs() < 1e-10);
        assert!((p[1] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_branching_forest() {
        let edges = [
            edge(1, 0, HMat::translation(&[1.0, 0.0])),
            edge(2, 0, HMat::translation(&[0.0, 1.0])),
            edge(3, 1, HMat::translation(&[1.0, 0.0])),
        ];
        let forest = forest(0, &edges);
        let transforms = resolve_global_transforms(&forest, &edges, 2);

        assert_eq!(transforms.len(), 4);
        assert_eq!(
            transforms[&TileId(3)].translation_components(),
            vec![2.0, 0.0]
        );
    }

    #[test]
    fn test_unreachable_tiles_absent() {
        let edges = [edge(1, 0, HMat::identity(2))];
        let mut f = forest(0, &edges);
        f.unregistrable = vec![TileId(5)];
        let transforms = resolve_global_transforms(&f, &edges, 2);

        assert!(!transforms.contains_key(&TileId(5)));
        assert_eq!(transforms.len(), 2);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let edges = [
            edge(1, 0, HMat::translation(&[1.5, -0.5])),
            edge(2, 1, HMat::translation(&[0.25, 3.0])),
            edge(3, 2, HMat::translation(&[-1.0, 1.0])),
        ];
        let forest = forest(0, &edges);
        let a = resolve_global_transforms(&forest, &edges, 2);
        let b = resolve_global_transforms(&forest, &edges, 2);
        assert_eq!(a, b);
    }
}
