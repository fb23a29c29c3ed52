//! Linear octree over the cube `[-1, 1]^3`.
//!
//! Each depth is stored as a sorted array of Morton keys plus a `children`
//! array. For node `i` at depth `d`, `children[i]` is its rank among the
//! non-empty nodes of that depth, or `-1` when it is empty. The eight
//! children of the non-empty node with rank `k` are nodes `8k..8k + 8` of
//! depth `d + 1`.
//!
//! Depths `0..=full_depth` hold every `8^d` node. Shallower than
//! `full_depth` every node counts as non-empty; from `full_depth` on a node
//! is non-empty iff a point falls inside it, and only non-empty nodes are
//! refined.

use std::ops::Range;

use crate::error::{CoreError, Result};
use crate::morton::{ancestor_key, point_key, MAX_DEPTH, MAX_FULL_DEPTH};
use crate::points::{PointFeatures, PointSet};
use crate::types::{Point3, NORM_EPS};

/// Nodes of one octree depth.
#[derive(Debug, Clone, PartialEq)]
pub struct OctreeLevel {
    keys: Vec<u64>,
    children: Vec<i32>,
    non_empty: usize,
}

impl OctreeLevel {
    /// Validate and wrap raw level arrays.
    fn from_arrays(depth: u32, keys: Vec<u64>, children: Vec<i32>) -> Result<Self> {
        if keys.len() != children.len() {
            return Err(CoreError::InvalidOctree {
                message: format!(
                    "depth {}: {} keys but {} children",
                    depth,
                    keys.len(),
                    children.len()
                ),
            });
        }
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::InvalidOctree {
                message: format!("depth {}: keys are not strictly ascending", depth),
            });
        }

        let mut rank = 0i32;
        for &c in &children {
            if c >= 0 {
                if c != rank {
                    return Err(CoreError::InvalidOctree {
                        message: format!("depth {}: child rank {} out of order", depth, c),
                    });
                }
                rank += 1;
            } else if c != -1 {
                return Err(CoreError::InvalidOctree {
                    message: format!("depth {}: invalid child marker {}", depth, c),
                });
            }
        }

        Ok(Self {
            keys,
            children,
            non_empty: rank as usize,
        })
    }

    /// Sorted Morton keys of the nodes.
    #[inline]
    pub fn keys(&self) -> &[u64] {
        &self.keys
    }

    /// Non-empty rank per node, `-1` for empty nodes.
    #[inline]
    pub fn children(&self) -> &[i32] {
        &self.children
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if the level has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of non-empty nodes.
    #[inline]
    pub fn non_empty(&self) -> usize {
        self.non_empty
    }
}

/// A linear octree built from a [`PointSet`].
///
/// The leaf payload (averaged normal, averaged position, averaged
/// features) is stored for each non-empty node at the maximum depth, in rank
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Octree {
    depth: u32,
    full_depth: u32,
    levels: Vec<OctreeLevel>,
    leaf_normals: Vec<Point3>,
    leaf_points: Vec<Point3>,
    leaf_features: Option<PointFeatures>,
}

/// Check `full_depth <= depth <= MAX_DEPTH` and `full_depth <= MAX_FULL_DEPTH`.
pub fn check_depths(depth: u32, full_depth: u32) -> Result<()> {
    if full_depth > depth || depth > MAX_DEPTH || full_depth > MAX_FULL_DEPTH {
        return Err(CoreError::InvalidDepth {
            depth,
            full_depth,
            max: MAX_DEPTH,
            max_full: MAX_FULL_DEPTH,
        });
    }
    Ok(())
}

impl Octree {
    /// Build an octree from points in `[-1, 1]^3`.
    ///
    /// Points outside the cube are assigned to the nearest boundary cell.
    /// The result depends only on the point set and the depth pair.
    pub fn build(points: &PointSet, depth: u32, full_depth: u32) -> Result<Self> {
        check_depths(depth, full_depth)?;

        let mut keyed: Vec<(u64, usize)> = points
            .points()
            .iter()
            .enumerate()
            .map(|(i, p)| (point_key(*p, depth), i))
            .collect();
        keyed.sort_unstable();

        let mut leaf_keys: Vec<u64> = keyed.iter().map(|(k, _)| *k).collect();
        leaf_keys.dedup();

        let mut levels: Vec<OctreeLevel> = Vec::with_capacity(depth as usize + 1);
        for d in 0..=depth {
            let mut occupied: Vec<u64> = leaf_keys
                .iter()
                .map(|k| ancestor_key(*k, depth - d))
                .collect();
            occupied.dedup();

            let keys: Vec<u64> = if d <= full_depth {
                (0..1u64 << (3 * d)).collect()
            } else {
                let parent = &levels[d as usize - 1];
                parent
                    .keys
                    .iter()
                    .zip(&parent.children)
                    .filter(|(_, c)| **c >= 0)
                    .flat_map(|(k, _)| (0..8u64).map(move |c| (k << 3) | c))
                    .collect()
            };

            let mut rank = 0i32;
            let children: Vec<i32> = keys
                .iter()
                .map(|key| {
                    if d < full_depth || occupied.binary_search(key).is_ok() {
                        rank += 1;
                        rank - 1
                    } else {
                        -1
                    }
                })
                .collect();

            levels.push(OctreeLevel {
                keys,
                children,
                non_empty: rank as usize,
            });
        }

        let (leaf_normals, leaf_points, leaf_features) = leaf_payload(points, &keyed);

        Ok(Self {
            depth,
            full_depth,
            levels,
            leaf_normals,
            leaf_points,
            leaf_features,
        })
    }

    /// Reassemble an octree from its persisted parts.
    ///
    /// `levels` holds `(keys, children)` for depths `0..=depth`. Every
    /// structural rule of a built octree is re-checked.
    pub fn from_parts(
        depth: u32,
        full_depth: u32,
        levels: Vec<(Vec<u64>, Vec<i32>)>,
        leaf_normals: Vec<Point3>,
        leaf_points: Vec<Point3>,
        leaf_features: Option<PointFeatures>,
    ) -> Result<Self> {
        check_depths(depth, full_depth)?;
        if levels.len() != depth as usize + 1 {
            return Err(CoreError::InvalidOctree {
                message: format!("expected {} levels, got {}", depth + 1, levels.len()),
            });
        }

        let mut checked: Vec<OctreeLevel> = Vec::with_capacity(levels.len());
        for (d, (keys, children)) in levels.into_iter().enumerate() {
            let d = d as u32;
            let level = OctreeLevel::from_arrays(d, keys, children)?;

            let expected = if d <= full_depth {
                1usize << (3 * d)
            } else {
                8 * checked[d as usize - 1].non_empty
            };
            if level.len() != expected {
                return Err(CoreError::InvalidOctree {
                    message: format!(
                        "depth {}: expected {} nodes, got {}",
                        d,
                        expected,
                        level.len()
                    ),
                });
            }
            if d < full_depth && level.non_empty != level.len() {
                return Err(CoreError::InvalidOctree {
                    message: format!("depth {}: full level has empty nodes", d),
                });
            }
            checked.push(level);
        }

        let leaves = checked[depth as usize].non_empty;
        if leaf_normals.len() != leaves {
            return Err(CoreError::LengthMismatch {
                what: "leaf normals",
                expected: leaves,
                got: leaf_normals.len(),
            });
        }
        if leaf_points.len() != leaves {
            return Err(CoreError::LengthMismatch {
                what: "leaf points",
                expected: leaves,
                got: leaf_points.len(),
            });
        }
        if let Some(features) = &leaf_features {
            if features.rows() != leaves {
                return Err(CoreError::LengthMismatch {
                    what: "leaf features",
                    expected: leaves,
                    got: features.rows(),
                });
            }
        }

        Ok(Self {
            depth,
            full_depth,
            levels: checked,
            leaf_normals,
            leaf_points,
            leaf_features,
        })
    }

    /// Maximum depth.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Depth down to which the tree is fully subdivided.
    #[inline]
    pub fn full_depth(&self) -> u32 {
        self.full_depth
    }

    /// Level at depth `d`, or `None` if `d > depth`.
    #[inline]
    pub fn level(&self, d: u32) -> Option<&OctreeLevel> {
        self.levels.get(d as usize)
    }

    /// All levels from the root down.
    #[inline]
    pub fn levels(&self) -> &[OctreeLevel] {
        &self.levels
    }

    /// Sorted keys at depth `d` (empty beyond the maximum depth).
    pub fn keys(&self, d: u32) -> &[u64] {
        self.level(d).map(|l| l.keys()).unwrap_or(&[])
    }

    /// Child ranks at depth `d` (empty beyond the maximum depth).
    pub fn children(&self, d: u32) -> &[i32] {
        self.level(d).map(|l| l.children()).unwrap_or(&[])
    }

    /// Number of nodes at depth `d` (0 beyond the maximum depth).
    pub fn node_count(&self, d: u32) -> usize {
        self.level(d).map_or(0, OctreeLevel::len)
    }

    /// Number of non-empty nodes at depth `d`.
    pub fn non_empty_count(&self, d: u32) -> usize {
        self.level(d).map_or(0, OctreeLevel::non_empty)
    }

    /// Total node count over all depths.
    pub fn total_nodes(&self) -> usize {
        self.levels.iter().map(OctreeLevel::len).sum()
    }

    /// Index range of the children of node `i` at depth `d` within depth `d + 1`.
    pub fn child_range(&self, d: u32, i: usize) -> Option<Range<usize>> {
        if d >= self.depth {
            return None;
        }
        let rank = *self.level(d)?.children.get(i)?;
        if rank < 0 {
            return None;
        }
        let start = 8 * rank as usize;
        Some(start..start + 8)
    }

    /// Leaf rank of the non-empty maximum-depth node containing `point`.
    pub fn locate_leaf(&self, point: Point3) -> Option<usize> {
        let level = self.level(self.depth)?;
        let key = point_key(point, self.depth);
        let idx = level.keys.binary_search(&key).ok()?;
        usize::try_from(level.children[idx]).ok()
    }

    /// Averaged unit normal per non-empty leaf.
    #[inline]
    pub fn leaf_normals(&self) -> &[Point3] {
        &self.leaf_normals
    }

    /// Averaged position per non-empty leaf.
    #[inline]
    pub fn leaf_points(&self) -> &[Point3] {
        &self.leaf_points
    }

    /// Averaged features per non-empty leaf.
    #[inline]
    pub fn leaf_features(&self) -> Option<&PointFeatures> {
        self.leaf_features.as_ref()
    }
}

/// Average normals, positions and features over the points of each leaf.
///
/// `keyed` is sorted by key, so groups come out in leaf rank order.
fn leaf_payload(
    points: &PointSet,
    keyed: &[(u64, usize)],
) -> (Vec<Point3>, Vec<Point3>, Option<PointFeatures>) {
    let features = points.features();
    let channels = features.map_or(0, PointFeatures::channels);

    let mut normals = Vec::new();
    let mut positions = Vec::new();
    let mut averaged = Vec::new();

    for group in keyed.chunk_by(|a, b| a.0 == b.0) {
        let count = group.len() as f32;
        let mut n_sum = Point3::ZERO;
        let mut p_sum = Point3::ZERO;
        let mut f_sum = vec![0.0f32; channels];
        for &(_, i) in group {
            n_sum += points.normals()[i];
            p_sum += points.points()[i];
            if let Some(f) = features {
                for (acc, v) in f_sum.iter_mut().zip(f.row(i)) {
                    *acc += v;
                }
            }
        }
        normals.push(n_sum.normalize_or_eps(NORM_EPS));
        positions.push(p_sum / count);
        averaged.extend(f_sum.into_iter().map(|v| v / count));
    }

    // Row count matches the leaf count by construction
    let leaf_features = features.and_then(|_| PointFeatures::new(channels, averaged).ok());
    (normals, positions, leaf_features)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_point() -> PointSet {
        PointSet::new(
            vec![Point3::new(0.3, -0.2, 0.7)],
            vec![Point3::new(0.0, 0.0, 2.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_single_point_counts() {
        let octree = Octree::build(&single_point(), 3, 1).unwrap();

        assert_eq!(octree.node_count(0), 1);
        assert_eq!(octree.non_empty_count(0), 1);
        assert_eq!(octree.node_count(1), 8);
        assert_eq!(octree.non_empty_count(1), 1);
        assert_eq!(octree.node_count(2), 8);
        assert_eq!(octree.non_empty_count(2), 1);
        assert_eq!(octree.node_count(3), 8);
        assert_eq!(octree.non_empty_count(3), 1);
        assert_eq!(octree.total_nodes(), 25);

        assert_eq!(octree.leaf_normals().len(), 1);
        assert!((octree.leaf_normals()[0].z - 1.0).abs() < 1e-5);
        assert_eq!(octree.leaf_points()[0], Point3::new(0.3, -0.2, 0.7));
    }

    #[test]
    fn test_full_levels_are_dense() {
        let octree = Octree::build(&single_point(), 4, 2).unwrap();
        assert_eq!(octree.node_count(2), 64);
        // Above full_depth every node is refined
        assert_eq!(octree.non_empty_count(1), 8);
        // At full_depth only occupied nodes are refined
        assert_eq!(octree.non_empty_count(2), 1);
        assert_eq!(octree.node_count(3), 8);
    }

    #[test]
    fn test_empty_point_set() {
        let empty = PointSet::new(Vec::new(), Vec::new()).unwrap();
        let octree = Octree::build(&empty, 3, 1).unwrap();
        assert_eq!(octree.node_count(1), 8);
        assert_eq!(octree.non_empty_count(1), 0);
        assert_eq!(octree.node_count(2), 0);
        assert_eq!(octree.node_count(3), 0);
        assert!(octree.leaf_normals().is_empty());
    }

    #[test]
    fn test_invalid_depths() {
        assert!(matches!(
            Octree::build(&single_point(), 2, 3),
            Err(CoreError::InvalidDepth { .. })
        ));
        assert!(Octree::build(&single_point(), MAX_DEPTH + 1, 0).is_err());
    }

    #[test]
    fn test_full_depth_ceiling() {
        assert!(check_depths(MAX_DEPTH, MAX_FULL_DEPTH).is_ok());
        assert!(matches!(
            Octree::build(&single_point(), MAX_DEPTH, MAX_FULL_DEPTH + 1),
            Err(CoreError::InvalidDepth { .. })
        ));
        assert!(Octree::build(&single_point(), MAX_DEPTH, MAX_DEPTH).is_err());
    }

    #[test]
    fn test_child_range() {
        let octree = Octree::build(&single_point(), 3, 1).unwrap();
        let level1 = octree.level(1).unwrap();
        let occupied = level1.children().iter().position(|c| *c >= 0).unwrap();
        assert_eq!(octree.child_range(1, occupied), Some(0..8));

        let empty = level1.children().iter().position(|c| *c < 0).unwrap();
        assert_eq!(octree.child_range(1, empty), None);
        assert_eq!(octree.child_range(3, 0), None);
    }

    #[test]
    fn test_features_are_averaged() {
        let points = PointSet::new(
            vec![Point3::new(0.51, 0.51, 0.51), Point3::new(0.52, 0.52, 0.52)],
            vec![Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
        )
        .unwrap()
        .with_features(PointFeatures::new(1, vec![0.2, 0.4]).unwrap())
        .unwrap();

        let octree = Octree::build(&points, 2, 0).unwrap();
        assert_eq!(octree.non_empty_count(2), 1);
        let feats = octree.leaf_features().unwrap();
        assert!((feats.row(0)[0] - 0.3).abs() < 1e-6);
        let n = octree.leaf_normals()[0];
        assert!((n.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_from_parts_rejects_bad_counts() {
        let octree = Octree::build(&single_point(), 2, 1).unwrap();
        let mut levels: Vec<(Vec<u64>, Vec<i32>)> = octree
            .levels()
            .iter()
            .map(|l| (l.keys().to_vec(), l.children().to_vec()))
            .collect();

        let rebuilt = Octree::from_parts(
            2,
            1,
            levels.clone(),
            octree.leaf_normals().to_vec(),
            octree.leaf_points().to_vec(),
            None,
        )
        .unwrap();
        assert_eq!(rebuilt, octree);

        levels[2].0.pop();
        levels[2].1.pop();
        assert!(Octree::from_parts(
            2,
            1,
            levels,
            octree.leaf_normals().to_vec(),
            octree.leaf_points().to_vec(),
            None,
        )
        .is_err());
    }
}
