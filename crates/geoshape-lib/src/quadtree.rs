//! Bounded-depth quadtree over record indices
//!
//! The tree covers a fixed world rectangle and splits every node into four equal
//! quadrants (top-left, top-right, bottom-left, bottom-right) lazily, the first time an
//! insert has to pass through it. Only nodes at the maximum depth store records, and a
//! leaf's list grows without limit; depth is what bounds the node count, not occupancy.
//!
//! Point records descend into exactly one quadrant per level. Extent records are stored
//! in every leaf their bounding rectangle touches, so a query may return false positives
//! (and duplicates across leaves) but never misses a record whose geometry covers the
//! query location.

use crate::{DataError, PointD, RecordIndex, RectD, Result};
use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Depth of the leaves unless configured otherwise
pub const DEFAULT_MAX_DEPTH: u32 = 7;

/// Deepest tree accepted; beyond this quadrant sizes approach f64 resolution
pub const MAX_SUPPORTED_DEPTH: u32 = 24;

const TL: usize = 0;
const TR: usize = 1;
const BL: usize = 2;
const BR: usize = 3;

/// Spatial index answering "which records might be at this location"
///
/// Inserting takes `&mut self` and querying `&self`, so a tree cannot be queried while
/// it is being built. A finished tree is `Send + Sync` and can be shared for concurrent
/// reads.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuadTree {
    root: QuadNode,
    max_depth: u32,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct QuadNode {
    bounds: RectD,
    level: u32,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
enum NodeKind {
    /// Interior node that no insert has reached yet
    Unsplit,
    /// Interior node with its four quadrants (TL, TR, BL, BR)
    Internal(Box<[QuadNode; 4]>),
    /// Node at maximum depth holding record indices in insertion order
    Leaf(Vec<RecordIndex>),
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl QuadTree {
    /// Create an empty tree with [`DEFAULT_MAX_DEPTH`]
    ///
    /// `bounds` must cover every geometry that will be inserted.
    pub fn new(bounds: RectD) -> Result<Self> {
        Self::with_max_depth(bounds, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(bounds: RectD, max_depth: u32) -> Result<Self> {
        if !bounds.is_valid() || bounds.is_empty() {
            return Err(DataError::InvalidArgument(format!(
                "index bounds must be a valid non-degenerate rectangle, got {bounds:?}"
            )));
        }
        if max_depth > MAX_SUPPORTED_DEPTH {
            return Err(DataError::InvalidArgument(format!(
                "max depth {max_depth} exceeds {MAX_SUPPORTED_DEPTH}"
            )));
        }

        Ok(Self {
            root: QuadNode::new(bounds, 0, max_depth),
            max_depth,
        })
    }

    #[inline]
    pub fn bounds(&self) -> RectD {
        self.root.bounds
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Insert a point record into the single leaf whose quadrant contains it
    ///
    /// Fails with [`DataError::InvalidGeometry`] when the point lies outside the tree
    /// bounds, which means the bounds were not sized for the dataset.
    pub fn insert_point(&mut self, record: RecordIndex, point: PointD) -> Result<()> {
        if !self.root.bounds.contains_point(point) {
            return Err(DataError::InvalidGeometry(format!(
                "point ({}, {}) of record {record} lies outside index bounds {:?}",
                point.x, point.y, self.root.bounds
            )));
        }
        self.root.insert_point(record, point, self.max_depth);
        Ok(())
    }

    /// Insert an extent record into every leaf its bounding rectangle touches
    pub fn insert_extent(&mut self, record: RecordIndex, bounds: RectD) -> Result<()> {
        if !bounds.is_valid() || bounds.height < 0.0 {
            return Err(DataError::InvalidArgument(format!(
                "record {record} has invalid bounds {bounds:?}"
            )));
        }
        if !self.root.bounds.touches(&bounds) {
            return Err(DataError::InvalidGeometry(format!(
                "bounds {bounds:?} of record {record} lie outside index bounds {:?}",
                self.root.bounds
            )));
        }
        self.root.insert_extent(record, &bounds, self.max_depth);
        Ok(())
    }

    /// Candidate records at a point
    ///
    /// Returns `None` when the point is outside the tree bounds or falls in a branch that
    /// was never split. Leaves are allocated four at a time, so a leaf next to an occupied
    /// one answers with an empty list. The leaf list is returned as stored: extent records
    /// may also appear in neighbouring leaves, and callers still need an exact geometry
    /// test.
    pub fn query_point(&self, point: PointD) -> Option<&[RecordIndex]> {
        if !self.root.bounds.contains_point(point) {
            return None;
        }

        let mut node = &self.root;
        loop {
            match &node.kind {
                NodeKind::Leaf(records) => return Some(records.as_slice()),
                NodeKind::Unsplit => return None,
                NodeKind::Internal(children) => node = &children[node.quadrant_of(point)],
            }
        }
    }

    /// De-duplicated candidates from every leaf touching `rect`
    ///
    /// Returns `None` when `rect` does not touch the tree bounds at all.
    pub fn query_rect(&self, rect: RectD) -> Option<Vec<RecordIndex>> {
        if !self.root.bounds.touches(&rect) {
            return None;
        }
        let mut leaves = Vec::new();
        self.root
            .collect_leaves(&|bounds: &RectD| bounds.touches(&rect), &mut leaves);
        Some(dedup_leaves(&leaves))
    }

    /// De-duplicated candidates from every leaf within `radius` of `centre`
    pub fn query_radius(&self, centre: PointD, radius: f64) -> Option<Vec<RecordIndex>> {
        if !self.root.bounds.intersects_circle(centre, radius) {
            return None;
        }
        let mut leaves = Vec::new();
        self.root.collect_leaves(
            &|bounds: &RectD| bounds.intersects_circle(centre, radius),
            &mut leaves,
        );
        Some(dedup_leaves(&leaves))
    }

    /// Merge another tree built over the same bounds and depth into this one
    ///
    /// Leaf lists from `other` are appended after this tree's entries, so merging trees
    /// built from consecutive record ranges reproduces a sequential build.
    pub fn merge(&mut self, other: QuadTree) -> Result<()> {
        if self.max_depth != other.max_depth {
            return Err(DataError::MergeMismatch {
                reason: format!(
                    "max depths do not match: {} vs {}",
                    self.max_depth, other.max_depth
                ),
            });
        }
        if self.root.bounds != other.root.bounds {
            return Err(DataError::MergeMismatch {
                reason: "index bounds do not match".to_string(),
            });
        }
        self.root.merge_with(other.root)
    }

    /// Number of allocated nodes, including the root
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Number of allocated leaves, empty ones included
    pub fn leaf_count(&self) -> usize {
        let mut leaves = Vec::new();
        self.root.collect_leaves(&|_: &RectD| true, &mut leaves);
        leaves.len()
    }

    /// Total stored entries across leaves (extent records count once per leaf)
    pub fn entry_count(&self) -> usize {
        let mut leaves = Vec::new();
        self.root.collect_leaves(&|_: &RectD| true, &mut leaves);
        leaves.iter().map(|l| l.len()).sum()
    }
}

impl QuadNode {
    fn new(bounds: RectD, level: u32, max_depth: u32) -> Self {
        let kind = if level == max_depth {
            NodeKind::Leaf(Vec::new())
        } else {
            NodeKind::Unsplit
        };
        Self {
            bounds,
            level,
            kind,
        }
    }

    /// Split point shared by the four quadrants
    #[inline]
    fn midpoint(&self) -> PointD {
        PointD::new(
            0.5 * (self.bounds.left() + self.bounds.right()),
            0.5 * (self.bounds.top() + self.bounds.bottom()),
        )
    }

    fn quadrants(&self, max_depth: u32) -> [QuadNode; 4] {
        let b = self.bounds;
        let mid = self.midpoint();
        let level = self.level + 1;

        [
            RectD::from_ltrb(b.left(), b.top(), mid.x, mid.y),
            RectD::from_ltrb(mid.x, b.top(), b.right(), mid.y),
            RectD::from_ltrb(b.left(), mid.y, mid.x, b.bottom()),
            RectD::from_ltrb(mid.x, mid.y, b.right(), b.bottom()),
        ]
        .map(|bounds| QuadNode::new(bounds, level, max_depth))
    }

    /// First quadrant, in TL, TR, BL, BR order, whose closed bounds hold `point`
    ///
    /// Compares against the midpoint directly so that a point on a shared edge always
    /// lands on the same side regardless of rounding in the child rectangles.
    #[inline]
    fn quadrant_of(&self, point: PointD) -> usize {
        let mid = self.midpoint();
        match (point.x <= mid.x, point.y <= mid.y) {
            (true, true) => TL,
            (false, true) => TR,
            (true, false) => BL,
            (false, false) => BR,
        }
    }

    /// Quadrants an extent touches, edges included
    fn quadrants_touching(&self, extent: &RectD) -> [bool; 4] {
        let mid = self.midpoint();
        let west = extent.left() <= mid.x;
        let east = extent.right() >= mid.x;
        let north = extent.top() <= mid.y;
        let south = extent.bottom() >= mid.y;
        let mut touched = [false; 4];
        touched[TL] = west && north;
        touched[TR] = east && north;
        touched[BL] = west && south;
        touched[BR] = east && south;
        touched
    }

    /// Children of an interior node, creating them on first use
    fn split(&mut self, max_depth: u32) -> &mut [QuadNode; 4] {
        if matches!(self.kind, NodeKind::Unsplit) {
            self.kind = NodeKind::Internal(Box::new(self.quadrants(max_depth)));
        }
        match &mut self.kind {
            NodeKind::Internal(children) => children,
            NodeKind::Leaf(_) | NodeKind::Unsplit => {
                unreachable!("leaf nodes at depth {} are never split", self.level)
            }
        }
    }

    fn insert_point(&mut self, record: RecordIndex, point: PointD, max_depth: u32) {
        if let NodeKind::Leaf(records) = &mut self.kind {
            records.push(record);
            return;
        }

        let quadrant = self.quadrant_of(point);
        self.split(max_depth)[quadrant].insert_point(record, point, max_depth);
    }

    fn insert_extent(&mut self, record: RecordIndex, extent: &RectD, max_depth: u32) {
        if let NodeKind::Leaf(records) = &mut self.kind {
            records.push(record);
            return;
        }

        let touched = self.quadrants_touching(extent);
        for (child, _) in self
            .split(max_depth)
            .iter_mut()
            .zip(touched)
            .filter(|(_, hit)| *hit)
        {
            child.insert_extent(record, extent, max_depth);
        }
    }

    fn collect_leaves<'a>(
        &'a self,
        visit: &impl Fn(&RectD) -> bool,
        leaves: &mut Vec<&'a [RecordIndex]>,
    ) {
        match &self.kind {
            NodeKind::Leaf(records) => leaves.push(records.as_slice()),
            NodeKind::Unsplit => {}
            NodeKind::Internal(children) => {
                for child in children.iter().filter(|c| visit(&c.bounds)) {
                    child.collect_leaves(visit, leaves);
                }
            }
        }
    }

    fn merge_with(&mut self, other: QuadNode) -> Result<()> {
        if self.level != other.level {
            return Err(DataError::MergeMismatch {
                reason: format!(
                    "node levels do not match: {} vs {}",
                    self.level, other.level
                ),
            });
        }

        let collision = || DataError::MergeMismatch {
            reason: format!("leaf and interior node collide at level {}", self.level),
        };

        match other.kind {
            NodeKind::Unsplit => Ok(()),
            other_kind if matches!(self.kind, NodeKind::Unsplit) => {
                self.kind = other_kind;
                Ok(())
            }
            NodeKind::Leaf(other_records) => match &mut self.kind {
                NodeKind::Leaf(records) => {
                    records.extend(other_records);
                    Ok(())
                }
                _ => Err(collision()),
            },
            NodeKind::Internal(other_children) => match &mut self.kind {
                NodeKind::Internal(children) => {
                    for (child, other_child) in children.iter_mut().zip(*other_children) {
                        child.merge_with(other_child)?;
                    }
                    Ok(())
                }
                _ => Err(collision()),
            },
        }
    }

    fn node_count(&self) -> usize {
        match &self.kind {
            NodeKind::Internal(children) => {
                1 + children.iter().map(|c| c.node_count()).sum::<usize>()
            }
            NodeKind::Leaf(_) | NodeKind::Unsplit => 1,
        }
    }
}

/// Concatenate leaf lists, keeping the first occurrence of each record
fn dedup_leaves(leaves: &[&[RecordIndex]]) -> Vec<RecordIndex> {
    let mut seen = HashSet::new();
    leaves
        .iter()
        .flat_map(|leaf| leaf.iter().copied())
        .filter(|record| seen.insert(*record))
        .collect()
}
