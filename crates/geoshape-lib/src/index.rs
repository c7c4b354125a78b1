//! SpatialIndex - builds a quadtree from a record source and answers location queries
//!
//! Small datasets are inserted sequentially. Above [`IndexConfig::parallel_threshold`]
//! records the dataset is cut into contiguous chunks, each chunk gets its own tree on the
//! rayon pool, and the trees are merged back in chunk order so every leaf lists its
//! records exactly as a sequential build would.

use crate::{DEFAULT_MAX_DEPTH, PointD, QuadTree, RecordIndex, RecordSource, RectD, Result};

use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Configuration for index construction
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexConfig {
    /// Depth of the leaves (default 7)
    pub max_depth: u32,
    /// Record count above which construction is split across threads.
    /// Default: 50 000
    pub parallel_threshold: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            parallel_threshold: 50_000,
        }
    }
}

/// Summary of a built index
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexInfo {
    /// Records inserted
    pub record_count: usize,
    /// Whether records were indexed as points (otherwise as extents)
    pub point_data: bool,
    /// Allocated nodes including the root
    pub node_count: usize,
    /// Allocated leaves
    pub leaf_count: usize,
    /// Leaf entries; larger than `record_count` when extents span several leaves
    pub entry_count: usize,
}

/// A built, read-only spatial index over one dataset
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpatialIndex {
    tree: QuadTree,
    record_count: usize,
    point_data: bool,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SpatialIndex {
    /// Index every record of `source` inside `bounds`
    ///
    /// Fails on the first record whose geometry cannot be read or lies outside `bounds`.
    pub fn build(source: RecordSource<'_>, bounds: RectD, config: &IndexConfig) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("index::build");

        let record_count = source.record_count();
        let tree = if record_count > config.parallel_threshold {
            Self::build_parallel(source, bounds, config)?
        } else {
            let mut tree = QuadTree::with_max_depth(bounds, config.max_depth)?;
            insert_range(&mut tree, source, 0..record_count)?;
            tree
        };

        tracing::debug!(
            "Built spatial index: {} records, {} nodes, {} leaves",
            record_count,
            tree.node_count(),
            tree.leaf_count()
        );

        Ok(Self {
            tree,
            record_count,
            point_data: source.is_point_data(),
        })
    }

    /// Index every record using the union of their geometry as bounds
    ///
    /// An empty dataset yields an index over the unit square that answers every query
    /// with `None`.
    pub fn build_with_extent(source: RecordSource<'_>, config: &IndexConfig) -> Result<Self> {
        let bounds = match source.extent()? {
            // A single point or a straight line has no area; give the root some
            Some(extent) if extent.is_empty() => extent.inflate(
                if extent.width > 0.0 { 0.0 } else { 0.5 },
                if extent.height > 0.0 { 0.0 } else { 0.5 },
            ),
            Some(extent) => extent,
            None => RectD::new(0.0, 0.0, 1.0, 1.0),
        };
        Self::build(source, bounds, config)
    }

    fn build_parallel(
        source: RecordSource<'_>,
        bounds: RectD,
        config: &IndexConfig,
    ) -> Result<QuadTree> {
        #[cfg(feature = "profiling")]
        profiling::scope!("index::build_parallel");

        let record_count = source.record_count();
        let chunk_size = record_count
            .div_ceil(rayon::current_num_threads().max(1))
            .max(config.parallel_threshold.max(1) / 4)
            .max(1);
        let chunks: Vec<Range<usize>> = (0..record_count)
            .step_by(chunk_size)
            .map(|start| start..(start + chunk_size).min(record_count))
            .collect();

        tracing::debug!(
            "Building index in {} chunks of up to {} records",
            chunks.len(),
            chunk_size
        );

        // Build per-chunk trees in parallel; collect keeps chunk order
        let trees: Result<Vec<QuadTree>> = chunks
            .into_par_iter()
            .map(|range| {
                let mut tree = QuadTree::with_max_depth(bounds, config.max_depth)?;
                insert_range(&mut tree, source, range)?;
                Ok(tree)
            })
            .collect();

        // Sequential merge in chunk order
        let mut trees = trees?.into_iter();
        let mut merged = match trees.next() {
            Some(first) => first,
            None => QuadTree::with_max_depth(bounds, config.max_depth)?,
        };
        for tree in trees {
            merged.merge(tree)?;
        }
        Ok(merged)
    }

    /// Candidate records at a point; see [`QuadTree::query_point`]
    #[inline]
    pub fn query_point(&self, point: PointD) -> Option<&[RecordIndex]> {
        self.tree.query_point(point)
    }

    /// De-duplicated candidates overlapping a rectangle
    #[inline]
    pub fn query_rect(&self, rect: RectD) -> Option<Vec<RecordIndex>> {
        self.tree.query_rect(rect)
    }

    /// De-duplicated candidates within `radius` of `centre`
    #[inline]
    pub fn query_radius(&self, centre: PointD, radius: f64) -> Option<Vec<RecordIndex>> {
        self.tree.query_radius(centre, radius)
    }

    #[inline]
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    #[inline]
    pub fn is_point_data(&self) -> bool {
        self.point_data
    }

    #[inline]
    pub fn bounds(&self) -> RectD {
        self.tree.bounds()
    }

    #[inline]
    pub fn tree(&self) -> &QuadTree {
        &self.tree
    }

    pub fn info(&self) -> IndexInfo {
        IndexInfo {
            record_count: self.record_count,
            point_data: self.point_data,
            node_count: self.tree.node_count(),
            leaf_count: self.tree.leaf_count(),
            entry_count: self.tree.entry_count(),
        }
    }
}

fn insert_range(tree: &mut QuadTree, source: RecordSource<'_>, range: Range<usize>) -> Result<()> {
    match source {
        RecordSource::Points(points) => {
            for record in range {
                tree.insert_point(record, points.record_point(record)?)?;
            }
        }
        RecordSource::Extents(extents) => {
            for record in range {
                tree.insert_extent(record, extents.record_bounds(record)?)?;
            }
        }
    }
    Ok(())
}
