//! GeoShape Library - Spatial Index, Attribute Tables and Tile Math
//!
//! This library holds the algorithmic core of a shapefile-style toolkit: a bounded-depth
//! quadtree that narrows "which records are near this point" down to a small candidate set,
//! a byte-exact dBASE table writer for per-record attributes, and the projection and
//! tile-addressing math that bridges geodetic coordinates and slippy-map pixel tiles.
//!
//! # Architecture
//!
//! - **[`PointD`] / [`RectD`]**: Double-precision geometry primitives shared by every module
//! - **[`MapProjection`]**: Identity and spherical Mercator transforms
//! - **[`tile`]**: 256×256 tile pyramid addressing at integral zoom levels
//! - **[`QuadTree`]**: Fixed-depth spatial index over record points or extents
//! - **[`SpatialIndex`]**: High-level builder that feeds a [`RecordSource`] into a quadtree
//! - **[`DbfWriter`]**: Fixed-schema attribute table writer
//!
//! # Performance Characteristics
//!
//! - **Build Time**: O(N·D) for points, O(N·D·L) for extents (D=depth, L=leaves touched)
//! - **Point Query**: O(D), returns one leaf's list
//! - **Memory**: at most 4^D leaves, each an append-only index list

pub mod dbf;
mod geometry;
mod index;
pub mod projection;
mod quadtree;
mod source;
pub mod tile;

// Public API exports
pub use dbf::{DbfWriter, FieldDescriptor, FieldType};
pub use geometry::{PointD, RectD};
pub use index::{IndexConfig, IndexInfo, SpatialIndex};
pub use projection::{Identity, MapProjection, ProjectionType, SphericalMercator};
pub use quadtree::{DEFAULT_MAX_DEPTH, MAX_SUPPORTED_DEPTH, QuadTree};
pub use source::{ExtentRecords, PointRecords, RecordSource};
pub use tile::TilePyramid;

/// Zero-based row number shared by the attribute table and the geometry store
pub type RecordIndex = usize;

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Schema mismatch: expected {expected} values, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Merge mismatch: {reason}")]
    MergeMismatch { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn() -> IndexConfig = IndexConfig::default;
        let _: fn() -> TilePyramid = TilePyramid::default;
        let _: fn(RectD) -> Result<QuadTree> = QuadTree::new;
    }

    #[test]
    fn test_error_messages() {
        let err = DataError::SchemaMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "Schema mismatch: expected 3 values, got 2");

        let err = DataError::InvalidSchema("no fields".to_string());
        assert_eq!(err.to_string(), "Invalid schema: no fields");
    }
}
