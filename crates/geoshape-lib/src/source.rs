//! Record geometry providers for index construction
//!
//! A dataset is either point based or extent based, and that choice is made once when
//! the index is built. Implement [`PointRecords`] or [`ExtentRecords`] for a geometry
//! store and wrap it in the matching [`RecordSource`] variant; the index then asks for
//! each record's geometry in order, so stores can fetch lazily from disk.

use crate::{DataError, PointD, RecordIndex, RectD, Result};

/// A dataset whose records are single points
pub trait PointRecords: Sync {
    fn record_count(&self) -> usize;

    fn record_point(&self, record: RecordIndex) -> Result<PointD>;
}

/// A dataset whose records are lines or polygons, indexed by their bounding rectangle
pub trait ExtentRecords: Sync {
    fn record_count(&self) -> usize;

    fn record_bounds(&self, record: RecordIndex) -> Result<RectD>;
}

/// Geometry capability of a dataset, selected once at build time
#[derive(Clone, Copy)]
pub enum RecordSource<'a> {
    Points(&'a dyn PointRecords),
    Extents(&'a dyn ExtentRecords),
}

impl RecordSource<'_> {
    #[inline]
    pub fn record_count(&self) -> usize {
        match self {
            RecordSource::Points(points) => points.record_count(),
            RecordSource::Extents(extents) => extents.record_count(),
        }
    }

    #[inline]
    pub fn is_point_data(&self) -> bool {
        matches!(self, RecordSource::Points(_))
    }

    /// Union of every record's geometry, `None` for an empty dataset
    pub fn extent(&self) -> Result<Option<RectD>> {
        match self {
            RecordSource::Points(points) => {
                let all = (0..points.record_count())
                    .map(|i| points.record_point(i))
                    .collect::<Result<Vec<_>>>()?;
                Ok(RectD::bounding(all))
            }
            RecordSource::Extents(extents) => {
                let mut acc: Option<RectD> = None;
                for i in 0..extents.record_count() {
                    let bounds = extents.record_bounds(i)?;
                    acc = Some(match acc {
                        Some(a) => RectD::union(&a, &bounds),
                        None => bounds,
                    });
                }
                Ok(acc)
            }
        }
    }
}

fn out_of_range(record: RecordIndex, count: usize) -> DataError {
    DataError::InvalidArgument(format!(
        "record {record} out of range for dataset of {count} records"
    ))
}

fn point_at(points: &[PointD], record: RecordIndex) -> Result<PointD> {
    points
        .get(record)
        .copied()
        .ok_or_else(|| out_of_range(record, points.len()))
}

fn bounds_at(extents: &[RectD], record: RecordIndex) -> Result<RectD> {
    extents
        .get(record)
        .copied()
        .ok_or_else(|| out_of_range(record, extents.len()))
}

// Implemented for slice references rather than `[T]` so a borrowed slice can be
// wrapped as `RecordSource::Points(&slice)`; trait objects need a sized type.
impl PointRecords for &[PointD] {
    fn record_count(&self) -> usize {
        self.len()
    }

    fn record_point(&self, record: RecordIndex) -> Result<PointD> {
        point_at(self, record)
    }
}

impl PointRecords for Vec<PointD> {
    fn record_count(&self) -> usize {
        self.len()
    }

    fn record_point(&self, record: RecordIndex) -> Result<PointD> {
        point_at(self, record)
    }
}

impl ExtentRecords for &[RectD] {
    fn record_count(&self) -> usize {
        self.len()
    }

    fn record_bounds(&self, record: RecordIndex) -> Result<RectD> {
        bounds_at(self, record)
    }
}

impl ExtentRecords for Vec<RectD> {
    fn record_count(&self) -> usize {
        self.len()
    }

    fn record_bounds(&self, record: RecordIndex) -> Result<RectD> {
        bounds_at(self, record)
    }
}
