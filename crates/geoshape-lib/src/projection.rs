//! Map projections between geodetic and projected coordinates
//!
//! Projected coordinates are expressed in degree-like units: spherical Mercator keeps
//! longitude unchanged and maps latitude onto the same ±180 range, so the whole
//! projected world is the square (-180, -180)..(180, 180).

use crate::{PointD, RectD};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Latitude at which the projected Mercator y reaches ±180 (the web-mercator cut-off)
pub const MAX_MERCATOR_LATITUDE: f64 = 85.05112877980659;

/// Precomputed constant: PI / 180.0
const DEG_TO_RAD: f64 = PI / 180.0;

/// Precomputed constant: 180.0 / PI
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Precomputed constant: 90.0 / PI
const HALF_RAD_TO_DEG: f64 = 90.0 / PI;

/// Number of sample points used by [`project_rect`]
const RECT_SAMPLE_POINTS: f64 = 1000.0;

/// Forward and inverse transform between geodetic and projected coordinates
///
/// Implementations never fail; NaN or infinite input yields NaN or infinite output.
pub trait MapProjection: Send + Sync {
    fn to_projected(&self, geodetic: PointD) -> PointD;

    fn to_geodetic(&self, projected: PointD) -> PointD;

    fn to_projected_in_place(&self, points: &mut [PointD]) {
        for p in points.iter_mut() {
            *p = self.to_projected(*p);
        }
    }

    fn to_geodetic_in_place(&self, points: &mut [PointD]) {
        for p in points.iter_mut() {
            *p = self.to_geodetic(*p);
        }
    }
}

/// No-op projection: geodetic coordinates are used directly
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl MapProjection for Identity {
    #[inline]
    fn to_projected(&self, geodetic: PointD) -> PointD {
        geodetic
    }

    #[inline]
    fn to_geodetic(&self, projected: PointD) -> PointD {
        projected
    }

    fn to_projected_in_place(&self, _points: &mut [PointD]) {}

    fn to_geodetic_in_place(&self, _points: &mut [PointD]) {}
}

/// Spherical Mercator in degree units
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalMercator;

impl SphericalMercator {
    /// Forward transform of a latitude, clamped to [`MAX_MERCATOR_LATITUDE`]
    #[inline(always)]
    pub fn latitude_to_y(lat: f64) -> f64 {
        let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
        let sin_lat = (lat * DEG_TO_RAD).sin();
        HALF_RAD_TO_DEG * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln()
    }

    /// Closed-form inverse of [`SphericalMercator::latitude_to_y`]
    #[inline(always)]
    pub fn y_to_latitude(y: f64) -> f64 {
        (y * DEG_TO_RAD).sinh().atan() * RAD_TO_DEG
    }
}

impl MapProjection for SphericalMercator {
    #[inline]
    fn to_projected(&self, geodetic: PointD) -> PointD {
        PointD::new(geodetic.x, Self::latitude_to_y(geodetic.y))
    }

    #[inline]
    fn to_geodetic(&self, projected: PointD) -> PointD {
        PointD::new(projected.x, Self::y_to_latitude(projected.y))
    }

    fn to_projected_in_place(&self, points: &mut [PointD]) {
        #[cfg(feature = "profiling")]
        profiling::scope!("mercator::to_projected_in_place");
        for p in points.iter_mut() {
            p.y = Self::latitude_to_y(p.y);
        }
    }

    fn to_geodetic_in_place(&self, points: &mut [PointD]) {
        #[cfg(feature = "profiling")]
        profiling::scope!("mercator::to_geodetic_in_place");
        for p in points.iter_mut() {
            p.y = Self::y_to_latitude(p.y);
        }
    }
}

/// Selects a projection implementation by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProjectionType {
    #[default]
    None,
    Mercator,
}

impl ProjectionType {
    pub fn create(self) -> Box<dyn MapProjection> {
        match self {
            ProjectionType::None => Box::new(Identity),
            ProjectionType::Mercator => Box::new(SphericalMercator),
        }
    }
}

impl fmt::Display for ProjectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionType::None => f.write_str("none"),
            ProjectionType::Mercator => f.write_str("mercator"),
        }
    }
}

impl FromStr for ProjectionType {
    type Err = crate::DataError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "identity" | "latlong" => Ok(ProjectionType::None),
            "mercator" => Ok(ProjectionType::Mercator),
            other => Err(crate::DataError::InvalidArgument(format!(
                "unknown projection '{other}'"
            ))),
        }
    }
}

/// Direction of a rectangle transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Geodetic to projected
    Forward,
    /// Projected to geodetic
    Inverse,
}

/// Transform a rectangle by projecting a grid of sample points
///
/// Only transforming the corners underestimates the extent for projections that bend
/// edges, so roughly a thousand points are sampled over the rectangle and the bounding
/// box of the finite results is returned. Returns `None` when every sample is infinite.
pub fn project_rect(
    projection: &dyn MapProjection,
    rect: RectD,
    direction: Direction,
) -> Option<RectD> {
    #[cfg(feature = "profiling")]
    profiling::scope!("projection::project_rect");

    let cells = (RECT_SAMPLE_POINTS.sqrt() - 1.0).powi(2);
    let step = ((rect.width * rect.height) / cells).sqrt();
    let (nx, ny) = if step > 0.0 && step.is_finite() {
        (
            ((rect.width / step).ceil() + 1.0).clamp(2.0, RECT_SAMPLE_POINTS) as usize,
            ((rect.height / step).ceil() + 1.0).clamp(2.0, RECT_SAMPLE_POINTS) as usize,
        )
    } else {
        // Degenerate rectangle: sample along its edges only
        (2, 2)
    };

    let dx = rect.width / (nx - 1) as f64;
    let dy = rect.height / (ny - 1) as f64;
    let mut samples = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        let y = rect.top() + dy * j as f64;
        for i in 0..nx {
            samples.push(PointD::new(rect.left() + dx * i as f64, y));
        }
    }

    match direction {
        Direction::Forward => projection.to_projected_in_place(&mut samples),
        Direction::Inverse => projection.to_geodetic_in_place(&mut samples),
    }

    RectD::bounding(
        samples
            .into_iter()
            .filter(|p| !p.x.is_infinite() && !p.y.is_infinite()),
    )
}
