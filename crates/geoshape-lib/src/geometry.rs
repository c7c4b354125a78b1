//! Double-precision point and rectangle primitives
//!
//! Both types are plain values. A [`PointD`] carries no notion of which coordinate
//! space it lives in; geodetic (lon, lat) and projected coordinates share the type.
//! [`RectD`] follows screen-style naming where `top` is the smaller y value.

use geo::{Coord, Point, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2D point with exact floating-point equality
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointD {
    pub x: f64,
    pub y: f64,
}

impl PointD {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point in the same coordinate space
    #[inline]
    pub fn distance_to(&self, other: PointD) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<Coord<f64>> for PointD {
    fn from(c: Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

impl From<Point<f64>> for PointD {
    fn from(p: Point<f64>) -> Self {
        Self::new(p.x(), p.y())
    }
}

impl From<PointD> for Coord<f64> {
    fn from(p: PointD) -> Self {
        Coord { x: p.x, y: p.y }
    }
}

impl From<PointD> for Point<f64> {
    fn from(p: PointD) -> Self {
        Point::new(p.x, p.y)
    }
}

/// Axis-aligned rectangle stored as origin plus size
///
/// Negative sizes are representable so that callers can detect them with
/// [`RectD::is_valid`]; none of the predicates below normalise them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RectD {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RectD {
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn from_ltrb(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> PointD {
        PointD::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Non-negative finite width, finite height and no NaN components
    pub fn is_valid(&self) -> bool {
        !(self.width < 0.0
            || self.width.is_infinite()
            || self.height.is_infinite()
            || self.x.is_nan()
            || self.y.is_nan()
            || self.width.is_nan()
            || self.height.is_nan())
    }

    /// True when the rectangle has no area
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Inclusive containment test on all four edges
    #[inline]
    pub fn contains_point(&self, p: PointD) -> bool {
        self.x <= p.x && p.x <= self.right() && self.y <= p.y && p.y <= self.bottom()
    }

    #[inline]
    pub fn contains_rect(&self, r: &RectD) -> bool {
        self.x <= r.x && r.right() <= self.right() && self.y <= r.y && r.bottom() <= self.bottom()
    }

    /// Strict overlap test; rectangles that only share an edge do not intersect
    #[inline]
    pub fn intersects(&self, r: &RectD) -> bool {
        r.x < self.right() && self.x < r.right() && r.y < self.bottom() && self.y < r.bottom()
    }

    /// Closed overlap test; shared edges and zero-size rectangles count
    #[inline]
    pub fn touches(&self, r: &RectD) -> bool {
        r.x <= self.right() && self.x <= r.right() && r.y <= self.bottom() && self.y <= r.bottom()
    }

    /// Overlapping region of two rectangles, or `None` when they are disjoint
    pub fn intersection(a: &RectD, b: &RectD) -> Option<RectD> {
        let left = a.x.max(b.x);
        let right = a.right().min(b.right());
        let top = a.y.max(b.y);
        let bottom = a.bottom().min(b.bottom());
        (right >= left && bottom >= top).then(|| RectD::from_ltrb(left, top, right, bottom))
    }

    /// Smallest rectangle covering both inputs
    pub fn union(a: &RectD, b: &RectD) -> RectD {
        RectD::from_ltrb(
            a.x.min(b.x),
            a.y.min(b.y),
            a.right().max(b.right()),
            a.bottom().max(b.bottom()),
        )
    }

    /// Grow by `dx` on the left and right and by `dy` on the top and bottom
    pub fn inflate(&self, dx: f64, dy: f64) -> RectD {
        RectD::new(
            self.x - dx,
            self.y - dy,
            self.width + 2.0 * dx,
            self.height + 2.0 * dy,
        )
    }

    /// Whether a circle overlaps the rectangle, using the closest point on the rectangle
    pub fn intersects_circle(&self, centre: PointD, radius: f64) -> bool {
        let closest_x = centre.x.clamp(self.x, self.right());
        let closest_y = centre.y.clamp(self.y, self.bottom());
        let dx = centre.x - closest_x;
        let dy = centre.y - closest_y;
        dx * dx + dy * dy <= radius * radius
    }

    /// Bounding box of a set of points, `None` when the iterator is empty
    pub fn bounding(points: impl IntoIterator<Item = PointD>) -> Option<RectD> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(RectD::from_ltrb(min_x, min_y, max_x, max_y))
    }

    /// Convert to a [`geo::Rect`], which normalises min/max corners
    pub fn to_geo_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.x,
                y: self.y,
            },
            Coord {
                x: self.right(),
                y: self.bottom(),
            },
        )
    }
}

impl From<Rect<f64>> for RectD {
    fn from(r: Rect<f64>) -> Self {
        let min = r.min();
        let max = r.max();
        RectD::from_ltrb(min.x, min.y, max.x, max.y)
    }
}
