//! Tile pyramid addressing
//!
//! Converts between geodetic coordinates, pixel coordinates and tile indices for the
//! power-of-two tile pyramid used by slippy-map servers. At zoom 0 the whole world
//! (-180..180 longitude, Mercator-clamped latitude) fits in a single tile, at zoom 1
//! in 2×2 tiles, and so on. Tiles are numbered from the top-left corner:
//!
//! ```text
//! (0,0) (1,0) (2,0) ..
//! (0,1) (1,1) (2,1) ..
//! (0,2) (1,2) (2,2) ..
//! ```
//!
//! Pixel y grows downwards and pixel x = 0 is longitude -180.

use crate::projection::{MapProjection, SphericalMercator};
use crate::{DataError, PointD, RectD, Result};
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default tile edge length in pixels
pub const TILE_SIZE: u32 = 256;

/// Largest zoom level accepted; keeps pixel coordinates well inside `i64`
pub const MAX_ZOOM: i32 = 30;

/// WGS84 semi-major axis in meters, used by the EPSG:3857 helpers
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6378137.0;

/// Circumference of the Web Mercator world in meters
const WEB_MERCATOR_WORLD_SIZE: f64 = 2.0 * PI * WGS84_SEMI_MAJOR_AXIS;

/// Projected Mercator coordinate of (180, 90), the far corner of the pixel space
#[inline]
fn max_merc() -> PointD {
    SphericalMercator.to_projected(PointD::new(180.0, 90.0))
}

/// Tile pyramid with a configurable tile size
///
/// The size must be a power of two. [`TilePyramid::default`] uses [`TILE_SIZE`], and the
/// free functions in this module delegate to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TilePyramid {
    tile_size: u32,
}

impl Default for TilePyramid {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
        }
    }
}

/// Reject negative zoom levels and zooms whose pixel space no longer fits
fn check_zoom(zoom: i32) -> Result<()> {
    if zoom < 0 {
        return Err(DataError::InvalidArgument(format!(
            "zoom level must be >= 0, got {zoom}"
        )));
    }
    if zoom > MAX_ZOOM {
        return Err(DataError::InvalidArgument(format!(
            "zoom level must be <= {MAX_ZOOM}, got {zoom}"
        )));
    }
    Ok(())
}

impl TilePyramid {
    pub fn new(tile_size: u32) -> Result<Self> {
        if !tile_size.is_power_of_two() {
            return Err(DataError::InvalidArgument(format!(
                "tile size must be a power of two, got {tile_size}"
            )));
        }
        Ok(Self { tile_size })
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Number of tiles along each axis at `zoom`
    pub fn tiles_at_zoom(&self, zoom: i32) -> Result<i64> {
        check_zoom(zoom)?;
        Ok(1i64 << zoom)
    }

    /// Pixels per projected degree: `(tile_size / 360) · 2^zoom`
    pub fn zoom_level_to_scale(&self, zoom: i32) -> Result<f64> {
        check_zoom(zoom)?;
        Ok((self.tile_size as f64 / 360.0) * (1i64 << zoom) as f64)
    }

    /// Nearest integral zoom for a scale; lossy, not an exact inverse
    pub fn scale_to_zoom_level(&self, scale: f64) -> i32 {
        (scale * 360.0 / self.tile_size as f64).log2().round() as i32
    }

    pub fn geodetic_to_pixel(&self, point: PointD, zoom: i32) -> Result<(i64, i64)> {
        let scale = self.zoom_level_to_scale(zoom)?;
        let merc = SphericalMercator.to_projected(point);
        let max = max_merc();
        let x = ((merc.x + max.x) * scale).round() as i64;
        let y = ((max.y - merc.y) * scale).round() as i64;
        Ok((x, y))
    }

    /// Pixel coordinates back to projected Mercator (degree units)
    pub fn pixel_to_projected(&self, pixel_x: i64, pixel_y: i64, zoom: i32) -> Result<PointD> {
        let d = 1.0 / self.zoom_level_to_scale(zoom)?;
        Ok(PointD::new(
            d * pixel_x as f64 - 180.0,
            180.0 - d * pixel_y as f64,
        ))
    }

    pub fn pixel_to_geodetic(&self, pixel_x: i64, pixel_y: i64, zoom: i32) -> Result<PointD> {
        let merc = self.pixel_to_projected(pixel_x, pixel_y, zoom)?;
        Ok(SphericalMercator.to_geodetic(merc))
    }

    pub fn tile_from_geodetic(&self, point: PointD, zoom: i32) -> Result<(i64, i64)> {
        let (x, y) = self.geodetic_to_pixel(point, zoom)?;
        let size = self.tile_size as i64;
        Ok((x / size, y / size))
    }

    /// Pixel at `offset` pixels into a tile along one axis
    ///
    /// Tile indices come from callers unchecked, so overflow is an error rather than a
    /// wrap.
    fn tile_pixel(&self, tile: i64, offset: i64) -> Result<i64> {
        tile.checked_mul(self.tile_size as i64)
            .and_then(|start| start.checked_add(offset))
            .ok_or_else(|| {
                DataError::InvalidArgument(format!(
                    "tile index {tile} is out of range for {}-pixel tiles",
                    self.tile_size
                ))
            })
    }

    /// Center pixel of a tile
    fn tile_center_pixel(&self, tile_x: i64, tile_y: i64) -> Result<(i64, i64)> {
        let half = (self.tile_size >> 1) as i64;
        Ok((self.tile_pixel(tile_x, half)?, self.tile_pixel(tile_y, half)?))
    }

    pub fn tile_center_to_geodetic(&self, tile_x: i64, tile_y: i64, zoom: i32) -> Result<PointD> {
        let (px, py) = self.tile_center_pixel(tile_x, tile_y)?;
        self.pixel_to_geodetic(px, py, zoom)
    }

    pub fn tile_center_to_projected(&self, tile_x: i64, tile_y: i64, zoom: i32) -> Result<PointD> {
        let (px, py) = self.tile_center_pixel(tile_x, tile_y)?;
        self.pixel_to_projected(px, py, zoom)
    }

    /// Longitude/latitude bounds of a tile; `top` is the southern edge
    pub fn tile_bounds_geodetic(&self, tile_x: i64, tile_y: i64, zoom: i32) -> Result<RectD> {
        let size = self.tile_size as i64;
        let top_left =
            self.pixel_to_geodetic(self.tile_pixel(tile_x, 0)?, self.tile_pixel(tile_y, 0)?, zoom)?;
        let bottom_right = self.pixel_to_geodetic(
            self.tile_pixel(tile_x, size)?,
            self.tile_pixel(tile_y, size)?,
            zoom,
        )?;
        Ok(RectD::from_ltrb(
            top_left.x,
            bottom_right.y,
            bottom_right.x,
            top_left.y,
        ))
    }

    /// Meters per pixel reciprocal for EPSG:3857 at `zoom`
    pub fn zoom_level_to_web_mercator_scale(&self, zoom: i32) -> Result<f64> {
        check_zoom(zoom)?;
        Ok((self.tile_size as f64 / WEB_MERCATOR_WORLD_SIZE) * (1i64 << zoom) as f64)
    }

    pub fn web_mercator_scale_to_zoom_level(&self, scale: f64) -> i32 {
        (scale * WEB_MERCATOR_WORLD_SIZE / self.tile_size as f64)
            .log2()
            .round() as i32
    }

    /// EPSG:3857 meters to pixel coordinates (floored)
    pub fn web_mercator_to_pixel(&self, coord: PointD, zoom: i32) -> Result<(i64, i64)> {
        let tiles = self.tiles_at_zoom(zoom)? as f64;
        let size = self.tile_size as f64;
        let x = (size * (0.5 + coord.x / WEB_MERCATOR_WORLD_SIZE) * tiles).floor() as i64;
        let y = (size * (0.5 - coord.y / WEB_MERCATOR_WORLD_SIZE) * tiles).floor() as i64;
        Ok((x, y))
    }

    pub fn pixel_to_web_mercator(&self, pixel_x: i64, pixel_y: i64, zoom: i32) -> Result<PointD> {
        let world_pixels = (self.tile_size as f64) * self.tiles_at_zoom(zoom)? as f64;
        Ok(PointD::new(
            (pixel_x as f64 / world_pixels - 0.5) * WEB_MERCATOR_WORLD_SIZE,
            -(pixel_y as f64 / world_pixels - 0.5) * WEB_MERCATOR_WORLD_SIZE,
        ))
    }

    /// Center of a tile in EPSG:3857 meters
    pub fn tile_center_to_web_mercator(&self, tile_x: i64, tile_y: i64, zoom: i32) -> Result<PointD> {
        let merc = self.tile_center_to_projected(tile_x, tile_y, zoom)?;
        let meters_per_degree = WGS84_SEMI_MAJOR_AXIS * PI / 180.0;
        Ok(PointD::new(
            merc.x * meters_per_degree,
            merc.y * meters_per_degree,
        ))
    }
}

/// Wrap tile coordinates into `[0, 2^zoom)` on both axes
pub fn normalise_tile(tile_x: i64, tile_y: i64, zoom: i32) -> Result<(i64, i64)> {
    let n = TilePyramid::default().tiles_at_zoom(zoom)?;
    Ok((tile_x.rem_euclid(n), tile_y.rem_euclid(n)))
}

pub fn zoom_level_to_scale(zoom: i32) -> Result<f64> {
    TilePyramid::default().zoom_level_to_scale(zoom)
}

pub fn scale_to_zoom_level(scale: f64) -> i32 {
    TilePyramid::default().scale_to_zoom_level(scale)
}

pub fn geodetic_to_pixel(point: PointD, zoom: i32) -> Result<(i64, i64)> {
    TilePyramid::default().geodetic_to_pixel(point, zoom)
}

pub fn pixel_to_geodetic(pixel_x: i64, pixel_y: i64, zoom: i32) -> Result<PointD> {
    TilePyramid::default().pixel_to_geodetic(pixel_x, pixel_y, zoom)
}

pub fn tile_from_geodetic(point: PointD, zoom: i32) -> Result<(i64, i64)> {
    TilePyramid::default().tile_from_geodetic(point, zoom)
}

pub fn tile_center_to_geodetic(tile_x: i64, tile_y: i64, zoom: i32) -> Result<PointD> {
    TilePyramid::default().tile_center_to_geodetic(tile_x, tile_y, zoom)
}

pub fn tile_bounds_geodetic(tile_x: i64, tile_y: i64, zoom: i32) -> Result<RectD> {
    TilePyramid::default().tile_bounds_geodetic(tile_x, tile_y, zoom)
}
