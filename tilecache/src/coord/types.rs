//! Coordinate types for the slippy-map tile grid.

use std::fmt;

use thiserror::Error;

/// Maximum supported zoom level.
///
/// The grid at zoom `z` is `2^z` tiles wide; 30 keeps every valid column and
/// row index representable as a `u32`.
pub const MAX_ZOOM: u8 = 30;

/// Maximum latitude representable in Web Mercator (degrees).
pub const MAX_LAT: f64 = 85.05112877980659;

/// Minimum latitude representable in Web Mercator (degrees).
pub const MIN_LAT: f64 = -MAX_LAT;

/// Half the Web Mercator world width in meters (EPSG:3857 extent).
pub const WORLD_EXTENT_METERS: f64 = 20_037_508.342_789_244;

/// Errors raised while mapping tile addresses.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Column or row lies outside `[0, 2^zoom)`.
    #[error("Invalid tile coordinate {zoom}/{x}/{y}: x and y must be below {limit}")]
    InvalidCoordinate { zoom: u8, x: u32, y: u32, limit: u64 },

    /// Zoom level above [`MAX_ZOOM`].
    #[error("Invalid zoom level: {0} (max: {MAX_ZOOM})")]
    InvalidZoom(u8),

    /// A path segment that does not parse as a tile coordinate.
    #[error("Malformed tile path segment: {0:?}")]
    InvalidPath(String),
}

/// Coordinate reference system of a [`BoundingBox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Geographic degrees (EPSG:4326).
    Wgs84,
    /// Projected Web Mercator meters (EPSG:3857).
    WebMercator,
}

impl Crs {
    /// PostGIS SRID for this reference system.
    pub fn srid(&self) -> i32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
        }
    }
}

/// Address of one tile on the slippy-map grid.
///
/// `x` increases eastward and `y` increases southward; both lie in
/// `[0, 2^zoom)`. Instances can only be built through [`TileAddress::new`],
/// so a `TileAddress` in hand is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    zoom: u8,
    x: u32,
    y: u32,
}

impl TileAddress {
    /// Create a validated tile address.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError::InvalidZoom`] above [`MAX_ZOOM`] and
    /// [`CoordError::InvalidCoordinate`] when `x` or `y` fall outside the grid.
    pub fn new(zoom: u8, x: u32, y: u32) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }

        let limit = grid_size(zoom);
        if u64::from(x) >= limit || u64::from(y) >= limit {
            return Err(CoordError::InvalidCoordinate { zoom, x, y, limit });
        }

        Ok(Self { zoom, x, y })
    }

    /// Zoom level.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Column index.
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Row index.
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Canonical cache key, `tile:{zoom}:{x}:{y}`.
    pub fn cache_key(&self) -> String {
        format!("tile:{}:{}:{}", self.zoom, self.x, self.y)
    }

    /// Cache key pattern matching every tile at `zoom`.
    pub fn zoom_pattern(zoom: u8) -> String {
        format!("tile:{}:*", zoom)
    }

    /// Parse a final URL segment such as `8191.mvt` into a row index.
    ///
    /// The `.mvt` suffix is optional.
    pub fn parse_row_segment(segment: &str) -> Result<u32, CoordError> {
        let digits = segment.strip_suffix(".mvt").unwrap_or(segment);
        digits
            .parse()
            .map_err(|_| CoordError::InvalidPath(segment.to_string()))
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Rectangular area covered by a tile.
///
/// Invariant: `west < east` and `south < north`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub crs: Crs,
}

impl BoundingBox {
    /// Width of the box in its own units.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height of the box in its own units.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }
}

/// Number of tiles along one axis at `zoom`.
#[inline]
pub fn grid_size(zoom: u8) -> u64 {
    1u64 << zoom
}
