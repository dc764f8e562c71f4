//! Coordinate conversion module
//!
//! Maps slippy-map tile addresses (zoom/x/y) to the bounding box they cover,
//! either in geographic degrees or in projected Web Mercator meters. Both
//! forms use the exact grid math client-side renderers expect, so cached
//! tiles line up with the standard grid.

mod types;

pub use types::{
    grid_size, BoundingBox, CoordError, Crs, TileAddress, MAX_LAT, MAX_ZOOM, MIN_LAT,
    WORLD_EXTENT_METERS,
};

use std::f64::consts::PI;

/// Converts a tile address into its bounding box.
///
/// # Arguments
///
/// * `zoom` - Zoom level (0 to [`MAX_ZOOM`])
/// * `x` - Tile column, `0..2^zoom`
/// * `y` - Tile row, `0..2^zoom`
/// * `crs` - Output reference system
///
/// # Returns
///
/// A `Result` containing the bounding box or an error if the address is
/// outside the grid.
#[inline]
pub fn to_bounding_box(zoom: u8, x: u32, y: u32, crs: Crs) -> Result<BoundingBox, CoordError> {
    let tile = TileAddress::new(zoom, x, y)?;
    Ok(tile_bounds(&tile, crs))
}

/// Bounding box of an already validated tile address.
#[inline]
pub fn tile_bounds(tile: &TileAddress, crs: Crs) -> BoundingBox {
    match crs {
        Crs::Wgs84 => wgs84_bounds(tile),
        Crs::WebMercator => mercator_bounds(tile),
    }
}

fn wgs84_bounds(tile: &TileAddress) -> BoundingBox {
    let n = grid_size(tile.zoom()) as f64;
    let x = tile.x() as f64;
    let y = tile.y() as f64;

    BoundingBox {
        west: tile_x_to_lon(x, n),
        south: tile_y_to_lat(y + 1.0, n),
        east: tile_x_to_lon(x + 1.0, n),
        north: tile_y_to_lat(y, n),
        crs: Crs::Wgs84,
    }
}

fn mercator_bounds(tile: &TileAddress) -> BoundingBox {
    let n = grid_size(tile.zoom()) as f64;
    let size = 2.0 * WORLD_EXTENT_METERS / n;
    let x = tile.x() as f64;
    let y = tile.y() as f64;

    BoundingBox {
        west: -WORLD_EXTENT_METERS + x * size,
        south: WORLD_EXTENT_METERS - (y + 1.0) * size,
        east: -WORLD_EXTENT_METERS + (x + 1.0) * size,
        north: WORLD_EXTENT_METERS - y * size,
        crs: Crs::WebMercator,
    }
}

#[inline]
fn tile_x_to_lon(x: f64, n: f64) -> f64 {
    x / n * 360.0 - 180.0
}

#[inline]
fn tile_y_to_lat(y: f64, n: f64) -> f64 {
    // Inverse Web Mercator
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
    lat_rad * 180.0 / PI
}

/// Width of one tile in Web Mercator meters at `zoom`.
#[inline]
pub fn tile_size_meters(zoom: u8) -> f64 {
    2.0 * WORLD_EXTENT_METERS / grid_size(zoom) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_world_tile_wgs84() {
        let bbox = to_bounding_box(0, 0, 0, Crs::Wgs84).unwrap();

        assert!((bbox.west - -180.0).abs() < EPSILON);
        assert!((bbox.east - 180.0).abs() < EPSILON);
        assert!((bbox.north - MAX_LAT).abs() < 1e-6);
        assert!((bbox.south - MIN_LAT).abs() < 1e-6);
        assert_eq!(bbox.crs, Crs::Wgs84);
    }

    #[test]
    fn test_world_tile_mercator() {
        let bbox = to_bounding_box(0, 0, 0, Crs::WebMercator).unwrap();

        assert!((bbox.west + WORLD_EXTENT_METERS).abs() < EPSILON);
        assert!((bbox.east - WORLD_EXTENT_METERS).abs() < EPSILON);
        assert!((bbox.south + WORLD_EXTENT_METERS).abs() < EPSILON);
        assert!((bbox.north - WORLD_EXTENT_METERS).abs() < EPSILON);
    }

    #[test]
    fn test_zoom_one_quadrants_meet_at_origin() {
        // Top-left quadrant ends at the prime meridian and the equator
        let nw = to_bounding_box(1, 0, 0, Crs::Wgs84).unwrap();
        assert!(nw.east.abs() < EPSILON);
        assert!(nw.south.abs() < EPSILON);

        let se = to_bounding_box(1, 1, 1, Crs::WebMercator).unwrap();
        assert!(se.west.abs() < 1e-6);
        assert!(se.north.abs() < 1e-6);
    }

    #[test]
    fn test_zoom_14_tile_near_null_island() {
        // 8192/8191 at z14 is the tile just north-east of (0, 0)
        let bbox = to_bounding_box(14, 8192, 8191, Crs::Wgs84).unwrap();

        assert!(bbox.west.abs() < EPSILON);
        assert!(bbox.south.abs() < 1e-9);
        assert!((bbox.east - 360.0 / 16384.0).abs() < EPSILON);
        assert!(bbox.north > 0.0 && bbox.north < 0.03);
    }

    #[test]
    fn test_adjacent_tiles_share_edges() {
        let left = to_bounding_box(10, 300, 400, Crs::Wgs84).unwrap();
        let right = to_bounding_box(10, 301, 400, Crs::Wgs84).unwrap();
        let below = to_bounding_box(10, 300, 401, Crs::Wgs84).unwrap();

        assert_eq!(left.east, right.west);
        assert_eq!(left.south, below.north);
    }

    #[test]
    fn test_out_of_range_column_rejected() {
        let result = to_bounding_box(3, 8, 0, Crs::Wgs84);
        assert!(matches!(
            result.unwrap_err(),
            CoordError::InvalidCoordinate { zoom: 3, x: 8, y: 0, limit: 8 }
        ));
    }

    #[test]
    fn test_zoom_zero_only_has_one_tile() {
        assert!(to_bounding_box(0, 0, 0, Crs::Wgs84).is_ok());
        assert!(to_bounding_box(0, 1, 0, Crs::Wgs84).is_err());
        assert!(to_bounding_box(0, 0, 1, Crs::Wgs84).is_err());
    }

    #[test]
    fn test_zoom_above_max_rejected() {
        let result = TileAddress::new(MAX_ZOOM + 1, 0, 0);
        assert_eq!(result.unwrap_err(), CoordError::InvalidZoom(MAX_ZOOM + 1));
    }

    #[test]
    fn test_max_zoom_last_tile_is_valid() {
        let last = (grid_size(MAX_ZOOM) - 1) as u32;
        let bbox = to_bounding_box(MAX_ZOOM, last, last, Crs::WebMercator).unwrap();
        assert!(bbox.west < bbox.east);
        assert!(bbox.south < bbox.north);
    }

    #[test]
    fn test_cache_key_format() {
        let tile = TileAddress::new(15, 12754, 5279).unwrap();
        assert_eq!(tile.cache_key(), "tile:15:12754:5279");
        assert_eq!(TileAddress::zoom_pattern(5), "tile:5:*");
        assert_eq!(tile.to_string(), "15/12754/5279");
    }

    #[test]
    fn test_parse_row_segment() {
        assert_eq!(TileAddress::parse_row_segment("8191.mvt").unwrap(), 8191);
        assert_eq!(TileAddress::parse_row_segment("42").unwrap(), 42);
        assert!(matches!(
            TileAddress::parse_row_segment("abc.mvt"),
            Err(CoordError::InvalidPath(_))
        ));
        assert!(TileAddress::parse_row_segment("-1.mvt").is_err());
    }

    #[test]
    fn test_tile_size_meters_halves_per_zoom() {
        for zoom in 0..20u8 {
            let ratio = tile_size_meters(zoom) / tile_size_meters(zoom + 1);
            assert!((ratio - 2.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_srid() {
        assert_eq!(Crs::Wgs84.srid(), 4326);
        assert_eq!(Crs::WebMercator.srid(), 3857);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_bbox_ordering_wgs84(
                zoom in 0u8..=MAX_ZOOM,
                x_raw in any::<u32>(),
                y_raw in any::<u32>()
            ) {
                let n = grid_size(zoom);
                let x = (u64::from(x_raw) % n) as u32;
                let y = (u64::from(y_raw) % n) as u32;

                let bbox = to_bounding_box(zoom, x, y, Crs::Wgs84)?;
                prop_assert!(bbox.west < bbox.east, "west {} >= east {}", bbox.west, bbox.east);
                prop_assert!(bbox.south < bbox.north, "south {} >= north {}", bbox.south, bbox.north);
                prop_assert!(bbox.west >= -180.0 && bbox.east <= 180.0);
                prop_assert!(bbox.south >= MIN_LAT - 1e-9 && bbox.north <= MAX_LAT + 1e-9);
            }

            #[test]
            fn test_bbox_ordering_mercator(
                zoom in 0u8..=MAX_ZOOM,
                x_raw in any::<u32>(),
                y_raw in any::<u32>()
            ) {
                let n = grid_size(zoom);
                let x = (u64::from(x_raw) % n) as u32;
                let y = (u64::from(y_raw) % n) as u32;

                let bbox = to_bounding_box(zoom, x, y, Crs::WebMercator)?;
                prop_assert!(bbox.west < bbox.east);
                prop_assert!(bbox.south < bbox.north);
            }

            #[test]
            fn test_bbox_is_deterministic(
                zoom in 0u8..=18,
                x_raw in any::<u32>(),
                y_raw in any::<u32>()
            ) {
                let n = grid_size(zoom);
                let x = (u64::from(x_raw) % n) as u32;
                let y = (u64::from(y_raw) % n) as u32;

                prop_assert_eq!(
                    to_bounding_box(zoom, x, y, Crs::Wgs84)?,
                    to_bounding_box(zoom, x, y, Crs::Wgs84)?
                );
                prop_assert_eq!(
                    to_bounding_box(zoom, x, y, Crs::WebMercator)?,
                    to_bounding_box(zoom, x, y, Crs::WebMercator)?
                );
            }

            #[test]
            fn test_reject_out_of_range(
                zoom in 0u8..=MAX_ZOOM,
                offset in 0u32..1000,
                in_range in any::<u32>(),
                bad_column in any::<bool>()
            ) {
                let n = grid_size(zoom);
                let bad = n.saturating_add(u64::from(offset));
                prop_assume!(bad <= u64::from(u32::MAX));
                let bad = bad as u32;
                let good = (u64::from(in_range) % n) as u32;

                let (x, y) = if bad_column { (bad, good) } else { (good, bad) };
                let result = to_bounding_box(zoom, x, y, Crs::Wgs84);
                let is_invalid_coordinate = matches!(result, Err(CoordError::InvalidCoordinate { .. }));
                prop_assert!(is_invalid_coordinate);
            }
        }
    }
}
