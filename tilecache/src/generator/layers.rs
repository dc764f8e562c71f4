//! Declarative layer table for local tile generation.
//!
//! Each [`LayerSpec`] names one MVT layer, the osm2pgsql table it is cut
//! from, the attributes it carries and the lowest zoom at which it appears.
//! Adding a layer is a table edit; the generator never branches on names.

use crate::coord::tile_size_meters;

/// Default MVT extent (tile-local integer grid size).
pub const DEFAULT_EXTENT: u32 = 4096;

/// Default clipping buffer in tile units.
pub const DEFAULT_BUFFER: u32 = 64;

/// One MVT layer cut from the spatial dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSpec {
    /// MVT layer name.
    pub name: &'static str,
    /// Lowest zoom at which the layer is emitted.
    pub min_zoom: u8,
    /// Source table.
    pub table: &'static str,
    /// Geometry column (EPSG:3857).
    pub geometry_column: &'static str,
    /// Attribute columns copied into feature properties.
    pub columns: &'static [&'static str],
    /// SQL filter over the source table. Static text only.
    pub predicate: &'static str,
    /// Whether geometries are simplified at lower zooms.
    pub simplify: bool,
}

/// Default layers over the osm2pgsql schema, in emission order.
pub const LAYERS: &[LayerSpec] = &[
    LayerSpec {
        name: "water",
        min_zoom: 0,
        table: "planet_osm_polygon",
        geometry_column: "way",
        columns: &["osm_id", "name", "natural", "waterway"],
        predicate: r#""natural" = 'water' OR waterway IS NOT NULL OR landuse = 'reservoir'"#,
        simplify: true,
    },
    LayerSpec {
        name: "admin_2",
        min_zoom: 0,
        table: "planet_osm_line",
        geometry_column: "way",
        columns: &["osm_id", "name", "admin_level"],
        predicate: "boundary = 'administrative' AND admin_level = '2'",
        simplify: true,
    },
    LayerSpec {
        name: "admin_4",
        min_zoom: 4,
        table: "planet_osm_line",
        geometry_column: "way",
        columns: &["osm_id", "name", "admin_level"],
        predicate: "boundary = 'administrative' AND admin_level = '4'",
        simplify: true,
    },
    LayerSpec {
        name: "admin_6",
        min_zoom: 8,
        table: "planet_osm_line",
        geometry_column: "way",
        columns: &["osm_id", "name", "admin_level"],
        predicate: "boundary = 'administrative' AND admin_level = '6'",
        simplify: true,
    },
    LayerSpec {
        name: "admin_8",
        min_zoom: 11,
        table: "planet_osm_line",
        geometry_column: "way",
        columns: &["osm_id", "name", "admin_level"],
        predicate: "boundary = 'administrative' AND admin_level = '8'",
        simplify: true,
    },
    LayerSpec {
        name: "landuse",
        min_zoom: 8,
        table: "planet_osm_polygon",
        geometry_column: "way",
        columns: &["osm_id", "name", "landuse"],
        predicate: "landuse IS NOT NULL",
        simplify: true,
    },
    LayerSpec {
        name: "roads_major",
        min_zoom: 5,
        table: "planet_osm_line",
        geometry_column: "way",
        columns: &["osm_id", "name", "highway", "ref"],
        predicate: "highway IN ('motorway', 'trunk', 'primary')",
        simplify: true,
    },
    LayerSpec {
        name: "roads",
        min_zoom: 10,
        table: "planet_osm_line",
        geometry_column: "way",
        columns: &["osm_id", "name", "highway", "ref"],
        predicate: "highway IS NOT NULL",
        simplify: true,
    },
    LayerSpec {
        name: "buildings",
        min_zoom: 14,
        table: "planet_osm_polygon",
        geometry_column: "way",
        columns: &["osm_id", "name", "building"],
        predicate: "building IS NOT NULL",
        simplify: true,
    },
    LayerSpec {
        name: "pois",
        min_zoom: 12,
        table: "planet_osm_point",
        geometry_column: "way",
        columns: &["osm_id", "name", "amenity", "shop", "tourism"],
        predicate: "amenity IS NOT NULL OR shop IS NOT NULL OR tourism IS NOT NULL",
        simplify: false,
    },
    LayerSpec {
        name: "places",
        min_zoom: 2,
        table: "planet_osm_point",
        geometry_column: "way",
        columns: &["osm_id", "name", "place"],
        predicate: "place IS NOT NULL",
        simplify: false,
    },
];

/// Layers that qualify at `zoom`, in table order.
pub fn layers_for_zoom(zoom: u8) -> Vec<&'static LayerSpec> {
    LAYERS.iter().filter(|layer| zoom >= layer.min_zoom).collect()
}

/// Geometry simplification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimplificationTier {
    /// Zoom below 10.
    Coarse,
    /// Zoom 10 to 13.
    Medium,
    /// Zoom 14 and above; exact geometry.
    Fine,
}

impl SimplificationTier {
    pub fn for_zoom(zoom: u8) -> Self {
        match zoom {
            0..=9 => SimplificationTier::Coarse,
            10..=13 => SimplificationTier::Medium,
            _ => SimplificationTier::Fine,
        }
    }

    /// Tolerance in tile-grid units.
    pub fn tile_units(&self) -> f64 {
        match self {
            SimplificationTier::Coarse => 2.0,
            SimplificationTier::Medium => 1.0,
            SimplificationTier::Fine => 0.0,
        }
    }

    /// Tolerance in meters for a tile at `zoom` rendered on an `extent` grid.
    pub fn tolerance_meters(zoom: u8, extent: u32) -> f64 {
        let tier = Self::for_zoom(zoom);
        tier.tile_units() * tile_size_meters(zoom) / f64::from(extent.max(1))
    }
}

/// Simplification tolerance for one layer at one zoom.
pub fn layer_tolerance(layer: &LayerSpec, zoom: u8, extent: u32) -> f64 {
    if layer.simplify {
        SimplificationTier::tolerance_meters(zoom, extent)
    } else {
        0.0
    }
}
