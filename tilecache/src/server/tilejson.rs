//! TileJSON 3.0.0 metadata document.

use serde::Serialize;

use crate::coord::MAX_LAT;

/// Attribution shown by client renderers.
pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// TileJSON describing the tile endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileJson {
    pub tilejson: &'static str,
    pub name: String,
    pub description: String,
    pub version: String,
    pub attribution: String,
    pub scheme: &'static str,
    pub tiles: Vec<String>,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub bounds: [f64; 4],
    pub center: [f64; 3],
}

impl TileJson {
    /// Metadata for tiles served under `public_url`.
    pub fn new(public_url: &str) -> Self {
        let base = public_url.trim_end_matches('/');
        let lat = (MAX_LAT * 10_000.0).trunc() / 10_000.0;
        Self {
            tilejson: "3.0.0",
            name: "Cached OSM Tiles".to_string(),
            description: "Vector tiles generated from OpenStreetMap data".to_string(),
            version: crate::VERSION.to_string(),
            attribution: ATTRIBUTION.to_string(),
            scheme: "xyz",
            tiles: vec![format!("{}/tiles/{{z}}/{{x}}/{{y}}.mvt", base)],
            minzoom: 0,
            maxzoom: 18,
            bounds: [-180.0, -lat, 180.0, lat],
            center: [0.0, 0.0, 2.0],
        }
    }

    /// Override the advertised zoom range.
    pub fn with_zoom_range(mut self, minzoom: u8, maxzoom: u8) -> Self {
        self.minzoom = minzoom;
        self.maxzoom = maxzoom;
        self
    }
}
