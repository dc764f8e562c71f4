//! PostGIS feature source.
//!
//! Cuts one MVT layer per query with `ST_AsMVTGeom` / `ST_AsMVT`. Only the
//! static identifiers from the layer table are formatted into SQL text; the
//! envelope, tolerance, extent, buffer and layer name are bound parameters.

use deadpool_postgres::Pool;
use tracing::trace;

use crate::cache::BoxFuture;
use crate::coord::Crs;

use super::layers::LayerSpec;
use super::source::{FeatureSource, LayerQuery};
use super::GeneratorError;

/// Build the layer query for `layer`.
///
/// Parameters: `$1..$4` west/south/east/north, `$5` tolerance, `$6` extent,
/// `$7` buffer, `$8` layer name.
pub fn layer_sql(layer: &LayerSpec) -> String {
    let geom = format!("src.\"{}\"", layer.geometry_column);
    let columns: String = layer
        .columns
        .iter()
        .map(|c| format!(", src.\"{}\"", c))
        .collect();

    format!(
        "WITH bounds AS (
    SELECT ST_MakeEnvelope($1::float8, $2::float8, $3::float8, $4::float8, {srid}) AS geom
),
features AS (
    SELECT ST_AsMVTGeom(
               CASE WHEN $5::float8 > 0
                    THEN ST_SimplifyPreserveTopology({geom}, $5::float8)
                    ELSE {geom} END,
               bounds.geom::box2d, $6::int4, $7::int4, true) AS mvt_geom{columns}
    FROM \"{table}\" AS src, bounds
    WHERE {geom} && bounds.geom AND ({predicate})
)
SELECT ST_AsMVT(features, $8::text, $6::int4, 'mvt_geom')
FROM features
WHERE mvt_geom IS NOT NULL",
        srid = Crs::WebMercator.srid(),
        geom = geom,
        columns = columns,
        table = layer.table,
        predicate = layer.predicate,
    )
}

/// [`FeatureSource`] over an osm2pgsql database.
#[derive(Clone)]
pub struct PostgisFeatureSource {
    pool: Pool,
}

impl PostgisFeatureSource {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl FeatureSource for PostgisFeatureSource {
    fn layer_tile<'a>(
        &'a self,
        layer: &'static LayerSpec,
        query: &'a LayerQuery,
    ) -> BoxFuture<'a, Result<Vec<u8>, GeneratorError>> {
        Box::pin(async move {
            let client = self.pool.get().await?;
            let stmt = client.prepare_cached(&layer_sql(layer)).await?;

            let extent = i32::try_from(query.extent).unwrap_or(i32::MAX);
            let buffer = i32::try_from(query.buffer).unwrap_or(i32::MAX);
            let row = client
                .query_one(
                    &stmt,
                    &[
                        &query.bounds.west,
                        &query.bounds.south,
                        &query.bounds.east,
                        &query.bounds.north,
                        &query.tolerance,
                        &extent,
                        &buffer,
                        &layer.name,
                    ],
                )
                .await?;

            let data: Option<Vec<u8>> = row.get(0);
            let data = data.unwrap_or_default();
            trace!(layer = layer.name, size = data.len(), "Layer query complete");
            Ok(data)
        })
    }
}
