//! Stockage PostGIS

use anyhow::Context;
use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::{debug, warn};

use super::sql::{union_query, SchemaLayout};
use super::{GeometryRecord, GeometryStore};
use crate::error::{RegionsError, Result};
use crate::identity::WikidataId;

/// Géométries lues dans une base osm2pgsql
#[derive(Clone)]
pub struct PgGeometryStore {
    pool: Pool,
    layout: SchemaLayout,
}

impl PgGeometryStore {
    pub fn new(pool: Pool, layout: SchemaLayout) -> Self {
        Self { pool, layout }
    }
}

#[async_trait]
impl GeometryStore for PgGeometryStore {
    async fn query(
        &self,
        table: &str,
        ids: &[WikidataId],
        water_table: Option<&str>,
    ) -> Result<Vec<GeometryRecord>> {
        let sql = union_query(self.layout, table, water_table);
        let params: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();

        let client = self
            .pool
            .get()
            .await
            .context("Failed to get connection from pool")
            .map_err(RegionsError::store)?;
        debug!(table, ids = ids.len(), "Running union query");
        let rows = client
            .query(sql.as_str(), &[&params])
            .await
            .context("Union query failed")
            .map_err(RegionsError::store)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(RegionsError::store)?;
            let data: Option<String> = row.try_get("data").map_err(RegionsError::store)?;
            let Some(data) = data else {
                warn!(id = %id, "Region without geometry");
                continue;
            };
            let id = id.parse::<WikidataId>().map_err(|e| {
                RegionsError::store(anyhow::anyhow!("Unexpected id {:?} in store: {}", id, e))
            })?;
            records.push(GeometryRecord { id, data });
        }
        Ok(records)
    }
}
