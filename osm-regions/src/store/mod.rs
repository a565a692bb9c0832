//! Récupération des géométries des régions
//!
//! - `sql`: génération des requêtes d'union (simple ou privée des plans d'eau)
//! - `pool`: pool de connexions PostgreSQL
//! - `postgres`: implémentation PostGIS de `GeometryStore`

pub mod pool;
pub mod postgres;
pub mod sql;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::identity::WikidataId;

pub use pool::{create_pool, test_connection, DatabaseConfig, SslMode};
pub use postgres::PgGeometryStore;
pub use sql::SchemaLayout;

/// Une ligne renvoyée par le stockage: une géométrie GeoJSON par identifiant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryRecord {
    pub id: WikidataId,
    /// Fragment GeoJSON, déjà unifié et orienté
    pub data: String,
}

/// Source des géométries
#[async_trait]
pub trait GeometryStore: Send + Sync {
    /// Exécute une requête d'union pour les identifiants donnés
    ///
    /// `water_table` active la variante privée des plans d'eau.
    async fn query(
        &self,
        table: &str,
        ids: &[WikidataId],
        water_table: Option<&str>,
    ) -> Result<Vec<GeometryRecord>>;
}

/// Table des régions à interroger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionsSource {
    pub table: String,
    pub water_table: Option<String>,
}

/// Récupère les géométries d'une liste d'identifiants
#[derive(Clone)]
pub struct GeometryFetcher {
    store: Arc<dyn GeometryStore>,
    source: RegionsSource,
}

impl GeometryFetcher {
    pub fn new(store: Arc<dyn GeometryStore>, source: RegionsSource) -> Self {
        Self { store, source }
    }

    /// Une liste vide ne déclenche aucune requête
    pub async fn fetch(&self, ids: &[WikidataId]) -> Result<Vec<GeometryRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = self
            .store
            .query(&self.source.table, ids, self.source.water_table.as_deref())
            .await?;
        debug!(
            requested = ids.len(),
            rows = records.len(),
            water = self.source.water_table.is_some(),
            "Geometries fetched"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GeometryStore for CountingStore {
        async fn query(
            &self,
            table: &str,
            ids: &[WikidataId],
            water_table: Option<&str>,
        ) -> Result<Vec<GeometryRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(table, "regions");
            assert_eq!(water_table, Some("water"));
            Ok(ids
                .iter()
                .map(|id| GeometryRecord {
                    id: id.clone(),
                    data: r#"{"type":"MultiPolygon","coordinates":[]}"#.into(),
                })
                .collect())
        }
    }

    fn fetcher(store: Arc<CountingStore>) -> GeometryFetcher {
        GeometryFetcher::new(
            store,
            RegionsSource {
                table: "regions".into(),
                water_table: Some("water".into()),
            },
        )
    }

    #[tokio::test]
    async fn test_empty_ids_skip_query() {
        let store = Arc::new(CountingStore::default());
        let records = fetcher(store.clone()).fetch(&[]).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_passes_source() {
        let store = Arc::new(CountingStore::default());
        let ids: Vec<WikidataId> = vec!["Q30".parse().unwrap()];
        let records = fetcher(store.clone()).fetch(&ids).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "Q30");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }
}
