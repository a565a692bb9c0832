//! Tests d'intégration PostgreSQL
//!
//! Ces tests nécessitent une base PostGIS disponible (extensions `postgis`
//! et `hstore`). Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! docker run -d --name postgres-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgis/postgis
//! PGPASSWORD=test cargo test --test postgres_integration -- --ignored --test-threads=1
//! ```

use anyhow::Result;
use deadpool_postgres::Pool;
use serde_json::Value;

use osm_regions::identity::WikidataId;
use osm_regions::store::{
    create_pool, test_connection, DatabaseConfig, GeometryStore, PgGeometryStore, SchemaLayout,
};

/// Configuration de test
fn test_config() -> DatabaseConfig {
    let defaults = DatabaseConfig::default();
    DatabaseConfig {
        host: std::env::var("PGHOST").unwrap_or(defaults.host),
        port: std::env::var("PGPORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port),
        dbname: std::env::var("PGDATABASE").unwrap_or_else(|_| "osm_regions_test".into()),
        user: std::env::var("PGUSER").unwrap_or(defaults.user),
        password: std::env::var("PGPASSWORD").ok(),
        pool_size: 2,
        ..defaults
    }
}

/// Configure la base de test: deux dispositions et une table d'eau
///
/// Q1 est formé de deux carrés adjacents (union attendue en un seul polygone),
/// Q2 est traversé par un lac.
async fn setup_test_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;

    client
        .batch_execute(
            r#"
            CREATE EXTENSION IF NOT EXISTS postgis;
            CREATE EXTENSION IF NOT EXISTS hstore;

            DROP SCHEMA IF EXISTS regions_test CASCADE;
            CREATE SCHEMA regions_test;

            CREATE TABLE regions_test.hstore_polygons (
                osm_id BIGINT,
                tags hstore,
                way geometry(Geometry, 3857)
            );

            CREATE TABLE regions_test.column_polygons (
                osm_id BIGINT,
                wikidata TEXT,
                way geometry(Geometry, 3857)
            );

            CREATE TABLE regions_test.water (
                way geometry(Geometry, 3857)
            );

            INSERT INTO regions_test.hstore_polygons VALUES
                (1, 'wikidata=>Q1', ST_Transform(ST_MakeEnvelope(0, 0, 1, 1, 4326), 3857)),
                (2, 'wikidata=>Q1', ST_Transform(ST_MakeEnvelope(1, 0, 2, 1, 4326), 3857)),
                (3, 'wikidata=>Q2', ST_Transform(ST_MakeEnvelope(10, 10, 12, 12, 4326), 3857)),
                (4, 'name=>untagged', ST_Transform(ST_MakeEnvelope(20, 20, 21, 21, 4326), 3857));

            INSERT INTO regions_test.column_polygons
            SELECT osm_id, tags->'wikidata', way FROM regions_test.hstore_polygons;

            INSERT INTO regions_test.water VALUES
                (ST_Transform(ST_MakeEnvelope(10.5, 10.5, 11.5, 11.5, 4326), 3857)),
                (ST_Transform(ST_MakeEnvelope(30, 30, 31, 31, 4326), 3857));
            "#,
        )
        .await?;

    Ok(())
}

async fn setup() -> Pool {
    let pool = create_pool(&test_config()).expect("Failed to create pool");
    setup_test_schema(&pool).await.expect("Failed to setup schema");
    pool
}

fn ids(values: &[&str]) -> Vec<WikidataId> {
    values.iter().map(|v| v.parse().unwrap()).collect()
}

fn geometry(data: &str) -> Value {
    serde_json::from_str(data).unwrap()
}

/// Nombre d'anneaux du premier polygone
fn ring_count(geometry: &Value) -> usize {
    geometry["coordinates"][0].as_array().unwrap().len()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_database_connection() {
    let pool = create_pool(&test_config()).expect("Failed to create pool");
    test_connection(&pool).await.expect("Connection test failed");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_hstore_union() {
    let store = PgGeometryStore::new(setup().await, SchemaLayout::Hstore);
    let mut records = store
        .query("regions_test.hstore_polygons", &ids(&["Q1", "Q2", "Q3"]), None)
        .await
        .unwrap();
    records.sort_by(|a, b| a.id.cmp(&b.id));

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id.as_str(), "Q1");
    let q1 = geometry(&records[0].data);
    assert_eq!(q1["type"], "MultiPolygon");
    // Les deux carrés fusionnent en un seul polygone
    assert_eq!(q1["coordinates"].as_array().unwrap().len(), 1);
    assert_eq!(ring_count(&q1), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_column_layout() {
    let store = PgGeometryStore::new(setup().await, SchemaLayout::Column);
    let records = store
        .query("regions_test.column_polygons", &ids(&["Q2"]), None)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.as_str(), "Q2");
    assert_eq!(ring_count(&geometry(&records[0].data)), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_water_clipping() {
    let store = PgGeometryStore::new(setup().await, SchemaLayout::Hstore);
    let mut records = store
        .query(
            "regions_test.hstore_polygons",
            &ids(&["Q1", "Q2"]),
            Some("regions_test.water"),
        )
        .await
        .unwrap();
    records.sort_by(|a, b| a.id.cmp(&b.id));

    assert_eq!(records.len(), 2);
    // Sans plan d'eau, Q1 est inchangé
    assert_eq!(ring_count(&geometry(&records[0].data)), 1);
    // Le lac devient un trou de Q2
    assert_eq!(ring_count(&geometry(&records[1].data)), 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_unknown_ids_return_nothing() {
    let store = PgGeometryStore::new(setup().await, SchemaLayout::Hstore);
    let records = store
        .query("regions_test.hstore_polygons", &ids(&["Q404"]), None)
        .await
        .unwrap();
    assert!(records.is_empty());
}
