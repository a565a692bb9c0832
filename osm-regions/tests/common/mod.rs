//! Doublures partagées par les tests d'intégration

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use osm_regions::error::{RegionsError, Result};
use osm_regions::identity::{
    SparqlClient, SparqlEndpoints, SparqlOptions, SparqlResponse, WikidataId, SPARQL_RESULTS_JSON,
};
use osm_regions::pipeline::RegionPipeline;
use osm_regions::store::{GeometryFetcher, GeometryRecord, GeometryStore, RegionsSource};

/// Deux carrés voisins de 1° partageant le méridien 1
pub const WEST: &str = r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[0,0.5],[0,1],[0.5,1.02],[1,1],[1,0.5],[1,0],[0.5,-0.02],[0,0]]]]}"#;
pub const EAST: &str = r#"{"type":"MultiPolygon","coordinates":[[[[1,0],[1,0.5],[1,1],[1.5,1.03],[2,1],[2,0.5],[2,0],[1.5,-0.01],[1,0]]]]}"#;

/// Stockage en mémoire: une géométrie par identifiant
#[derive(Default)]
pub struct MemoryStore {
    geometries: HashMap<String, String>,
    pub calls: AtomicUsize,
    pub last_water_table: Mutex<Option<String>>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn with(regions: &[(&str, &str)]) -> Self {
        Self {
            geometries: regions
                .iter()
                .map(|(id, geometry)| (id.to_string(), geometry.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl GeometryStore for MemoryStore {
    async fn query(
        &self,
        _table: &str,
        ids: &[WikidataId],
        water_table: Option<&str>,
    ) -> Result<Vec<GeometryRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_water_table.lock() {
            *last = water_table.map(str::to_string);
        }
        if self.fail {
            return Err(RegionsError::store(anyhow::anyhow!("connection refused")));
        }
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.geometries.get(id.as_str()).map(|data| GeometryRecord {
                    id: id.clone(),
                    data: data.clone(),
                })
            })
            .collect())
    }
}

/// Point SPARQL renvoyant toujours la même réponse
pub struct FixedSparql {
    pub content_type: Option<String>,
    pub body: Bytes,
    pub calls: AtomicUsize,
}

impl FixedSparql {
    pub fn json(body: Value) -> Self {
        Self {
            content_type: Some(format!("{}; charset=utf-8", SPARQL_RESULTS_JSON)),
            body: Bytes::from(body.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn html() -> Self {
        Self {
            content_type: Some("text/html".into()),
            body: Bytes::from_static(b"<html></html>"),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SparqlClient for FixedSparql {
    async fn query(&self, _sparql: &str) -> Result<SparqlResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SparqlResponse {
            content_type: self.content_type.clone(),
            body: self.body.clone(),
        })
    }
}

/// Résultat SPARQL: une ligne par (identifiant, libellé)
pub fn bindings(rows: &[(&str, &str)]) -> Value {
    bindings_in("id", rows)
}

/// Idem, identifiants dans la colonne `column`
pub fn bindings_in(column: &str, rows: &[(&str, &str)]) -> Value {
    let rows: Vec<Value> = rows
        .iter()
        .map(|(id, label)| {
            json!({
                column: {"type": "uri", "value": format!("http://www.wikidata.org/entity/{}", id)},
                "label": {"type": "literal", "xml:lang": "en", "value": label},
                "population": {
                    "type": "literal",
                    "datatype": "http://www.w3.org/2001/XMLSchema#integer",
                    "value": "1000"
                }
            })
        })
        .collect();
    json!({"head": {"vars": [column, "label", "population"]}, "results": {"bindings": rows}})
}

pub fn source(water_table: Option<&str>) -> RegionsSource {
    RegionsSource {
        table: "planet_osm_polygon".into(),
        water_table: water_table.map(str::to_string),
    }
}

pub fn pipeline(
    store: Arc<MemoryStore>,
    sophox: Arc<FixedSparql>,
    wikidata: Arc<FixedSparql>,
) -> RegionPipeline {
    pipeline_with(store, sophox, wikidata, source(None), SparqlOptions::default())
}

pub fn pipeline_with(
    store: Arc<MemoryStore>,
    sophox: Arc<FixedSparql>,
    wikidata: Arc<FixedSparql>,
    source: RegionsSource,
    options: SparqlOptions,
) -> RegionPipeline {
    RegionPipeline::new(
        GeometryFetcher::new(store, source),
        SparqlEndpoints {
            sophox,
            wikidata,
            options,
        },
    )
}

/// Pipeline sur les deux carrés, sans SPARQL exploitable
pub fn default_pipeline() -> RegionPipeline {
    pipeline(
        Arc::new(MemoryStore::with(&[("Q1", WEST), ("Q2", EAST)])),
        Arc::new(FixedSparql::json(bindings(&[("Q1", "West"), ("Q2", "East")]))),
        Arc::new(FixedSparql::html()),
    )
}
