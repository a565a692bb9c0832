//! Client SPARQL et lecture des résultats JSON
//!
//! Format attendu (`application/sparql-results+json`):
//!
//! ```json
//! {"results":{"bindings":[{"id":{"type":"uri","value":"http://www.wikidata.org/entity/Q30"}}]}}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Properties, PropertyBag, ResolvedIdentities, WikidataId};
use crate::error::{RegionsError, Result};

/// Type de contenu des résultats SPARQL en JSON
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Colonne désignant les entités par défaut
pub const DEFAULT_ID_COLUMN: &str = "id";

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
const WKT_LITERAL: &str = "http://www.opengis.net/ont/geosparql#wktLiteral";

/// Réponse brute d'un point SPARQL
#[derive(Debug, Clone, PartialEq)]
pub struct SparqlResponse {
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Exécution d'une requête SPARQL
#[async_trait]
pub trait SparqlClient: Send + Sync {
    async fn query(&self, sparql: &str) -> Result<SparqlResponse>;
}

/// Client HTTP (GET `?format=json&query=...`), sans nouvelle tentative
#[derive(Debug, Clone)]
pub struct HttpSparqlClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSparqlClient {
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SparqlClient for HttpSparqlClient {
    async fn query(&self, sparql: &str) -> Result<SparqlResponse> {
        debug!(endpoint = %self.endpoint, "Running SPARQL query");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("format", "json"), ("query", sparql)])
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        Ok(SparqlResponse { content_type, body })
    }
}

/// Valide une réponse SPARQL et en extrait identifiants et attributs
pub fn parse_response(
    response: &SparqlResponse,
    id_column: &str,
    id_only: bool,
) -> Result<ResolvedIdentities> {
    let content_type = response.content_type.as_deref().unwrap_or_default();
    if !content_type.starts_with(SPARQL_RESULTS_JSON) {
        return Err(RegionsError::upstream(format!(
            "Unexpected content type {}",
            content_type
        )));
    }
    let data: SparqlResults = serde_json::from_slice(&response.body)
        .map_err(|e| RegionsError::upstream(format!("Invalid SPARQL JSON: {}", e)))?;
    let bindings = data
        .results
        .and_then(|r| r.bindings)
        .ok_or_else(|| {
            RegionsError::upstream(r#"SPARQL query result does not have "results.bindings""#)
        })?;
    parse_bindings(&bindings, id_column, id_only)
}

/// Enveloppe `application/sparql-results+json`, `head` ignoré
#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    results: Option<SparqlBindings>,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    #[serde(default)]
    bindings: Option<Vec<Value>>,
}

/// Extrait les identifiants de la colonne `id_column`
///
/// La colonne d'identifiant est retirée des attributs. Avec `id_only`, les
/// autres colonnes sont conservées sans conversion.
pub fn parse_bindings(bindings: &[Value], id_column: &str, id_only: bool) -> Result<ResolvedIdentities> {
    let mut ids = Vec::with_capacity(bindings.len());
    let mut properties = PropertyBag::with_capacity(bindings.len());

    for binding in bindings {
        let Some(row) = binding.as_object() else {
            return Err(RegionsError::upstream("SPARQL binding is not an object"));
        };
        let Some(value) = row.get(id_column) else {
            return Err(RegionsError::upstream(format!(
                "SPARQL query result does not contain {:?} column.",
                id_column
            )));
        };

        let id = (value.get("type").and_then(Value::as_str) == Some("uri"))
            .then(|| value.get("value").and_then(Value::as_str))
            .flatten()
            .and_then(WikidataId::from_entity_uri)
            .ok_or_else(|| {
                RegionsError::upstream(format!(
                    "SPARQL query result id column {:?} is expected to be a valid Wikidata ID",
                    id_column
                ))
            })?;
        if properties.contains_key(&id) {
            return Err(RegionsError::upstream(format!(
                "SPARQL query result contains non-unique ID {:?}",
                id.as_str()
            )));
        }

        let attributes: Properties = row
            .iter()
            .filter(|(name, _)| name.as_str() != id_column)
            .map(|(name, value)| {
                let value = if id_only { value.clone() } else { parse_value(value) };
                (name.clone(), value)
            })
            .collect();

        ids.push(id.clone());
        properties.insert(id, attributes);
    }

    debug!(ids = ids.len(), "SPARQL bindings parsed");
    Ok(ResolvedIdentities { ids, properties })
}

/// Convertit une valeur typée SPARQL en valeur JSON native
pub fn parse_value(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return value.clone();
    };
    let raw = object.get("value").and_then(Value::as_str).unwrap_or_default();

    match object.get("type").and_then(Value::as_str) {
        Some("uri") => match WikidataId::from_entity_uri(raw) {
            Some(id) => Value::String(id.to_string()),
            None => Value::String(raw.to_string()),
        },
        Some("literal") | Some("typed-literal") => {
            match object.get("datatype").and_then(Value::as_str) {
                Some(datatype) => parse_typed_literal(raw, datatype),
                None => Value::String(raw.to_string()),
            }
        }
        _ => Value::String(raw.to_string()),
    }
}

fn parse_typed_literal(raw: &str, datatype: &str) -> Value {
    if datatype == WKT_LITERAL {
        return parse_wkt_point(raw).unwrap_or_else(|| Value::String(raw.to_string()));
    }
    let Some(xsd_type) = datatype.strip_prefix(XSD) else {
        return Value::String(raw.to_string());
    };
    let parsed = match xsd_type {
        "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
        | "positiveInteger" | "negativeInteger" | "nonPositiveInteger" | "unsignedInt"
        | "unsignedLong" => raw.parse::<i64>().ok().map(Value::from),
        "decimal" | "double" | "float" => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "boolean" => match raw {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

/// `Point(x y)` → `[x, y]`
fn parse_wkt_point(raw: &str) -> Option<Value> {
    let inner = raw
        .trim()
        .strip_prefix("Point(")
        .or_else(|| raw.trim().strip_prefix("POINT("))?
        .strip_suffix(')')?;
    let mut parts = inner.split_whitespace().map(str::parse::<f64>);
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    let mut point = Vec::with_capacity(2);
    for v in [x, y] {
        point.push(Value::Number(serde_json::Number::from_f64(v)?));
    }
    Some(Value::Array(point))
}
