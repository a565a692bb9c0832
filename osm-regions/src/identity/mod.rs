//! Résolution des identifiants de régions
//!
//! Les identifiants viennent soit d'une liste explicite (`ids`), soit d'une
//! requête SPARQL dont une colonne désigne les entités Wikidata.

pub mod sparql;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

pub use sparql::{parse_bindings, HttpSparqlClient, SparqlClient, SparqlResponse, SPARQL_RESULTS_JSON};

use crate::error::Result;

static WIKIDATA_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Q[1-9][0-9]{0,15}$").expect("valid regex"));

/// Identifiant d'entité Wikidata (ex: `Q30`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WikidataId(String);

impl WikidataId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifiant d'une URI d'entité (`http://www.wikidata.org/entity/Q30`)
    pub fn from_entity_uri(uri: &str) -> Option<Self> {
        let (_, suffix) = uri.rsplit_once("/entity/")?;
        suffix.parse().ok()
    }
}

impl FromStr for WikidataId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if WIKIDATA_ID.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("Invalid Wikidata ID {:?}", s))
        }
    }
}

impl fmt::Display for WikidataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attributs d'une entité issus des colonnes SPARQL
pub type Properties = Map<String, Value>;

/// Attributs par identifiant
pub type PropertyBag = HashMap<WikidataId, Properties>;

/// Point SPARQL interrogé
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SparqlService {
    #[default]
    Sophox,
    Wikidata,
}

impl FromStr for SparqlService {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sophox" => Ok(SparqlService::Sophox),
            "wikidata" => Ok(SparqlService::Wikidata),
            _ => Err(format!("Invalid SPARQL service: {}. Use: sophox, wikidata", s)),
        }
    }
}

impl SparqlService {
    pub fn name(self) -> &'static str {
        match self {
            SparqlService::Sophox => "sophox",
            SparqlService::Wikidata => "wikidata",
        }
    }
}

/// Origine des identifiants d'une requête
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// Liste déjà validée, sans attributs
    Explicit(Vec<WikidataId>),
    /// Requête SPARQL dont la colonne `id` désigne les régions
    Sparql { query: String, service: SparqlService },
}

/// Identifiants résolus, dans l'ordre de la source, et leurs attributs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedIdentities {
    pub ids: Vec<WikidataId>,
    pub properties: PropertyBag,
}

/// Lecture des résultats SPARQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlOptions {
    /// Colonne désignant les entités
    pub id_column: String,
    /// Attributs recopiés tels quels, sans conversion des valeurs typées
    pub id_only: bool,
}

impl Default for SparqlOptions {
    fn default() -> Self {
        Self {
            id_column: sparql::DEFAULT_ID_COLUMN.into(),
            id_only: false,
        }
    }
}

/// Points SPARQL disponibles
#[derive(Clone)]
pub struct SparqlEndpoints {
    pub sophox: std::sync::Arc<dyn SparqlClient>,
    pub wikidata: std::sync::Arc<dyn SparqlClient>,
    pub options: SparqlOptions,
}

impl SparqlEndpoints {
    pub fn get(&self, service: SparqlService) -> &dyn SparqlClient {
        match service {
            SparqlService::Sophox => self.sophox.as_ref(),
            SparqlService::Wikidata => self.wikidata.as_ref(),
        }
    }
}

impl IdentitySource {
    pub fn sparql_text(&self) -> Option<&str> {
        match self {
            IdentitySource::Sparql { query, .. } => Some(query),
            IdentitySource::Explicit(_) => None,
        }
    }

    /// Résout les identifiants; seule la variante SPARQL fait un appel externe
    pub async fn resolve(&self, endpoints: &SparqlEndpoints) -> Result<ResolvedIdentities> {
        match self {
            IdentitySource::Explicit(ids) => Ok(ResolvedIdentities {
                ids: ids.clone(),
                properties: PropertyBag::new(),
            }),
            IdentitySource::Sparql { query, service } => {
                let response = endpoints.get(*service).query(query).await?;
                let options = &endpoints.options;
                sparql::parse_response(&response, &options.id_column, options.id_only)
            }
        }
    }
}
