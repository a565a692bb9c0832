//! Configuration du service
//!
//! Assemblée une seule fois au démarrage depuis l'environnement (après
//! chargement du `.env`), puis complétée par les options de la ligne de commande.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::identity::SparqlOptions;
use crate::store::{DatabaseConfig, RegionsSource, SchemaLayout, SslMode};

/// Point SPARQL par défaut pour `service=sophox`
pub const DEFAULT_SOPHOX_URL: &str = "https://sophox.org/sparql";

/// Point SPARQL par défaut pour `service=wikidata`
pub const DEFAULT_WIKIBASE_URL: &str = "https://query.wikidata.org/bigdata/namespace/wdq/sparql";

/// Configuration des clients SPARQL
#[derive(Debug, Clone, PartialEq)]
pub struct SparqlConfig {
    pub sophox_url: String,
    pub wikibase_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub options: SparqlOptions,
}

impl Default for SparqlConfig {
    fn default() -> Self {
        Self {
            sophox_url: DEFAULT_SOPHOX_URL.into(),
            wikibase_url: DEFAULT_WIKIBASE_URL.into(),
            timeout: Duration::from_secs(60),
            user_agent: "osm-regions".into(),
            options: SparqlOptions::default(),
        }
    }
}

/// Configuration principale
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub layout: SchemaLayout,
    pub source: RegionsSource,
    pub sparql: SparqlConfig,
    pub listen_addr: SocketAddr,
}

impl AppConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Charge la configuration depuis une source de variables quelconque
    ///
    /// # Errors
    ///
    /// `REGIONS_TABLE` absente, ou valeur illisible pour une variable présente.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_defaults = DatabaseConfig::default();
        let sparql_defaults = SparqlConfig::default();

        let database = DatabaseConfig {
            host: lookup("POSTGRES_HOST").unwrap_or(db_defaults.host),
            port: parse_var(&lookup, "POSTGRES_PORT")?.unwrap_or(db_defaults.port),
            dbname: lookup("POSTGRES_DB").unwrap_or(db_defaults.dbname),
            user: lookup("POSTGRES_USER").unwrap_or(db_defaults.user),
            password: lookup("POSTGRES_PASSWORD"),
            pool_size: parse_var(&lookup, "POOL_SIZE")?.unwrap_or(db_defaults.pool_size),
            ssl_mode: parse_var::<SslMode>(&lookup, "POSTGRES_SSLMODE")?.unwrap_or_default(),
            statement_timeout: parse_var(&lookup, "POSTGRES_STATEMENT_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(db_defaults.statement_timeout),
        };

        let table = lookup("REGIONS_TABLE")
            .filter(|t| !t.is_empty())
            .context("REGIONS_TABLE must be set")?;
        let source = RegionsSource {
            table,
            water_table: lookup("OSM_REGIONS_SQL_WATER_TABLE").filter(|t| !t.is_empty()),
        };

        let sparql = SparqlConfig {
            sophox_url: lookup("SOPHOX_URL").unwrap_or(sparql_defaults.sophox_url),
            wikibase_url: lookup("WIKIBASE_URL").unwrap_or(sparql_defaults.wikibase_url),
            timeout: parse_var(&lookup, "SPARQL_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(sparql_defaults.timeout),
            user_agent: lookup("SPARQL_USER_AGENT").unwrap_or(sparql_defaults.user_agent),
            options: SparqlOptions {
                id_column: lookup("SPARQL_ID_COLUMN")
                    .filter(|c| !c.is_empty())
                    .unwrap_or(sparql_defaults.options.id_column),
                id_only: parse_var(&lookup, "SPARQL_ID_ONLY")?
                    .unwrap_or(sparql_defaults.options.id_only),
            },
        };

        Ok(Self {
            database,
            layout: parse_var(&lookup, "REGIONS_SCHEMA")?.unwrap_or_default(),
            source,
            sparql,
            listen_addr: parse_var(&lookup, "LISTEN_ADDR")?
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 9978))),
        })
    }
}

/// Lit et convertit une variable optionnelle
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {:?} ({})", key, raw, e)),
    }
}
