//! Point d'entrée du service osm-regions

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

use osm_regions::config::AppConfig;
use osm_regions::identity::{HttpSparqlClient, SparqlEndpoints};
use osm_regions::pipeline::RegionPipeline;
use osm_regions::server;
use osm_regions::store::{
    create_pool, test_connection, GeometryFetcher, PgGeometryStore, SchemaLayout,
};

/// Charge `.env`: répertoire courant et ses parents, sinon répertoire du binaire
fn load_env() {
    if dotenvy::dotenv().is_err() {
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Servir les contours simplifiés des régions OSM
#[derive(Parser)]
#[command(name = "osm-regions")]
#[command(author, version)]
#[command(about = "Servir les contours simplifiés des régions OSM en GeoJSON ou TopoJSON")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long)]
    quiet: bool,

    /// Adresse d'écoute (défaut: LISTEN_ADDR ou 0.0.0.0:9978)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Table des régions (défaut: REGIONS_TABLE)
    #[arg(short, long)]
    table: Option<String>,

    /// Table des plans d'eau à soustraire (défaut: OSM_REGIONS_SQL_WATER_TABLE)
    #[arg(long)]
    water_table: Option<String>,

    /// Disposition de la table: hstore ou column (défaut: REGIONS_SCHEMA)
    #[arg(long)]
    schema: Option<SchemaLayout>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    // Les options de la ligne de commande priment sur l'environnement
    let table = cli.table.clone();
    let mut config = AppConfig::from_lookup(|key| match (key, &table) {
        ("REGIONS_TABLE", Some(table)) => Some(table.clone()),
        _ => std::env::var(key).ok(),
    })?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    if let Some(water_table) = cli.water_table {
        config.source.water_table = Some(water_table);
    }
    if let Some(layout) = cli.schema {
        config.layout = layout;
    }

    info!(
        table = %config.source.table,
        water_table = ?config.source.water_table,
        layout = ?config.layout,
        database = %config.database,
        "Starting osm-regions"
    );

    let pool = create_pool(&config.database)?;
    match test_connection(&pool).await {
        Ok(version) => info!(postgis = %version, "Database connected"),
        Err(e) => warn!("Database not reachable yet: {:#}", e),
    }

    let store = PgGeometryStore::new(pool, config.layout);
    let fetcher = GeometryFetcher::new(Arc::new(store), config.source.clone());
    let endpoints = SparqlEndpoints {
        sophox: Arc::new(HttpSparqlClient::new(
            &config.sparql.sophox_url,
            &config.sparql.user_agent,
            config.sparql.timeout,
        )?),
        wikidata: Arc::new(HttpSparqlClient::new(
            &config.sparql.wikibase_url,
            &config.sparql.user_agent,
            config.sparql.timeout,
        )?),
        options: config.sparql.options.clone(),
    };

    let pipeline = Arc::new(RegionPipeline::new(fetcher, endpoints));
    server::serve(config.listen_addr, server::router(pipeline)).await
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
