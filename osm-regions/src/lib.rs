//! # osm-regions
//!
//! Service HTTP renvoyant les contours simplifiés de régions OSM, désignées
//! par leurs identifiants Wikidata.
//!
//! ## Features
//!
//! - Identifiants explicites (`ids=Q30,Q16`) ou résolus par SPARQL (Sophox, Wikidata)
//! - Union PostGIS par identifiant, éventuellement privée des plans d'eau
//! - Topologie à arcs partagés et simplification calibrée par quantile
//! - Sortie GeoJSON ou TopoJSON
//!
//! ## Usage
//!
//! ```bash
//! REGIONS_TABLE=planet_osm_polygon osm-regions --listen 0.0.0.0:9978
//! curl 'http://localhost:9978/regions/geojson.json?ids=Q30,Q16'
//! ```

pub mod assemble;
pub mod config;
pub mod error;
pub mod identity;
pub mod params;
pub mod pipeline;
pub mod response;
pub mod server;
pub mod store;

pub use config::AppConfig;
pub use error::RegionsError;
pub use params::{resolve, PipelineRequest};
pub use pipeline::RegionPipeline;
pub use response::RegionResponse;
