//! # regions-topology
//!
//! Topologie à arcs partagés et simplification adaptative de polygones de régions.
//!
//! ## Features
//!
//! - Construction de topologie: les frontières communes deviennent un seul arc
//! - Simplification de Visvalingam (aire plane ou excès sphérique), seuil
//!   absolu ou calibré par quantile
//! - Filtrage des anneaux dégénérés (`none`, `all`, `detached`)
//! - Quantification sur une grille entière
//! - Sortie TopoJSON et GeoJSON (via `geozero`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use regions_topology::{presimplify, quantize, RingFilter, TopologyBuilder, WeightSystem};
//!
//! let topology = TopologyBuilder::new().build("data", features)?;
//! let presimplified = presimplify(topology, WeightSystem::Spherical);
//! let threshold = presimplified.quantile(0.07);
//! let topology = presimplified.simplify(threshold);
//! let topology = RingFilter::All.apply(topology, threshold, WeightSystem::Spherical)?;
//! let topology = quantize(topology, 10_000)?;
//! ```

pub mod build;
pub mod error;
pub mod feature;
pub mod filter;
pub mod quantize;
pub mod simplify;
pub mod types;
pub mod writer;

pub use build::TopologyBuilder;
pub use error::TopologyError;
pub use feature::{features, ArcReader, OutputFeature};
pub use filter::{prune, RingFilter};
pub use quantize::quantize;
pub use simplify::{presimplify, Presimplified, WeightSystem};
pub use types::{
    ArcPath, ArcRef, BBox, InputFeature, Properties, TopoGeometry, TopoObject, Topology,
    Transform,
};
pub use writer::{topojson_value, write_geojson, write_raw_feature, write_topojson};
