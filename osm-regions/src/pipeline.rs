//! Pipeline d'une requête de régions
//!
//! Identifiants → géométries → FeatureCollection → (topologie → simplification
//! → filtrage → quantification) → sérialisation. Les étapes s'enchaînent
//! strictement; seuls SPARQL et PostGIS sont des appels externes.

use anyhow::Context;
use regions_topology::{
    features, presimplify, quantize, write_geojson, write_topojson, Topology, TopologyBuilder,
};
use tracing::debug;

use crate::assemble::FeatureCollection;
use crate::error::Result;
use crate::identity::SparqlEndpoints;
use crate::params::{OutputFormat, PipelineRequest, Threshold};
use crate::response::{EquivalentArea, RegionResponse};
use crate::store::GeometryFetcher;

/// Nom de l'objet TopoJSON contenant les régions
pub const OBJECT_NAME: &str = "data";

/// Pipeline partagé entre les requêtes (pool et clients HTTP uniquement)
#[derive(Clone)]
pub struct RegionPipeline {
    fetcher: GeometryFetcher,
    endpoints: SparqlEndpoints,
}

impl RegionPipeline {
    pub fn new(fetcher: GeometryFetcher, endpoints: SparqlEndpoints) -> Self {
        Self { fetcher, endpoints }
    }

    /// Exécute une requête validée
    ///
    /// Toute erreur interrompt le pipeline: aucune réponse partielle.
    pub async fn run(&self, request: &PipelineRequest) -> Result<RegionResponse> {
        let resolved = request.identity.resolve(&self.endpoints).await?;
        let records = self.fetcher.fetch(&resolved.ids).await?;
        let collection = FeatureCollection::assemble(records, &resolved.properties);
        if collection.is_empty() {
            debug!(ids = resolved.ids.len(), "No geometry found");
        } else {
            debug!(
                ids = resolved.ids.len(),
                regions = collection.len(),
                "Regions assembled"
            );
        }

        // Calcul géométrique hors des threads de l'exécuteur
        let request = request.clone();
        tokio::task::spawn_blocking(move || render(&request, collection))
            .await
            .context("Geometry task failed")?
    }
}

/// Étapes purement en mémoire, à partir de la FeatureCollection
pub fn render(request: &PipelineRequest, collection: FeatureCollection) -> Result<RegionResponse> {
    let original = collection.to_geojson_string()?;
    let original_size = original.len();
    let regions = collection.len();

    if !request.needs_topology() {
        return Ok(RegionResponse {
            format: request.format,
            body: original.into_bytes(),
            equivalent_area: None,
            original_size,
            regions,
        });
    }

    let topology = TopologyBuilder::new().build(OBJECT_NAME, collection.to_topology_input()?)?;
    let (topology, equivalent_area) = simplify(request, topology)?;
    let topology = match request.quantization_factor() {
        Some(n) => quantize(topology, n)?,
        None => topology,
    };

    let mut body = Vec::with_capacity(original_size);
    match request.format {
        OutputFormat::GeoJson => write_geojson(&mut body, &features(&topology, OBJECT_NAME)?)?,
        OutputFormat::TopoJson => write_topojson(&mut body, &topology)?,
    }

    Ok(RegionResponse {
        format: request.format,
        body,
        equivalent_area,
        original_size,
        regions,
    })
}

/// Simplification puis filtrage des anneaux, si demandés
fn simplify(
    request: &PipelineRequest,
    topology: Topology,
) -> Result<(Topology, Option<EquivalentArea>)> {
    let Some(simplification) = request.simplification else {
        return Ok((topology, None));
    };
    let system = simplification.system;
    let presimplified = presimplify(topology, system);

    let (threshold, equivalent_area) = match simplification.threshold {
        Threshold::Absolute(value) => (value, None),
        Threshold::Quantile(q) => {
            let value = presimplified.quantile(q);
            (value, Some(EquivalentArea { system, value }))
        }
    };
    debug!(
        command = simplification.command(),
        requested = simplification.threshold.value(),
        threshold,
        "Simplification threshold"
    );

    let topology = presimplified.simplify(threshold);
    let topology = request.filter.apply(topology, threshold, system)?;
    Ok((topology, equivalent_area))
}
