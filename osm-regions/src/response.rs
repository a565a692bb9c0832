//! Réponse sérialisée du pipeline

use regions_topology::WeightSystem;

use crate::params::OutputFormat;

/// En-tête de cache: résultats déterministes à paramètres égaux
pub const CACHE_CONTROL: &str = "public, max-age=43200";

/// Seuil absolu équivalent au quantile demandé
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquivalentArea {
    pub system: WeightSystem,
    pub value: f64,
}

impl EquivalentArea {
    /// `X-Equivalent-sphericalArea` ou `X-Equivalent-planarArea`
    pub fn header_name(&self) -> String {
        format!("X-Equivalent-{}Area", self.system.name())
    }

    /// Valeur relue à l'identique par `sphericalArea=`
    pub fn header_value(&self) -> String {
        self.value.to_string()
    }
}

/// Corps de réponse et métadonnées
#[derive(Debug, Clone, PartialEq)]
pub struct RegionResponse {
    pub format: OutputFormat,
    pub body: Vec<u8>,
    /// Présent uniquement en mode quantile
    pub equivalent_area: Option<EquivalentArea>,
    /// Taille de la FeatureCollection avant topologie
    pub original_size: usize,
    /// Nombre de régions renvoyées par le stockage
    pub regions: usize,
}

impl RegionResponse {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}
