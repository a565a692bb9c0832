//! Types d'erreurs pour le crate regions-topology

use thiserror::Error;

/// Erreurs pouvant survenir lors de la construction ou de la transformation d'une topologie
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Géométrie d'entrée inexploitable
    #[error("Invalid geometry for {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },

    /// La topologie porte déjà une transformation
    #[error("Topology is already quantized")]
    AlreadyQuantized,

    /// Facteur de quantification trop petit
    #[error("Invalid quantization factor {0}: must be at least 2")]
    InvalidQuantization(u64),

    /// Objet absent de la topologie
    #[error("Unknown topology object: {0}")]
    UnknownObject(String),

    /// Erreur d'écriture
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur de sérialisation JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Erreur d'écriture GeoJSON d'une géométrie
    #[error("GeoJSON writer error: {0}")]
    Geozero(#[from] geozero::error::GeozeroError),

    /// Référence vers un arc inexistant
    #[error("Arc reference {index} out of bounds ({count} arcs)")]
    ArcOutOfBounds { index: usize, count: usize },
}

impl TopologyError {
    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(feature_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            feature_id: feature_id.into(),
            reason: reason.into(),
        }
    }
}
