//! Types d'erreurs du service

use regions_topology::TopologyError;
use thiserror::Error;

/// Erreurs du pipeline de régions
///
/// Seul `InvalidRequest` expose son message à l'appelant, les autres
/// variantes ne sont détaillées que dans les logs.
#[derive(Debug, Error)]
pub enum RegionsError {
    /// Paramètres invalides ou contradictoires
    #[error("{0}")]
    InvalidRequest(String),

    /// Réponse SPARQL inexploitable
    #[error("SPARQL error: {0}")]
    UpstreamGraph(String),

    /// Échec de la requête PostGIS
    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),

    /// Erreur inattendue
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RegionsError {
    /// Crée une erreur de validation
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Crée une erreur de réponse SPARQL
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamGraph(message.into())
    }

    /// Crée une erreur de stockage
    pub fn store(error: impl Into<anyhow::Error>) -> Self {
        Self::Store(error.into())
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

impl From<TopologyError> for RegionsError {
    fn from(error: TopologyError) -> Self {
        Self::Internal(error.into())
    }
}

impl From<reqwest::Error> for RegionsError {
    fn from(error: reqwest::Error) -> Self {
        Self::UpstreamGraph(error.to_string())
    }
}

impl From<serde_json::Error> for RegionsError {
    fn from(error: serde_json::Error) -> Self {
        Self::Internal(error.into())
    }
}

pub type Result<T> = std::result::Result<T, RegionsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_message_is_verbatim() {
        let err = RegionsError::invalid("Invalid Wikidata ID");
        assert_eq!(err.to_string(), "Invalid Wikidata ID");
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_topology_error_is_internal() {
        let err: RegionsError = TopologyError::AlreadyQuantized.into();
        assert!(matches!(err, RegionsError::Internal(_)));
        assert!(!err.is_invalid_request());
    }
}
