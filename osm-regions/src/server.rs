//! Transport HTTP: `GET /regions/{format}`

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, options};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::RegionsError;
use crate::params;
use crate::pipeline::RegionPipeline;
use crate::response::{RegionResponse, CACHE_CONTROL};

/// Corps renvoyé pour toute erreur non liée aux paramètres
const GENERIC_ERROR: &str = "Internal server error";

/// Construit le routeur HTTP
pub fn router(pipeline: Arc<RegionPipeline>) -> Router {
    Router::new()
        .route("/regions/{format}", get(regions).options(preflight))
        .route("/{*path}", options(preflight))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

/// Écoute sur `addr` jusqu'à l'arrêt du processus
pub async fn serve(addr: SocketAddr, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Server is listening");
    axum::serve(listener, router).await.context("Server error")
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn regions(
    State(pipeline): State<Arc<RegionPipeline>>,
    Path(format): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let result = match params::resolve(&format, &query) {
        Ok(request) => pipeline.run(&request).await.map(|response| (request, response)),
        Err(e) => Err(e),
    };

    match result {
        Ok((request, response)) => {
            let client_ip = headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            info!(
                format = request.format.name(),
                simplify = request.simplification.map_or("noSimpl", |s| s.command()),
                value = request.simplification.map_or(0.0, |s| s.threshold.value()),
                filter = request.filter.name(),
                equivalent = ?response.equivalent_area.map(|a| a.value),
                quantize = request.quantization_factor().unwrap_or(0),
                regions = response.regions,
                size_before = response.original_size,
                size_after = response.body.len(),
                ip = client_ip,
                sparql = request.identity.sparql_text().unwrap_or_default(),
                "Regions served"
            );
            success(response)
        }
        Err(e) => failure(e, &format, &query),
    }
}

fn success(response: RegionResponse) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, response.content_type())
        .header(header::CACHE_CONTROL, CACHE_CONTROL);
    if let Some(area) = response.equivalent_area {
        builder = builder.header(area.header_name(), area.header_value());
    }
    match builder.body(Body::from(response.body)) {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Failed to build response");
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR).into_response()
        }
    }
}

fn failure(e: RegionsError, format: &str, query: &HashMap<String, String>) -> Response {
    match e {
        RegionsError::InvalidRequest(message) => {
            warn!(format, params = ?query, "{}", message);
            (StatusCode::BAD_REQUEST, message).into_response()
        }
        other => {
            error!(format, params = ?query, error = ?other, "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR).into_response()
        }
    }
}
