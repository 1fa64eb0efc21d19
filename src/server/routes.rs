//! HTTP API routes
//!
//! Defines all REST API endpoints for the server.

use crate::config::CorsConfig;
use crate::entropy::run_all_tests;
use crate::error::Error;
use crate::issuance::Issuance;
use crate::qrng::{available_sources, SourceInfo};
use crate::server::state::AppState;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Bits sampled for the status endpoint's entropy check
const STATUS_SAMPLE_BITS: usize = 8192;

const MSG_EMAIL_REQUIRED: &str = "Email is required";
const MSG_BAD_BODY: &str = "Request body must be a JSON object";
const MSG_DB_FAILED: &str = "Database connection failed.";
const MSG_INTERNAL: &str = "An internal error occurred.";
const MSG_EXISTS: &str = "An API key for this email already exists.";
const MSG_SEND_FAILED: &str = "API key generated successfully but failed to send email.";

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/api/generate-key", post(generate_key_handler))
        .route("/api/status", get(status_handler))
        .route("/api/sources", get(sources_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for the frontend
///
/// Credentials are allowed, so "any origin" is served by echoing the
/// request's Origin rather than a literal `*`.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allows_any() {
        AllowOrigin::mirror_request()
    } else {
        match HeaderValue::from_str(config.allowed_origin.trim()) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!(
                    origin = %config.allowed_origin,
                    "Invalid CORS origin, cross-origin requests disabled"
                );
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Key issuance request body
#[derive(Debug, Deserialize)]
pub struct GenerateKeyRequest {
    /// Recipient and owner of the key
    pub email: Option<String>,
    /// Provenance tag
    pub creator: Option<String>,
}

/// Key issuance response body
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateKeyResponse {
    pub message: String,
    /// Only present when the key could not be emailed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::DatabaseUnavailable(detail) => {
                error!("Could not connect to database: {}", detail);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, MSG_DB_FAILED)
            }
            other => {
                error!("An error occurred: {}", other);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
            }
        }
    }
}

/// Issue an API key
///
/// POST /api/generate-key
async fn generate_key_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<GenerateKeyResponse>), ApiError> {
    // Parsed regardless of Content-Type
    let req: GenerateKeyRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected issuance body: {}", e);
        ApiError::new(StatusCode::BAD_REQUEST, MSG_BAD_BODY)
    })?;

    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, MSG_EMAIL_REQUIRED))?;

    let creator = req
        .creator
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.config.keys.default_creator.clone());

    let (status, response) = match state.issuer.issue_key(email, &creator).await? {
        Issuance::Existing => (
            StatusCode::OK,
            GenerateKeyResponse {
                message: MSG_EXISTS.to_string(),
                api_key: None,
            },
        ),
        Issuance::Issued { .. } => (
            StatusCode::CREATED,
            GenerateKeyResponse {
                message: format!("API key successfully generated and sent to {}.", email),
                api_key: None,
            },
        ),
        Issuance::IssuedWithoutNotification { api_key } => (
            StatusCode::CREATED,
            GenerateKeyResponse {
                message: MSG_SEND_FAILED.to_string(),
                api_key: Some(api_key),
            },
        ),
    };

    Ok((status, Json(response)))
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server is running
    pub running: bool,
    /// Server version
    pub version: String,
    /// Random source keys are drawn from
    pub source: String,
    /// Key length in hex characters
    pub key_length: usize,
    /// Key store backend
    pub store: String,
    /// Stored keys, if the store is reachable
    pub keys_issued: Option<u64>,
    /// Entropy quality of a fresh sample, if the source answered
    pub entropy_quality: Option<EntropyStatus>,
}

/// Entropy quality status
#[derive(Debug, Serialize, Deserialize)]
pub struct EntropyStatus {
    pub balanced: f64,
    pub uniform: f64,
    pub scattered: f64,
    pub overall: f64,
    pub passed: bool,
}

/// Server status endpoint
///
/// GET /api/status
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let source = state.source().clone();
    let sample = tokio::task::spawn_blocking(move || source.bits(STATUS_SAMPLE_BITS)).await;

    let entropy_quality = match sample {
        Ok(Ok(bits)) => {
            let results = run_all_tests(&bits);
            Some(EntropyStatus {
                balanced: results.balanced,
                uniform: results.uniform,
                scattered: results.scattered,
                overall: results.overall,
                passed: results.all_passed(),
            })
        }
        Ok(Err(e)) => {
            warn!("Entropy sample failed: {}", e);
            None
        }
        Err(e) => {
            warn!("Entropy sample task failed: {}", e);
            None
        }
    };

    let keys_issued = match state.store().count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!("Could not count stored keys: {}", e);
            None
        }
    };

    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        source: state.source().name().to_string(),
        key_length: state.config.keys.length,
        store: state.store().name().to_string(),
        keys_issued,
        entropy_quality,
    })
}

/// Sources list response
#[derive(Debug, Serialize, Deserialize)]
pub struct SourcesResponse {
    pub sources: Vec<SourceInfo>,
    pub current: String,
}

/// List available random sources
///
/// GET /api/sources
async fn sources_handler(State(state): State<Arc<AppState>>) -> Json<SourcesResponse> {
    Json(SourcesResponse {
        sources: available_sources(),
        current: state.source().name().to_string(),
    })
}
