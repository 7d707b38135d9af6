//! API handlers for the compliance server
//!
//! Provides REST endpoints for:
//! - Clause analysis (JSON text or raw upload)
//! - Clause suggestions
//! - Catalog listing

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{AnalysisResult, SuggestionSource};
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::AppState;

/// Build the API router (middleware is layered on by the caller)
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // API endpoints
        .route("/api/clauses", get(handle_list_clauses))
        .route("/api/analyze", post(handle_analyze))
        .route("/api/upload", post(handle_upload))
        .route("/api/suggest", get(handle_suggest))
        .with_state(state)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "compliance-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Clause catalog response
#[derive(Serialize)]
pub struct ClauseListResponse {
    pub success: bool,
    pub clauses: Vec<ClauseInfo>,
    pub count: usize,
}

/// Clause metadata
#[derive(Serialize)]
pub struct ClauseInfo {
    pub name: String,
    pub keywords: Vec<String>,
    pub severity: u8,
    pub has_template: bool,
}

/// Handler: GET /api/clauses
pub async fn handle_list_clauses(State(state): State<AppState>) -> Json<ClauseListResponse> {
    let clauses: Vec<ClauseInfo> = state
        .engine
        .catalog()
        .iter()
        .map(|c| ClauseInfo {
            name: c.name().to_string(),
            keywords: c.keywords().map(String::from).collect(),
            severity: c.severity(),
            has_template: c.template().is_some(),
        })
        .collect();

    let count = clauses.len();

    Json(ClauseListResponse {
        success: true,
        clauses,
        count,
    })
}

/// Analysis request body
#[derive(Deserialize)]
pub struct AnalyzeRequest {
    /// Extracted document text; anything other than a string is analyzed
    /// as empty
    #[serde(default)]
    pub text: Option<Value>,
}

impl AnalyzeRequest {
    pub fn text(&self) -> Option<&str> {
        self.text.as_ref().and_then(Value::as_str)
    }
}

/// Handler: POST /api/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Json<AnalysisResult> {
    debug!("Analyze request: {} bytes", req.text().map_or(0, str::len));

    Json(state.engine.analyze_optional(req.text()))
}

/// Upload query parameters
#[derive(Deserialize)]
pub struct UploadParams {
    #[serde(default = "default_filename")]
    pub filename: String,
}

fn default_filename() -> String {
    "uploaded.txt".to_string()
}

/// Handler: POST /api/upload
///
/// The body is the document itself, decoded as UTF-8 with invalid
/// sequences replaced.
pub async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Json<AnalysisResult> {
    info!("Upload: filename={}, size={}", params.filename, body.len());

    let analysis = state.engine.analyze_bytes(&body);

    if analysis.high_risk {
        warn!(
            filename = %params.filename,
            risk_score = analysis.risk_score,
            missing = analysis.missing_clauses.len(),
            "High risk document"
        );
    }

    Json(analysis)
}

/// Suggestion query parameters
#[derive(Deserialize)]
pub struct SuggestParams {
    pub clause: String,
    pub context: Option<String>,
}

/// Suggestion response
#[derive(Serialize)]
pub struct SuggestResponse {
    pub clause: String,
    pub suggestion: String,
    pub source: SuggestionSource,
    pub cached: bool,
}

/// Handler: GET /api/suggest
pub async fn handle_suggest(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestResponse>, ServerError> {
    let clause = params.clause.trim();
    if clause.is_empty() {
        return Err(ServerError::InvalidRequest(
            "Query parameter 'clause' must not be blank".to_string(),
        ));
    }

    info!("Suggest request: clause={}", clause);

    let context = params.context.as_deref().filter(|c| !c.is_empty());
    let suggestion = state.suggestions.provide(clause, context).await;

    Ok(Json(SuggestResponse {
        clause: suggestion.clause,
        suggestion: suggestion.text,
        source: suggestion.source,
        cached: suggestion.cached,
    }))
}
