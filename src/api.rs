use crate::engine::{SearchEngine, SearchMode, SearchOptions};
use crate::index::IndexStats;
use crate::ranking::ScoredDocument;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// ========== Request/Response Types ==========

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub mode: Option<String>, // "full", "or" or "and"
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExpandRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub tokens: Vec<String>,
    pub documents: Vec<ScoredDocument>,
    pub total_documents: usize,
    pub matched_documents: usize,
    pub has_results: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

// ========== Error Handling ==========

struct AppError(StatusCode, anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = format!("{:#}", self.1);
        tracing::error!("API error: {}", message);

        (self.0, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

// ========== Handlers ==========

async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success("OK"))
}

async fn search_documents(
    State(engine): State<Arc<SearchEngine>>,
    Query(req): Query<SearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mode = match req.mode.as_deref() {
        Some(mode) => mode
            .parse::<SearchMode>()
            .map_err(|e| AppError(StatusCode::BAD_REQUEST, e))?,
        None => SearchMode::Full,
    };

    let options = SearchOptions {
        mode,
        limit: req.limit.or(Some(10)),
    };

    let result = engine.search(&req.query, &options);
    let has_results = result.has_results();

    let response = SearchResponse {
        query: req.query,
        tokens: result.tokens,
        documents: result.documents,
        total_documents: result.total_documents,
        matched_documents: result.matched_documents,
        has_results,
    };

    Ok(Json(ApiResponse::success(response)))
}

async fn expand_query(
    State(engine): State<Arc<SearchEngine>>,
    Query(req): Query<ExpandRequest>,
) -> impl IntoResponse {
    Json(ApiResponse::success(engine.expand_query(&req.query)))
}

async fn get_stats(State(engine): State<Arc<SearchEngine>>) -> Json<ApiResponse<IndexStats>> {
    Json(ApiResponse::success(engine.stats()))
}

// ========== Router ==========

pub fn create_router(engine: Arc<SearchEngine>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/search", get(search_documents))
        .route("/expand", get(expand_query))
        .route("/stats", get(get_stats))
        .with_state(engine)
}

/// Router wrapped in the request tracing and permissive CORS layers
pub fn create_app(engine: Arc<SearchEngine>) -> Router {
    create_router(engine).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}
