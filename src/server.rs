//! HTTP front-end.
//!
//! ```text
//! POST /query          {"sql": "..."}
//! POST /query/batch    {"queries": ["...", ...]}
//! GET  /grammar[?table=t]
//! GET  /capabilities
//! GET  /config
//! GET  /health
//! ```

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::capability::Capability;
use crate::catalog::{Catalog, QueryFailure};
use crate::config::{Config, CorsConfig};
use crate::error::{QrestError, QrestResult};
use crate::executor::QueryResult;
use crate::grammar::Grammar;

/// Shared state for request handlers.
pub struct AppState {
    pub catalog: Catalog,
    pub config: Config,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub queries: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchQueryResult>,
    pub total: usize,
    pub success: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchQueryResult {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl From<QueryFailure> for ErrorResponse {
    fn from(failure: QueryFailure) -> Self {
        Self {
            error: failure.error.to_string(),
            code: failure.error.category().as_str().to_string(),
            suggestions: failure.suggestions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub apis: usize,
    pub tables: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_apis: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CapabilityEntry<'a> {
    pub api: &'a str,
    #[serde(flatten)]
    pub capability: &'a Capability,
}

#[derive(Debug, Deserialize)]
pub struct GrammarParams {
    pub table: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            code: code.to_string(),
            suggestions: Vec::new(),
        }),
    )
}

/// Create the router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors);

    Router::new()
        .route("/health", get(health_check))
        .route("/query", post(run_query))
        .route("/query/batch", post(run_batch))
        .route("/grammar", get(grammar))
        .route("/capabilities", get(capabilities))
        .route("/config", get(config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let wildcard = |items: &[String]| items.iter().any(|i| i == "*");

    let origins = if wildcard(&cors.allow_origins) {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            cors.allow_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };
    let methods = if wildcard(&cors.allow_methods) {
        AllowMethods::from(Any)
    } else {
        AllowMethods::list(
            cors.allow_methods
                .iter()
                .filter_map(|m| Method::from_bytes(m.to_uppercase().as_bytes()).ok()),
        )
    };
    let headers = if wildcard(&cors.allow_headers) {
        AllowHeaders::from(Any)
    } else {
        AllowHeaders::list(
            cors.allow_headers
                .iter()
                .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        apis: state.catalog.apis().len(),
        tables: state.catalog.table_names().len(),
        failed_apis: state
            .catalog
            .failures()
            .iter()
            .map(|(name, _)| name.clone())
            .collect(),
    })
}

/// Validation and translation failures are 400; a failed API call is a
/// 200 whose body carries `error`.
pub async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    tracing::debug!("Query: {}", request.sql);
    match state.catalog.query(&request.sql).await {
        Ok(result) => Ok(Json(result)),
        Err(failure) => Err((StatusCode::BAD_REQUEST, Json(failure.into()))),
    }
}

/// Statements run in order; one failing does not stop the rest.
pub async fn run_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Json<BatchResponse> {
    let mut results = Vec::with_capacity(request.queries.len());
    for (index, sql) in request.queries.iter().enumerate() {
        let entry = match state.catalog.query(sql).await {
            Ok(result) => BatchQueryResult {
                index,
                success: result.is_ok(),
                result: Some(result),
                error: None,
            },
            Err(failure) => BatchQueryResult {
                index,
                success: false,
                result: None,
                error: Some(failure.into()),
            },
        };
        results.push(entry);
    }

    let success = results.iter().filter(|r| r.success).count();
    Json(BatchResponse {
        total: results.len(),
        success,
        results,
    })
}

pub async fn grammar(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GrammarParams>,
) -> Result<Json<Vec<Grammar>>, ApiError> {
    match params.table {
        Some(table) => match state.catalog.grammar(&table) {
            Some(grammar) => Ok(Json(vec![grammar.clone()])),
            None => Err(api_error(
                StatusCode::NOT_FOUND,
                "validation",
                format!("Table '{}' not found", table),
            )),
        },
        None => Ok(Json(
            state
                .catalog
                .tables()
                .map(|(_, _, grammar)| grammar.clone())
                .collect(),
        )),
    }
}

pub async fn capabilities(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let entries: Vec<CapabilityEntry<'_>> = state
        .catalog
        .tables()
        .map(|(api, capability, _)| CapabilityEntry { api, capability })
        .collect();
    Json(serde_json::to_value(entries).unwrap_or_default())
}

pub async fn config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config.redacted())
}

/// Serve until the process is stopped.
pub async fn serve(config: Config, catalog: Catalog) -> QrestResult<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| QrestError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("qrest listening on {}", addr);
    tracing::info!("   POST /query          - Run a SQL statement");
    tracing::info!("   POST /query/batch    - Run several statements");
    tracing::info!("   GET  /grammar        - Derived grammars");
    tracing::info!("   GET  /capabilities   - Discovered operations");
    tracing::info!("   GET  /health         - Health check");

    serve_on(listener, config, catalog).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, config: Config, catalog: Catalog) -> QrestResult<()> {
    let state = Arc::new(AppState { catalog, config });
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
