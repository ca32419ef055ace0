//! HTTP server.
//!
//! Serves the browser form, runs analyses, and exports the stored history.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Form plus the most recent analyses |
//! | `POST` | `/analyze` | Analyze the form field `text` and store the result |
//! | `GET`  | `/export` | All analyses as a JSON array |
//! | `GET`  | `/analyses/{id}` | One analysis as JSON |
//! | `GET`  | `/health` | Health check (returns version and model) |
//!
//! `POST /analyze` answers with the rendered page by default. Clients that
//! send `Accept: application/json` get a JSON body instead.
//!
//! # Error Contract
//!
//! JSON error responses use the shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "text must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `model_error` (502),
//! `internal` (500).

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::analyze::analyze_and_store;
use crate::analyzer::{AnalyzeError, Analyzer, OllamaAnalyzer};
use crate::config::Config;
use crate::models::Analysis;
use crate::render::{index_page, Flash};
use crate::{db, export, migrate, store};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    analyzer: Arc<dyn Analyzer>,
}

/// Starts the HTTP server with the Ollama analyzer from `[ollama]`.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let analyzer = OllamaAnalyzer::new(&config.ollama)?;
    run_server_with_analyzer(config, Arc::new(analyzer)).await
}

/// Starts the HTTP server with a caller-supplied [`Analyzer`].
pub async fn run_server_with_analyzer(
    config: &Config,
    analyzer: Arc<dyn Analyzer>,
) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;

    let bind_addr = config.server.bind.clone();
    let model = analyzer.model_name().to_string();
    let app = build_router(AppState {
        config: Arc::new(config.clone()),
        pool,
        analyzer,
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, model = %model, "insight server listening");
    println!("Insight listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with all routes and middleware.
fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/analyze", post(handle_analyze))
        .route("/export", get(handle_export))
        .route("/analyses/{id}", get(handle_get_analysis))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %err, "request failed");
        internal(err.to_string())
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn model_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "model_error".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map an analysis failure to the HTTP status that best describes it.
fn classify_analyze_error(err: AnalyzeError) -> AppError {
    if err.is_input_error() {
        bad_request(err.to_string())
    } else if err.is_model_error() {
        model_error(err.to_string())
    } else {
        error!(error = %err, "analysis could not be stored");
        internal(err.to_string())
    }
}

/// True when the client asked for JSON rather than a page.
fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json") && !accept.contains("text/html"))
        .unwrap_or(false)
}

// ============ GET / ============

async fn handle_index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let entries = store::recent_analyses(&state.pool, state.config.analysis.history_limit).await?;
    Ok(Html(index_page(&entries, Flash::Empty, "")))
}

// ============ POST /analyze ============

#[derive(Deserialize)]
struct AnalyzeForm {
    #[serde(default)]
    text: String,
}

/// JSON body returned by `POST /analyze` to JSON clients.
#[derive(Serialize)]
struct AnalyzeResponse {
    id: i64,
    summary: Option<String>,
    persons: Option<String>,
    category: Option<String>,
}

impl From<Analysis> for AnalyzeResponse {
    fn from(a: Analysis) -> Self {
        Self {
            id: a.id,
            summary: a.summary,
            persons: a.persons,
            category: a.category,
        }
    }
}

async fn handle_analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AnalyzeForm>,
) -> Result<Response, AppError> {
    let json = wants_json(&headers);
    let result = analyze_and_store(
        &state.pool,
        state.analyzer.as_ref(),
        &state.config.analysis,
        &form.text,
    )
    .await;

    match result {
        Ok(stored) if json => Ok(Json(AnalyzeResponse::from(stored)).into_response()),
        Ok(stored) => {
            let entries =
                store::recent_analyses(&state.pool, state.config.analysis.history_limit).await?;
            Ok(Html(index_page(&entries, Flash::Stored(&stored), "")).into_response())
        }
        Err(e) => {
            let err = classify_analyze_error(e);
            if json {
                return Ok(err.into_response());
            }
            let entries =
                store::recent_analyses(&state.pool, state.config.analysis.history_limit).await?;
            let page = index_page(&entries, Flash::Error(&err.message), &form.text);
            Ok((err.status, Html(page)).into_response())
        }
    }
}

// ============ GET /export ============

async fn handle_export(State(state): State<AppState>) -> Result<Response, AppError> {
    let rows = export::export_rows(&state.pool).await?;
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"analyses.json\"",
        )],
        Json(rows),
    )
        .into_response())
}

// ============ GET /analyses/{id} ============

async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Analysis>, AppError> {
    store::get_analysis(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("analysis not found: {}", id)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    model: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.analyzer.model_name().to_string(),
    })
}
