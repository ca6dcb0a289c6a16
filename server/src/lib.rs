use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use searchbox_core::{Fragment, ReindexOutcome, SearchEngine, Stats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHitView>,
}

#[derive(Serialize)]
pub struct SearchHitView {
    pub path: String,
    pub title: String,
    pub score: f64,
    pub mtime: u64,
    pub fragments: Vec<Fragment>,
    /// Escaped HTML with `<mark>` highlights, ready for the UI.
    pub snippet: String,
}

#[derive(Deserialize)]
pub struct RawParams {
    pub path: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub admin_token: Option<String>,
}

pub fn build_app(engine: Arc<SearchEngine>) -> Router {
    let admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());
    build_app_with_token(engine, admin_token)
}

pub fn build_app_with_token(engine: Arc<SearchEngine>, admin_token: Option<String>) -> Router {
    let app_state = AppState { engine, admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .route("/reindex", post(reindex_handler))
        .route("/raw", get(raw_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let query = params.q.trim().to_string();
    let limit = state.engine.config().clamp_limit(params.limit);
    let results = state.engine.search(&query, limit);

    let hits = results
        .hits
        .into_iter()
        .map(|hit| SearchHitView {
            snippet: hit.snippet.to_html(),
            fragments: hit.snippet.fragments,
            path: hit.path,
            title: hit.title,
            score: hit.score,
            mtime: hit.mtime,
        })
        .collect();

    let elapsed = start.elapsed();
    Json(SearchResponse {
        query,
        took_ms: elapsed.as_millis(),
        took_s: elapsed.as_secs_f64(),
        total_hits: results.total_hits,
        results: hits,
    })
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<Stats> {
    Json(state.engine.stats())
}

pub async fn reindex_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReindexOutcome>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let outcome = run_reindex(state.engine.clone())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(outcome))
}

pub async fn raw_handler(State(state): State<AppState>, Query(params): Query<RawParams>) -> Response {
    let rel = params.path.replace('\\', "/");
    let Some(path) = state.engine.document_path(&rel) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let ctype = match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
                Some("html") | Some("htm") => "text/html; charset=utf-8",
                Some("md") => "text/markdown; charset=utf-8",
                _ => "text/plain; charset=utf-8",
            };
            ([(header::CONTENT_TYPE, ctype), (header::CACHE_CONTROL, "no-store")], bytes).into_response()
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "raw file unreadable");
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}

/// Run a reindex cycle on the blocking pool.
pub async fn run_reindex(engine: Arc<SearchEngine>) -> Result<ReindexOutcome, String> {
    match tokio::task::spawn_blocking(move || engine.trigger_reindex()).await {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(err)) => Err(err.to_string()),
        Err(join_err) => Err(format!("reindex task failed: {join_err}")),
    }
}

/// Poll the folder every `interval`. A tick that lands while a cycle is still
/// running is coalesced by the engine.
pub fn spawn_reindex_loop(engine: Arc<SearchEngine>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = run_reindex(engine.clone()).await {
                tracing::error!(error = %err, "periodic reindex failed");
            }
        }
    })
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    // Local use without a token configured is open.
    let Some(required) = &state.admin_token else {
        return Ok(());
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
