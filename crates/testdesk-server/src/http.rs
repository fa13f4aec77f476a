//! JSON API routes.
//!
//! | Route | Method | Body / query |
//! |---|---|---|
//! | `/api/files` | GET | `?path=` |
//! | `/api/search` | GET | `?q=` or `?query=` |
//! | `/api/read` | GET | `?path=` |
//! | `/api/save` | POST | `{path, content}` |
//! | `/api/unlock` | POST | `{path}` |
//! | `/api/run-test` | POST | `{target, testId?}` |
//! | `/api/stop-test` | POST | `{testId}` |
//! | `/api/open-external` | POST | `{path}` |
//! | `/api/runs` | GET | |

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use testdesk_kernel::{
    DirectoryEntry, ExecutionRegistry, FileRecord, KernelConfig, RunReport, VfsError, VfsResult,
    Workspace,
};
use tokio::fs;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::ApiError;
use crate::external::ExternalOpener;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<Workspace>,
    pub registry: Arc<ExecutionRegistry>,
    pub opener: Arc<dyn ExternalOpener>,
}

impl AppState {
    /// Open the configured workspace and build a registry over it.
    pub fn new(config: &KernelConfig, opener: Arc<dyn ExternalOpener>) -> VfsResult<Self> {
        let workspace = Arc::new(Workspace::from_config(&config.workspace)?);
        let registry = Arc::new(ExecutionRegistry::new(
            workspace.clone(),
            config.runner.clone(),
        ));
        Ok(Self {
            workspace,
            registry,
            opener,
        })
    }
}

/// Build the API router with permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/files", get(list_files))
        .route("/api/search", get(search))
        .route("/api/read", get(read_file))
        .route("/api/save", post(save_file))
        .route("/api/unlock", post(unlock_file))
        .route("/api/run-test", post(run_test))
        .route("/api/stop-test", post(stop_test))
        .route("/api/open-external", post(open_external))
        .route("/api/runs", get(active_runs))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `Query` whose rejection is an [`ApiError`], so it renders as JSON.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
struct ApiQuery<T>(T);

/// `Json` whose rejection is an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct ApiJson<T>(T);

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PathParam {
    path: String,
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest {
    target: String,
    test_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopRequest {
    test_id: String,
}

async fn list_files(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Json<Vec<DirectoryEntry>> {
    Json(state.workspace.list(&query.path).await)
}

async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Json<Vec<DirectoryEntry>> {
    let needle = query.q.or(query.query).unwrap_or_default();
    Json(state.workspace.search(&needle).await)
}

async fn read_file(
    State(state): State<AppState>,
    ApiQuery(param): ApiQuery<PathParam>,
) -> ApiResult<FileRecord> {
    Ok(Json(state.workspace.read(&param.path).await?))
}

async fn save_file(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SaveRequest>,
) -> ApiResult<Value> {
    state.workspace.write(&req.path, &req.content).await?;
    info!(path = %req.path, bytes = req.content.len(), "file saved");
    Ok(Json(json!({ "status": "success" })))
}

async fn unlock_file(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PathParam>,
) -> ApiResult<Value> {
    state.workspace.clear_lock(&req.path).await?;
    info!(path = %req.path, "file unlocked");
    Ok(Json(json!({ "status": "unlocked" })))
}

/// Blocks until the run finishes. If the client goes away first the
/// handler future is dropped, which kills the run's process group.
async fn run_test(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RunRequest>,
) -> ApiResult<RunReport> {
    let report = state
        .registry
        .start(&req.target, req.test_id.as_deref())
        .await?;
    Ok(Json(report))
}

async fn stop_test(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StopRequest>,
) -> ApiResult<Value> {
    let message = state.registry.stop(&req.test_id)?;
    Ok(Json(json!({ "status": "stopped", "message": message })))
}

async fn open_external(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PathParam>,
) -> ApiResult<Value> {
    let full = state.workspace.resolve(&req.path)?;
    if fs::metadata(&full).await.is_err() {
        return Err(VfsError::not_found(&req.path).into());
    }

    state
        .opener
        .open(&full)
        .await
        .map_err(|source| ApiError::Open {
            path: req.path.clone(),
            source,
        })?;
    info!(path = %req.path, "opened externally");
    Ok(Json(json!({ "status": "opened" })))
}

async fn active_runs(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "active": state.registry.active() }))
}
