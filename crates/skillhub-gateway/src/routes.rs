//! HTTP routes over the skills catalog

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use skillhub_catalog::{Catalog, CatalogError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::{archive, markdown};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
}

/// Build the gateway router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/skills", get(list_skills))
        .route("/api/v1/skills/{name}", get(get_skill))
        .route("/api/v1/download/{name}", get(download_skill))
        .route("/skill.md", get(guide_md))
        .route("/skill/{file}", get(skill_md))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JSON error response for catalog failures
struct ApiError(CatalogError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            CatalogError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Skill not found" })),
            )
                .into_response(),
            e => {
                error!("Catalog request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to read skill" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        Self(e)
    }
}

#[derive(Debug, Deserialize, Default)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "skills": state.catalog.snapshot().await.len(),
        "generation": state.catalog.generation().await,
    }))
}

/// `GET /api/v1/skills?q=<query>`
async fn list_skills(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let skills = state.catalog.search(&query.q).await;
    Json(json!({ "skills": skills }))
}

/// `GET /api/v1/skills/{name}`
async fn get_skill(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let detail = state.catalog.get_by_name(&name).await?;
    Ok(Json(detail).into_response())
}

/// `GET /api/v1/download/{name}`
///
/// Responds with an `application/gzip` tarball named `<bundle dir>.tar.gz`,
/// not a zip named after the requested skill. Clients expecting
/// `<name>.zip` must switch to the tarball.
async fn download_skill(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let dir = state.catalog.get_path(&name).await?;
    let file_name = archive::archive_file_name(&dir);

    let built = tokio::task::spawn_blocking(move || archive::bundle_tarball(&dir)).await;
    let bytes = match built {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            error!("Failed to archive skill '{}': {:#}", name, e);
            return Ok(internal_error("Failed to build archive"));
        }
        Err(e) => {
            error!("Archive task for '{}' failed: {}", name, e);
            return Ok(internal_error("Failed to build archive"));
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// `GET /skill.md`
async fn guide_md(State(state): State<AppState>) -> impl IntoResponse {
    let skills = state.catalog.search("").await;
    markdown_response(StatusCode::OK, markdown::guide(&skills))
}

/// `GET /skill/{name}.md`
async fn skill_md(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    let Some(name) = file.strip_suffix(".md") else {
        return not_found().await.into_response();
    };

    match state.catalog.get_by_name(name).await {
        Ok(detail) => markdown_response(StatusCode::OK, markdown::skill_document(&detail)),
        Err(CatalogError::NotFound { .. }) => {
            markdown_response(StatusCode::NOT_FOUND, "Skill not found".to_string())
        }
        Err(e) => {
            error!("Failed to read skill '{}': {}", name, e);
            markdown_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read skill".to_string(),
            )
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}

fn markdown_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        body,
    )
        .into_response()
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}
