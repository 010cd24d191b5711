use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::project_version::{CreateProjectVersion, ProjectVersion, VersionTask};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct VersionCommitRequest {
    pub commit_sha: String,
    pub repo_full_name: String,
}

pub async fn get_project_versions(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectVersion>>>, ApiError> {
    let versions = ProjectVersion::find_by_project_id(&state.db().conn, project_id).await?;
    Ok(ResponseJson(ApiResponse::success(versions)))
}

pub async fn create_project_version(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateProjectVersion>,
) -> Result<ResponseJson<ApiResponse<ProjectVersion>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Version name cannot be empty".to_string(),
        ));
    }
    tracing::debug!(%project_id, "Creating version '{}'", payload.name);

    let version =
        ProjectVersion::create(&state.db().conn, project_id, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(version)))
}

pub async fn get_version(
    State(state): State<AppState>,
    Path(version_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProjectVersion>>, ApiError> {
    let version = ProjectVersion::find_by_id(&state.db().conn, version_id)
        .await?
        .ok_or(ApiError::NotFound("Version not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(version)))
}

pub async fn get_version_tasks(
    State(state): State<AppState>,
    Path(version_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<VersionTask>>>, ApiError> {
    let tasks = ProjectVersion::find_tasks(&state.db().conn, version_id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn delete_version(
    State(state): State<AppState>,
    Path(version_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = ProjectVersion::delete(&state.db().conn, version_id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Version not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn attach_version_commit(
    State(state): State<AppState>,
    Path(version_id): Path<Uuid>,
    Json(payload): Json<VersionCommitRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<String>>>, ApiError> {
    ProjectVersion::attach_commit(
        &state.db().conn,
        version_id,
        &payload.repo_full_name,
        &payload.commit_sha,
    )
    .await?;
    let shas = ProjectVersion::find_commit_shas(&state.db().conn, version_id).await?;
    Ok(ResponseJson(ApiResponse::success(shas)))
}

pub async fn detach_version_commit(
    State(state): State<AppState>,
    Path(version_id): Path<Uuid>,
    Json(payload): Json<VersionCommitRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<String>>>, ApiError> {
    ProjectVersion::detach_commit(
        &state.db().conn,
        version_id,
        &payload.repo_full_name,
        &payload.commit_sha,
    )
    .await?;
    let shas = ProjectVersion::find_commit_shas(&state.db().conn, version_id).await?;
    Ok(ResponseJson(ApiResponse::success(shas)))
}

pub fn router() -> Router<AppState> {
    let versions_router = Router::new()
        .route("/{id}", get(get_version).delete(delete_version))
        .route("/{id}/tasks", get(get_version_tasks))
        .route(
            "/{id}/commits",
            post(attach_version_commit).delete(detach_version_commit),
        );

    Router::new()
        .route(
            "/projects/{id}/versions",
            get(get_project_versions).post(create_project_version),
        )
        .nest("/versions", versions_router)
}
