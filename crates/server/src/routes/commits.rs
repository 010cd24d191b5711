use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    commit_cache::{CommitCache, CommitInfo},
    project::Project,
};
use serde::Deserialize;
use services::services::commit_links::{self, CommitRelations};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct BranchQuery {
    pub branch: Option<String>,
}

async fn load_project(state: &AppState, project_id: Uuid) -> Result<Project, ApiError> {
    Project::find_by_id(&state.db().conn, project_id)
        .await?
        .ok_or(ApiError::NotFound("Project not found".to_string()))
}

fn repo_full_name_for(project: &Project) -> Result<String, ApiError> {
    project
        .repo_url
        .as_deref()
        .and_then(commit_links::parse_repo_full_name)
        .ok_or(ApiError::BadRequest(
            "Project has no usable repository URL".to_string(),
        ))
}

async fn branch_or_default(state: &AppState, query: BranchQuery) -> String {
    match query.branch {
        Some(branch) if !branch.trim().is_empty() => branch,
        _ => state.config().read().await.github.default_branch.clone(),
    }
}

/// Cache read. `data: null` means expired or never fetched; the caller is
/// expected to fetch from its provider and PUT the list back.
pub async fn get_cached_commits(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<BranchQuery>,
) -> Result<ResponseJson<ApiResponse<Option<Vec<CommitInfo>>>>, ApiError> {
    let project = load_project(&state, project_id).await?;
    let repo_full_name = repo_full_name_for(&project)?;
    let branch = branch_or_default(&state, query).await;

    let commits = CommitCache::find_fresh(&state.db().conn, &repo_full_name, &branch).await?;
    Ok(ResponseJson(ApiResponse::success(commits)))
}

pub async fn put_cached_commits(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<BranchQuery>,
    Json(commits): Json<Vec<CommitInfo>>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let project = load_project(&state, project_id).await?;
    let repo_full_name = repo_full_name_for(&project)?;
    let branch = branch_or_default(&state, query).await;

    CommitCache::save(&state.db().conn, &repo_full_name, &branch, &commits).await?;
    tracing::debug!(
        repo = %repo_full_name,
        branch = %branch,
        count = commits.len(),
        "cached commit list replaced"
    );
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Resolves task and version relations for a caller-supplied commit list.
/// A project without a parseable repository URL yields empty maps.
pub async fn resolve_commit_relations(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(commits): Json<Vec<CommitInfo>>,
) -> Result<ResponseJson<ApiResponse<CommitRelations>>, ApiError> {
    let project = load_project(&state, project_id).await?;
    let relations = commit_links::resolve_relations_for_project(
        &state.db().conn,
        project_id,
        project.repo_url.as_deref(),
        &commits,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(relations)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{id}/commits",
            get(get_cached_commits).put(put_cached_commits),
        )
        .route(
            "/projects/{id}/commits/relations",
            post(resolve_commit_relations),
        )
}
