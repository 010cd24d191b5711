use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    models::{
        commit_link::TaskCommitLink,
        task::{CreateTask, Task, UpdateTask},
    },
    types::LinkSource,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub project_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CommitLinkRequest {
    pub commit_sha: String,
    pub repo_full_name: String,
}

pub async fn get_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_by_project_id(&state.db().conn, query.project_id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::find_by_id(&state.db().conn, task_id)
        .await?
        .ok_or(ApiError::NotFound("Task not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Task title cannot be empty".to_string(),
        ));
    }
    let task = Task::create(&state.db().conn, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::update(&state.db().conn, task_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Task::delete(&state.db().conn, task_id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_task_commits(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskCommitLink>>>, ApiError> {
    let links = TaskCommitLink::find_by_task(&state.db().conn, task_id).await?;
    Ok(ResponseJson(ApiResponse::success(links)))
}

pub async fn link_task_commit(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<CommitLinkRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskCommitLink>>>, ApiError> {
    TaskCommitLink::link(
        &state.db().conn,
        task_id,
        &payload.repo_full_name,
        &payload.commit_sha,
        LinkSource::Manual,
    )
    .await?;
    let links = TaskCommitLink::find_by_task(&state.db().conn, task_id).await?;
    Ok(ResponseJson(ApiResponse::success(links)))
}

pub async fn unlink_task_commit(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<CommitLinkRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskCommitLink>>>, ApiError> {
    TaskCommitLink::unlink(
        &state.db().conn,
        task_id,
        &payload.repo_full_name,
        &payload.commit_sha,
    )
    .await?;
    let links = TaskCommitLink::find_by_task(&state.db().conn, task_id).await?;
    Ok(ResponseJson(ApiResponse::success(links)))
}

pub fn router() -> Router<AppState> {
    let tasks_router = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .route(
            "/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            "/{id}/commits",
            get(get_task_commits)
                .post(link_task_commit)
                .delete(unlink_task_commit),
        );

    Router::new().nest("/tasks", tasks_router)
}
