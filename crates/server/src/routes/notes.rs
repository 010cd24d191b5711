use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::note::{CreateNote, Note, UpdateNote};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub async fn get_notes(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Note>>>, ApiError> {
    let notes = Note::find_all(&state.db().conn).await?;
    Ok(ResponseJson(ApiResponse::success(notes)))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Note>>, ApiError> {
    let note = Note::find_by_id(&state.db().conn, note_id)
        .await?
        .ok_or(ApiError::NotFound("Note not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(note)))
}

pub async fn create_note(
    State(state): State<AppState>,
    Json(payload): Json<CreateNote>,
) -> Result<ResponseJson<ApiResponse<Note>>, ApiError> {
    let note = Note::create(&state.db().conn, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(note)))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Json(payload): Json<UpdateNote>,
) -> Result<ResponseJson<ApiResponse<Note>>, ApiError> {
    let note = Note::update(&state.db().conn, note_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(note)))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Note::delete(&state.db().conn, note_id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Note not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    let notes_router = Router::new()
        .route("/", get(get_notes).post(create_note))
        .route(
            "/{id}",
            get(get_note).put(update_note).delete(delete_note),
        );

    Router::new().nest("/notes", notes_router)
}
