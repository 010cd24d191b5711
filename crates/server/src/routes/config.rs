use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use services::services::config::{Config, save_config_to_file};
use utils::{assets::config_path, response::ApiResponse};

use crate::{AppState, error::ApiError};

pub async fn get_config(
    State(state): State<AppState>,
) -> ResponseJson<ApiResponse<Config>> {
    let config = state.config().read().await;
    let mut redacted_config = config.clone();
    redacted_config.github.token = None;
    ResponseJson(ApiResponse::success(redacted_config))
}

pub async fn update_config(
    State(state): State<AppState>,
    Json(new_config): Json<Config>,
) -> Result<ResponseJson<ApiResponse<Config>>, ApiError> {
    let new_config = new_config.normalized();

    save_config_to_file(&new_config, &config_path()).await?;

    let mut config = state.config().write().await;
    *config = new_config.clone();

    let mut redacted_config = new_config;
    redacted_config.github.token = None;
    Ok(ResponseJson(ApiResponse::success(redacted_config)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/config", get(get_config).put(update_config))
}
