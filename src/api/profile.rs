//! User profile endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use super::routes::{store_error, AppState};
use crate::store::{ProfileUpdate, UserProfile};

/// Routes mounted under `/api/user-profile`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_profile).put(update_profile))
        .route("/avatar/:filename", get(get_avatar))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserProfile>, (StatusCode, String)> {
    state.profile.get().await.map(Json).map_err(store_error)
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, (StatusCode, String)> {
    let profile = state.profile.update(update).await.map_err(store_error)?;
    tracing::info!("Updated user profile for {}", profile.name);
    Ok(Json(profile))
}

/// GET /api/user-profile/avatar/:filename - Serve a stored avatar image.
async fn get_avatar(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let path = state.profile.avatar_path(&filename).map_err(store_error)?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        tracing::warn!("Failed to read avatar {}: {}", path.display(), e);
        (StatusCode::NOT_FOUND, format!("Avatar {} not found", filename))
    })?;
    Ok(([(header::CONTENT_TYPE, content_type(&filename))], bytes))
}

fn content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}
