//! Tag API endpoints
//!
//! Public vocabulary listing plus admin management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::Tag;

/// Response for a tag
#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

/// Request body for creating a tag
#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: String,
}

/// GET /tags - list all tags alphabetically
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let tags = state
        .tag_repo
        .list_all()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

/// POST /admin/tags - create (or fetch) a tag by name
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<TagRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation_error("Tag name is required"));
    }

    let tag = state
        .tag_repo
        .get_or_create(name)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(tag.into())))
}

/// DELETE /admin/tags/{id} - delete a tag
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .tag_repo
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("Tag not found: {}", id)))?;

    state
        .tag_repo
        .delete(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}
