//! Category API endpoints
//!
//! Public vocabulary listing plus admin CRUD.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Category, CreateCategoryInput};
use crate::services::post::slugify;

/// Response for a category
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            title: category.title,
            slug: category.slug,
        }
    }
}

/// Request body for creating or updating a category
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub title: String,
    #[serde(default)]
    pub slug: String,
}

/// GET /categories - list all categories
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state
        .category_repo
        .list_all()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// POST /admin/categories - create a category
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::validation_error("Category title is required"));
    }

    let slug = if body.slug.trim().is_empty() {
        slugify(&body.title).to_lowercase()
    } else {
        body.slug
    };

    if state
        .category_repo
        .exists_by_slug(&slug)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
    {
        return Err(ApiError::conflict(format!(
            "Category slug already exists: {}",
            slug
        )));
    }

    let category = state
        .category_repo
        .create(&CreateCategoryInput {
            title: body.title,
            slug,
        })
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(category.into())))
}

/// PUT /admin/categories/{id} - update a category
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let existing = state
        .category_repo
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("Category not found: {}", id)))?;

    let slug = if body.slug.trim().is_empty() {
        existing.slug
    } else {
        body.slug
    };

    let category = state
        .category_repo
        .update(id, &body.title, &slug)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(category.into()))
}

/// DELETE /admin/categories/{id} - delete a category
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .category_repo
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("Category not found: {}", id)))?;

    state
        .category_repo
        .delete(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}
