//! Site endpoints
//!
//! The home feed: front-page posts plus the category/tag/author
//! vocabularies the search form is built from.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::posts::{AuthorInfo, CategoryInfo, PostResponse, TagInfo};
use crate::models::tag::FRONTPAGE_TAG;

/// Number of posts shown on the home feed
const FRONTPAGE_LIMIT: i64 = 20;

/// Response for the home feed
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    /// Posts tagged for the front page, newest first
    pub posts: Vec<PostResponse>,
    /// Category vocabulary for the search form
    pub categories: Vec<CategoryInfo>,
    /// Tag vocabulary for the search form
    pub tags: Vec<TagInfo>,
    /// Publishing members, ordered by name
    pub authors: Vec<AuthorInfo>,
}

/// GET / - home feed
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>, ApiError> {
    let posts = state
        .post_service
        .list_by_tag_name(FRONTPAGE_TAG, FRONTPAGE_LIMIT)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .into_iter()
        .map(PostResponse::from)
        .collect();

    let categories = state
        .category_repo
        .list_all()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .into_iter()
        .map(|c| CategoryInfo {
            id: c.id,
            title: c.title,
            slug: c.slug,
        })
        .collect();

    let tags = state
        .tag_repo
        .list_all()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .into_iter()
        .map(|t| TagInfo {
            id: t.id,
            name: t.name,
        })
        .collect();

    let authors = state
        .user_service
        .list_publishers()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .into_iter()
        .map(|u| AuthorInfo {
            id: u.id,
            name: u.name,
            netid: u.netid,
        })
        .collect();

    Ok(Json(HomeResponse {
        posts,
        categories,
        tags,
        authors,
    }))
}
