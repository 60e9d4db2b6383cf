//! Post API endpoints
//!
//! - GET /articles - list/search posts with category, author, tag and text
//!   filters and a selectable sort order
//! - GET /articles/{slug} - post detail
//! - GET /articles/cat/{slug}, /articles/tag/{name}, /articles/author/{netid}
//!   - dimension redirects into the listing
//! - POST /articles - publisher operation
//! - PUT/DELETE /admin/articles/{id} - back-office operations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{ListParams, Post};
use crate::services::post::PostServiceError;
use crate::services::search::{SearchError, SearchParams};

/// Query parameters for listing posts
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    /// Free-text search term
    pub q: Option<String>,
    /// Comma-separated category ids
    pub c: Option<String>,
    /// Comma-separated author ids
    pub a: Option<String>,
    /// Comma-separated tag ids
    pub t: Option<String>,
    /// Sort key token
    pub order: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    4
}

/// Response for the post listing
#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    /// Sort order the listing was produced with
    pub order: String,
}

/// Response for a single post
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub body_html: String,
    pub author_id: i64,
    pub category_id: i64,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagInfo>>,
}

#[derive(Debug, Serialize, Clone)]
pub struct CategoryInfo {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct AuthorInfo {
    pub id: i64,
    pub name: String,
    pub netid: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct TagInfo {
    pub id: i64,
    pub name: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            body: post.body,
            body_html: post.body_html,
            author_id: post.author_id,
            category_id: post.category_id,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            category: None,
            author: None,
            tags: None,
        }
    }
}

/// Request body for creating a post
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub slug: String,
    pub category_id: i64,
    #[serde(default)]
    pub tag_ids: Option<Vec<i64>>,
}

/// Request body for updating a post
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub slug: Option<String>,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tag_ids: Option<Vec<i64>>,
}

/// Attach category, author and tag info to a post response
async fn enrich(state: &AppState, post: Post) -> PostResponse {
    let category = state
        .category_repo
        .get_by_id(post.category_id)
        .await
        .ok()
        .flatten();
    let author = state.user_repo.get_by_id(post.author_id).await.ok().flatten();
    let tags = state
        .post_service
        .tags_for(post.id)
        .await
        .unwrap_or_default();

    let mut response: PostResponse = post.into();
    response.category = category.map(|c| CategoryInfo {
        id: c.id,
        title: c.title,
        slug: c.slug,
    });
    response.author = author.map(|u| AuthorInfo {
        id: u.id,
        name: u.name,
        netid: u.netid,
    });
    response.tags = Some(
        tags.into_iter()
            .map(|t| TagInfo {
                id: t.id,
                name: t.name,
            })
            .collect(),
    );
    response
}

fn map_search_error(e: SearchError) -> ApiError {
    match e {
        SearchError::MalformedIdList(_) | SearchError::UnknownSortKey(_) => {
            ApiError::validation_error(e.to_string())
        }
        SearchError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

fn map_post_error(e: PostServiceError) -> ApiError {
    match e {
        PostServiceError::NotFound(msg) => ApiError::not_found(format!("Post not found: {}", msg)),
        PostServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        PostServiceError::DuplicateSlug(slug) => ApiError::with_details(
            "CONFLICT",
            format!("Post slug already exists: {}", slug),
            serde_json::json!({"field": "slug", "value": slug}),
        ),
        PostServiceError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

/// GET /articles - list posts, optionally filtered and sorted.
///
/// With no filter parameters the posts are listed by recency. Otherwise the
/// parameters are composed into a filter: text against title and body, id
/// sets per dimension (absent dimensions match the whole table), and the
/// resolved sort order.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let params = ListParams::new(query.page, query.page_size);
    let search = SearchParams {
        q: query.q,
        categories: query.c,
        authors: query.a,
        tags: query.t,
        order: query.order,
    };

    let (result, order) = if search.is_empty() {
        let result = state
            .post_service
            .list_recent(&params)
            .await
            .map_err(map_post_error)?;
        (result, crate::models::SortKey::Recency)
    } else {
        let filter = state
            .filter_composer
            .compose(&search)
            .await
            .map_err(map_search_error)?;
        let order = filter.order;
        let result = state
            .post_service
            .search(&filter, &params)
            .await
            .map_err(map_post_error)?;
        (result, order)
    };

    let total = result.total;
    let page = result.page;
    let page_size = result.per_page;
    let total_pages = result.total_pages();

    let mut posts = Vec::new();
    for post in result.items {
        posts.push(enrich(&state, post).await);
    }

    Ok(Json(PostListResponse {
        posts,
        total,
        page,
        page_size,
        total_pages,
        order: order.to_string(),
    }))
}

/// GET /articles/{slug} - post detail
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .get_by_slug(&slug)
        .await
        .map_err(map_post_error)?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", slug)))?;

    Ok(Json(enrich(&state, post).await))
}

/// GET /articles/cat/{slug} - redirect to the listing filtered by category
pub async fn redirect_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Redirect, ApiError> {
    let category = state
        .category_repo
        .get_by_slug(&slug)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("Category not found: {}", slug)))?;

    Ok(Redirect::to(&format!("/articles?c={}", category.id)))
}

/// GET /articles/tag/{name} - redirect to the listing filtered by tag
pub async fn redirect_tag(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, ApiError> {
    let tag = state
        .tag_repo
        .get_by_name(&name)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("Tag not found: {}", name)))?;

    Ok(Redirect::to(&format!("/articles?t={}", tag.id)))
}

/// GET /articles/author/{netid} - redirect to the listing filtered by author
pub async fn redirect_author(
    State(state): State<AppState>,
    Path(netid): Path<String>,
) -> Result<Redirect, ApiError> {
    let author = state
        .user_repo
        .get_by_netid(&netid)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("Author not found: {}", netid)))?;

    Ok(Redirect::to(&format!("/articles?a={}", author.id)))
}

/// POST /articles - create a post (publisher)
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let input = crate::models::CreatePostInput {
        slug: body.slug,
        title: body.title,
        body: body.body,
        body_html: None,
        author_id: user.0.id,
        category_id: body.category_id,
    };

    let post = state
        .post_service
        .create(input, body.tag_ids)
        .await
        .map_err(map_post_error)?;

    Ok((StatusCode::CREATED, Json(enrich(&state, post).await)))
}

/// PUT /admin/articles/{id} - update a post (admin back-office)
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let input = crate::models::UpdatePostInput {
        slug: body.slug,
        title: body.title,
        body: body.body,
        body_html: None,
        category_id: body.category_id,
    };

    let post = state
        .post_service
        .update(id, input, body.tag_ids)
        .await
        .map_err(map_post_error)?;

    Ok(Json(enrich(&state, post).await))
}

/// DELETE /admin/articles/{id} - delete a post (admin back-office)
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(id).await.map_err(map_post_error)?;

    Ok(StatusCode::NO_CONTENT)
}
