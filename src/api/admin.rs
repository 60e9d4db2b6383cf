//! Admin back-office endpoints
//!
//! Mounted under `/admin` behind the auth + admin guards:
//! - user listing with text search, update and delete
//! - membership report bundle download
//! - category and tag management (handlers in their own modules)

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::middleware::{ApiError, AppState};
use crate::api::users::ProfileResponse;
use crate::api::{categories, tags};
use crate::models::{ListParams, MemberRole, MembershipStatus, UpdateUserInput};
use crate::services::search::parse_id_list;
use crate::services::ReportGenerator;
use crate::services::user::UserServiceError;

/// Build the admin router (guards are layered by the caller)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", put(update_user))
        .route("/users/{id}", delete(delete_user))
        .route("/reports", get(download_reports))
        .route("/articles/{id}", put(crate::api::posts::update_post))
        .route("/articles/{id}", delete(crate::api::posts::delete_post))
        .route("/categories", post(categories::create))
        .route("/categories/{id}", put(categories::update))
        .route("/categories/{id}", delete(categories::delete))
        .route("/tags", post(tags::create))
        .route("/tags/{id}", delete(tags::delete))
}

/// Query parameters for the admin user listing
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    /// Text search across name, email, netid, standing, major
    #[serde(default)]
    pub search: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Response for the admin user listing
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<ProfileResponse>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// Request body for admin user updates
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub netid: Option<String>,
    pub email: Option<String>,
    pub standing: Option<String>,
    pub major: Option<String>,
    pub shirt_size: Option<String>,
    pub role: Option<String>,
    pub membership_status: Option<String>,
}

/// Query parameters for the report download
#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    /// Optional comma-separated user ids; all users when absent
    pub ids: Option<String>,
}

fn map_user_error(e: UserServiceError) -> ApiError {
    match e {
        UserServiceError::NotFound(msg) => ApiError::not_found(format!("User not found: {}", msg)),
        UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        UserServiceError::UserExists(msg) => ApiError::conflict(msg),
        UserServiceError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

/// GET /admin/users - paged user listing with text search.
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let params = ListParams::new(query.page, query.page_size);

    let result = state
        .user_service
        .admin_search(&query.search, &params)
        .await
        .map_err(map_user_error)?;

    let total = result.total;
    let page = result.page;
    let page_size = result.per_page;
    let total_pages = result.total_pages();

    Ok(Json(UserListResponse {
        users: result.items.into_iter().map(ProfileResponse::from).collect(),
        total,
        page,
        page_size,
        total_pages,
    }))
}

/// PUT /admin/users/{id} - update any user, including role and membership
/// status.
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<AdminUpdateUserRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let role = body
        .role
        .as_deref()
        .map(MemberRole::from_str)
        .transpose()
        .map_err(|e| ApiError::validation_error(e.to_string()))?;

    let membership_status = body
        .membership_status
        .as_deref()
        .map(|s| {
            MembershipStatus::parse(s)
                .ok_or_else(|| ApiError::validation_error(format!("Invalid membership status: {}", s)))
        })
        .transpose()?;

    let input = UpdateUserInput {
        name: body.name,
        netid: body.netid,
        email: body.email,
        standing: body.standing,
        major: body.major,
        shirt_size: body.shirt_size,
        description: None,
        role,
        membership_status,
    };

    let updated = state
        .user_service
        .admin_update(id, input)
        .await
        .map_err(map_user_error)?;

    Ok(Json(ProfileResponse::from(updated)))
}

/// DELETE /admin/users/{id} - delete a user
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete(id).await.map_err(map_user_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/reports - download paper copies of membership records.
///
/// Returns a zip with one PDF per user. The optional `ids` parameter
/// restricts the bundle to specific users; an unknown id is a 404 rather
/// than a silently smaller bundle.
async fn download_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users = match &query.ids {
        None => state.user_service.list_all().await.map_err(map_user_error)?,
        Some(raw) => {
            let ids = parse_id_list(raw)
                .map_err(|e| ApiError::validation_error(e.to_string()))?;
            let mut users = Vec::with_capacity(ids.len());
            for id in ids {
                let user = state
                    .user_service
                    .get_by_id(id)
                    .await
                    .map_err(map_user_error)?
                    .ok_or_else(|| ApiError::not_found(format!("User not found: {}", id)))?;
                users.push(user);
            }
            users
        }
    };

    let bundle = ReportGenerator::membership_bundle(&users)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    tracing::info!(count = users.len(), "Membership report bundle generated");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"membership-reports.zip\"".to_string(),
            ),
        ],
        bundle,
    ))
}
