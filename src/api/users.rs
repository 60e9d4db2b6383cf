//! User-facing profile endpoints
//!
//! - GET /profile - own profile
//! - PUT /profile - edit own profile
//! - GET /users/{netid} - view another member
//! - GET /about - member roster

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{UpdateUserInput, User};
use crate::services::user::UserServiceError;

/// Full profile response (the owner's view)
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub name: String,
    pub netid: String,
    pub email: String,
    pub role: String,
    pub member: bool,
    pub member_since: Option<String>,
    pub membership_status: String,
    pub membership_status_label: String,
    pub membership_paid_on: Option<String>,
    pub description: Option<String>,
    pub description_html: Option<String>,
    pub standing: String,
    pub major: String,
    pub shirt_size: String,
    pub gravatar_url: String,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        let gravatar_url = user.gravatar_url();
        Self {
            id: user.id,
            name: user.name,
            netid: user.netid,
            email: user.email,
            role: user.role.to_string(),
            member: user.member,
            member_since: user.member_since.map(|d| d.to_rfc3339()),
            membership_status: user.membership_status.to_string(),
            membership_status_label: user.membership_status.label().to_string(),
            membership_paid_on: user.membership_paid_on.map(|d| d.to_rfc3339()),
            description: user.description,
            description_html: user.description_html,
            standing: user.standing,
            major: user.major,
            shirt_size: user.shirt_size,
            gravatar_url,
        }
    }
}

/// Public member view (what other members see)
#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub name: String,
    pub netid: String,
    pub role: String,
    pub standing: String,
    pub major: String,
    pub membership_status_label: String,
    pub description_html: Option<String>,
    pub gravatar_url: String,
}

impl From<User> for MemberResponse {
    fn from(user: User) -> Self {
        let gravatar_url = user.gravatar_url();
        Self {
            name: user.name,
            netid: user.netid,
            role: user.role.to_string(),
            standing: user.standing,
            major: user.major,
            membership_status_label: user.membership_status.label().to_string(),
            description_html: user.description_html,
            gravatar_url,
        }
    }
}

/// Request body for profile edits
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub netid: Option<String>,
    pub email: Option<String>,
    pub standing: Option<String>,
    pub major: Option<String>,
    pub shirt_size: Option<String>,
    pub description: Option<String>,
}

fn map_user_error(e: UserServiceError) -> ApiError {
    match e {
        UserServiceError::NotFound(msg) => ApiError::not_found(format!("User not found: {}", msg)),
        UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        UserServiceError::UserExists(msg) => {
            ApiError::conflict(format!("NetID/email already registered: {}", msg))
        }
        UserServiceError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

/// GET /profile - the authenticated user's own profile
pub async fn profile(user: AuthenticatedUser) -> Json<ProfileResponse> {
    Json(ProfileResponse::from(user.0))
}

/// PUT /profile - edit own profile.
///
/// Role and membership status are not editable here; changing netid/email
/// to another member's identity is rejected.
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let input = UpdateUserInput {
        name: body.name,
        netid: body.netid,
        email: body.email,
        standing: body.standing,
        major: body.major,
        shirt_size: body.shirt_size,
        description: body.description,
        role: None,
        membership_status: None,
    };

    let updated = state
        .user_service
        .update_profile(user.0.id, input)
        .await
        .map_err(map_user_error)?;

    Ok(Json(ProfileResponse::from(updated)))
}

/// GET /users/{netid} - view another member.
///
/// Viewing oneself returns the full profile.
pub async fn view_member(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(netid): Path<String>,
) -> Result<axum::response::Response, ApiError> {
    use axum::response::IntoResponse;

    let target = state
        .user_service
        .get_by_netid(&netid)
        .await
        .map_err(map_user_error)?
        .ok_or_else(|| ApiError::not_found(format!("User not found: {}", netid)))?;

    if target.id == user.0.id {
        return Ok(Json(ProfileResponse::from(target)).into_response());
    }

    Ok(Json(MemberResponse::from(target)).into_response())
}

/// Response for the member roster
#[derive(Debug, Serialize)]
pub struct AboutResponse {
    pub members: Vec<MemberResponse>,
}

/// GET /about - all members, ordered by name
pub async fn about(State(state): State<AppState>) -> Result<Json<AboutResponse>, ApiError> {
    let members = state
        .user_service
        .list_all()
        .await
        .map_err(map_user_error)?
        .into_iter()
        .map(MemberResponse::from)
        .collect();

    Ok(Json(AboutResponse { members }))
}
