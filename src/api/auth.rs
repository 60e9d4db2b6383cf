//! Authentication API endpoints
//!
//! - GET /login - start the OAuth flow
//! - GET /oauth2callback - provider redirect target
//! - POST /register - membership registration with signature capture
//! - POST /logout - destroy the session
//! - GET /me - current user

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    clear_session_cookie, extract_session_token, session_cookie, ApiError, AppState,
    AuthenticatedUser,
};
use crate::api::users::ProfileResponse;
use crate::models::RegisterUserInput;
use crate::services::membership::MembershipError;
use crate::services::oauth::OauthError;
use crate::services::signature;
use crate::services::user::UserServiceError;

/// Query parameters for the login redirect
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Path to return to after login
    pub next: Option<String>,
}

/// Query parameters from the provider callback
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub netid: String,
    pub email: String,
    pub standing: String,
    pub major: String,
    pub shirt_size: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Signature image as a PNG data URL
    pub signature: String,
    /// Start a dues checkout right after registering
    #[serde(default)]
    pub pay_now: bool,
}

/// Response for successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: ProfileResponse,
    pub token: String,
    /// Checkout URL to follow when `pay_now` was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_uri: Option<String>,
}

/// Only site-local paths are allowed as post-login targets
fn safe_next_path(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/profile".to_string(),
    }
}

/// GET /login - send the visitor to the identity provider.
///
/// An already authenticated visitor skips the provider round-trip.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, ApiError> {
    let next = safe_next_path(query.next.as_deref());

    if let Some(token) = extract_session_token(&headers) {
        if state
            .user_service
            .validate_session(&token)
            .await
            .map_err(|e| ApiError::internal_error(e.to_string()))?
            .is_some()
        {
            return Ok(Redirect::to(&next));
        }
    }

    Ok(Redirect::to(&state.oauth_client.authorize_url(&next)))
}

/// GET /oauth2callback - authenticate the user after the provider redirect.
///
/// Provider errors and unverified emails redirect home with a flash
/// indicator; a verified email with no matching account redirects to
/// registration. Code-exchange rejection is a 403.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<axum::response::Response, ApiError> {
    if query.error.is_some() || query.code.is_none() {
        tracing::warn!(error = ?query.error, "OAuth callback without a code");
        return Ok(Redirect::to("/?flash=auth-error").into_response());
    }
    let code = query.code.as_deref().unwrap_or_default();

    let access_token = match state.oauth_client.exchange_code(code).await {
        Ok(token) => token,
        Err(OauthError::ExchangeRejected(reason)) => {
            tracing::warn!(reason = %reason, "OAuth code exchange rejected");
            return Err(ApiError::forbidden("Authentication code was rejected"));
        }
        Err(e) => return Err(ApiError::bad_gateway(e.to_string())),
    };

    let identity = state
        .oauth_client
        .fetch_user(&access_token)
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;

    if !identity.verified_email {
        return Ok(Redirect::to("/?flash=unverified-email").into_response());
    }

    let (user, session) = match state.user_service.login_by_email(&identity.email).await {
        Ok(pair) => pair,
        Err(UserServiceError::NotFound(_)) => {
            // Known provider identity without an account: register first
            return Ok(Redirect::to("/register?flash=unknown-email").into_response());
        }
        Err(e) => return Err(ApiError::internal_error(e.to_string())),
    };

    tracing::info!(user_id = user.id, netid = %user.netid, "User logged in");

    let next = safe_next_path(query.state.as_deref());
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&session_cookie(&session.id))
            .map_err(|e| ApiError::internal_error(e.to_string()))?,
    );

    Ok((headers, Redirect::to(&next)).into_response())
}

/// POST /register - membership registration.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let signature = signature::normalize(&body.signature)
        .map_err(|e| ApiError::validation_error(e.to_string()))?;

    let input = RegisterUserInput {
        name: body.name,
        netid: body.netid,
        email: body.email,
        standing: body.standing,
        major: body.major,
        shirt_size: body.shirt_size,
        description: body.description,
        signature,
    };

    let user = state.user_service.register(input).await.map_err(|e| match e {
        UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        UserServiceError::UserExists(msg) => {
            ApiError::conflict(format!("NetID/email already registered: {}", msg))
        }
        _ => ApiError::internal_error(e.to_string()),
    })?;

    tracing::info!(user_id = user.id, netid = %user.netid, "User registered");

    let session = state
        .user_service
        .create_session(user.id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    // Start a dues checkout right away when requested
    let checkout_uri = if body.pay_now {
        let checkout = state
            .membership_service
            .begin_checkout(&user)
            .await
            .map_err(|e| match e {
                MembershipError::Gateway(msg) => ApiError::bad_gateway(msg),
                MembershipError::Transport(e) => ApiError::bad_gateway(e.to_string()),
                MembershipError::Internal(e) => ApiError::internal_error(e.to_string()),
            })?;
        Some(checkout.checkout_uri)
    } else {
        None
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&session_cookie(&session.id))
            .map_err(|e| ApiError::internal_error(e.to_string()))?,
    );

    Ok((
        StatusCode::CREATED,
        headers,
        Json(RegisterResponse {
            user: ProfileResponse::from(user),
            token: session.id,
            checkout_uri,
        }),
    ))
}

/// POST /logout - destroy the session and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        state
            .user_service
            .logout(&token)
            .await
            .map_err(|e| ApiError::internal_error(e.to_string()))?;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&clear_session_cookie())
            .map_err(|e| ApiError::internal_error(e.to_string()))?,
    );

    Ok((response_headers, StatusCode::NO_CONTENT))
}

/// GET /me - current authenticated user
pub async fn me(user: AuthenticatedUser) -> Json<ProfileResponse> {
    Json(ProfileResponse::from(user.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_path() {
        assert_eq!(safe_next_path(Some("/articles")), "/articles");
        assert_eq!(safe_next_path(Some("/profile/edit")), "/profile/edit");
        // Absolute URLs and scheme-relative URLs are not open-redirect targets
        assert_eq!(safe_next_path(Some("https://evil.test")), "/profile");
        assert_eq!(safe_next_path(Some("//evil.test")), "/profile");
        assert_eq!(safe_next_path(None), "/profile");
    }
}
