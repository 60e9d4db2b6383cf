//! Membership payment endpoints
//!
//! - GET /membership/pay - start a dues checkout and follow it
//! - GET /membership/verify/{key} - gateway redirect target

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::membership::MembershipError;

fn map_membership_error(e: MembershipError) -> ApiError {
    match e {
        MembershipError::Gateway(msg) => ApiError::bad_gateway(msg),
        MembershipError::Transport(e) => ApiError::bad_gateway(e.to_string()),
        MembershipError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

/// GET /membership/pay - create a checkout and redirect to the gateway.
pub async fn pay(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Redirect, ApiError> {
    let checkout = state
        .membership_service
        .begin_checkout(&user.0)
        .await
        .map_err(map_membership_error)?;

    tracing::info!(
        user_id = user.0.id,
        checkout_id = checkout.checkout_id,
        "Dues checkout created"
    );

    Ok(Redirect::to(&checkout.checkout_uri))
}

/// GET /membership/verify/{key} - record a completed payment.
///
/// The gateway redirects here after checkout. A matching key marks the
/// member paid; an unknown key redirects to the profile with no state
/// change, exactly like a stale or replayed redirect should.
pub async fn verify(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(key): Path<String>,
) -> Result<Redirect, ApiError> {
    match state
        .membership_service
        .verify(&key)
        .await
        .map_err(map_membership_error)?
    {
        Some(user) => {
            tracing::info!(user_id = user.id, "Membership payment verified");
            Ok(Redirect::to("/profile?flash=payment-received"))
        }
        None => Ok(Redirect::to("/profile")),
    }
}
