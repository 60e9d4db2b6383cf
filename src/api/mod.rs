//! API layer - HTTP handlers and routing
//!
//! Route map:
//! - `/`, `/about` - public site pages
//! - `/login`, `/oauth2callback`, `/register`, `/logout`, `/me` - auth
//! - `/articles` and the dimension redirects - post listing/search
//! - `/profile`, `/users/{netid}` - member profiles
//! - `/membership/*` - dues payment flow
//! - `/admin/*` - back-office (admin role)

pub mod admin;
pub mod auth;
pub mod categories;
pub mod membership;
pub mod middleware;
pub mod posts;
pub mod site;
pub mod tags;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Unknown routes return a 404 body
async fn not_found() -> ApiError {
    ApiError::not_found("Page not found")
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    // Back-office routes (admin role required)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Publishing routes (publisher role required); post edits by id live
    // under /admin
    let publisher_routes = Router::new()
        .route("/articles", post(posts::create_post))
        .route_layer(axum_middleware::from_fn(middleware::require_publisher))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Routes that need a session but no particular role
    let protected_routes = Router::new()
        .route("/profile", get(users::profile))
        .route("/profile", put(users::update_profile))
        .route("/users/{netid}", get(users::view_member))
        .route("/membership/pay", get(membership::pay))
        .route("/membership/verify/{key}", get(membership::verify))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/", get(site::home))
        .route("/about", get(users::about))
        .route("/login", get(auth::login))
        .route("/oauth2callback", get(auth::oauth_callback))
        .route("/register", post(auth::register))
        .route("/articles", get(posts::list_posts))
        .route("/articles/cat/{slug}", get(posts::redirect_category))
        .route("/articles/tag/{name}", get(posts::redirect_tag))
        .route("/articles/author/{netid}", get(posts::redirect_author))
        .route("/articles/{slug}", get(posts::get_post))
        .route("/categories", get(categories::list))
        .route("/tags", get(tags::list))
        .merge(admin_routes)
        .merge(publisher_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
