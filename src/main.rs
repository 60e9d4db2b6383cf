//! Chapterhouse - membership and publishing system

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chapterhouse::{
    api::{self, AppState},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{
            SessionRepository, SqlxCategoryRepository, SqlxPostRepository,
            SqlxSessionRepository, SqlxTagRepository, SqlxUserRepository,
        },
    },
    services::{
        markdown::MarkdownRenderer,
        membership::{MembershipService, PaymentGateway},
        oauth::OauthClient,
        post::PostService,
        search::FilterComposer,
        user::UserService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chapterhouse=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Chapterhouse...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Initialize cache
    let cache = create_cache(&config.cache);
    tracing::info!("Cache initialized");

    let markdown = MarkdownRenderer::new();

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let tag_repo = SqlxTagRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());

    // Initialize services
    let user_service = Arc::new(UserService::new(
        user_repo.clone(),
        session_repo.clone(),
        markdown.clone(),
    ));
    let post_service = Arc::new(PostService::new(
        post_repo,
        tag_repo.clone(),
        cache.clone(),
        markdown,
    ));
    let filter_composer = Arc::new(FilterComposer::new(
        category_repo.clone(),
        user_repo.clone(),
        tag_repo.clone(),
    ));
    let membership_service = Arc::new(MembershipService::new(
        user_repo.clone(),
        PaymentGateway::new(config.payment.clone()),
        &config.server.public_url,
    ));
    let oauth_client = Arc::new(OauthClient::new(
        config.oauth.clone(),
        &config.server.public_url,
    ));

    // Sweep expired sessions once an hour
    {
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match session_repo.delete_expired().await {
                    Ok(removed) if removed > 0 => {
                        tracing::debug!(removed, "Expired sessions removed")
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Session sweep failed: {}", e),
                }
            }
        });
    }

    // Build application state
    let state = AppState {
        user_service,
        post_service,
        membership_service,
        oauth_client,
        filter_composer,
        category_repo,
        tag_repo,
        user_repo,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
