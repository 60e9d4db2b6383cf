//! Post service
//!
//! Business logic for post management: CRUD with validation, slug
//! derivation, markdown rendering, tag associations and list caching.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{PostRepository, TagRepository};
use crate::models::{
    CreatePostInput, ListParams, PagedResult, Post, PostFilter, UpdatePostInput,
};
use crate::services::markdown::MarkdownRenderer;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

/// Cache TTL for single posts (1 hour)
const POST_CACHE_TTL_SECS: u64 = 3600;

/// Cache key prefixes
const CACHE_KEY_POST_BY_SLUG: &str = "post:slug:";
const CACHE_KEY_POST_LIST: &str = "posts:list";

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new("[a-zA-Z0-9]+").unwrap());

/// Derive a slug from a title: the first 99 characters, alphanumeric runs
/// joined by `-`.
pub fn slugify(title: &str) -> String {
    let truncated: String = title.chars().take(99).collect();
    SLUG_RE
        .find_iter(&truncated)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join("-")
}

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Duplicate slug
    #[error("Post slug already exists: {0}")]
    DuplicateSlug(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    tag_repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
    markdown: MarkdownRenderer,
    cache_ttl: Duration,
}

impl PostService {
    /// Create a new post service
    pub fn new(
        repo: Arc<dyn PostRepository>,
        tag_repo: Arc<dyn TagRepository>,
        cache: Arc<Cache>,
        markdown: MarkdownRenderer,
    ) -> Self {
        Self {
            repo,
            tag_repo,
            cache,
            markdown,
            cache_ttl: Duration::from_secs(POST_CACHE_TTL_SECS),
        }
    }

    /// Create a new post.
    ///
    /// Validates that title and body are present, derives the slug from the
    /// title when none was given, renders the body, and associates tags.
    pub async fn create(
        &self,
        mut input: CreatePostInput,
        tag_ids: Option<Vec<i64>>,
    ) -> Result<Post, PostServiceError> {
        if input.title.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Post title cannot be empty".to_string(),
            ));
        }
        if input.body.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Post body cannot be empty".to_string(),
            ));
        }

        if input.slug.trim().is_empty() {
            input.slug = slugify(&input.title);
        }
        if input.slug.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Post title produces an empty slug".to_string(),
            ));
        }

        if self
            .repo
            .exists_by_slug(&input.slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(PostServiceError::DuplicateSlug(input.slug));
        }

        input.body_html = Some(self.markdown.render(&input.body));

        let post = self
            .repo
            .create(&input)
            .await
            .context("Failed to create post")?;

        if let Some(ids) = tag_ids {
            self.tag_repo
                .set_post_tags(post.id, &ids)
                .await
                .context("Failed to associate tags")?;
        }

        self.invalidate_list_cache().await;

        Ok(post)
    }

    /// Get post by slug, cached
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, PostServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_POST_BY_SLUG, slug);
        if let Some(post) = self.cache.get::<Post>(&cache_key).await.ok().flatten() {
            return Ok(Some(post));
        }

        let post = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")?;

        if let Some(ref p) = post {
            let _ = self.cache.set(&cache_key, p, self.cache_ttl).await;
        }

        Ok(post)
    }

    /// Get post by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>, PostServiceError> {
        Ok(self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post by ID")?)
    }

    /// List posts by recency with pagination
    pub async fn list_recent(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let cache_key = format!(
            "{}:{}:{}",
            CACHE_KEY_POST_LIST, params.page, params.per_page
        );
        if let Some(result) = self
            .cache
            .get::<PagedResult<Post>>(&cache_key)
            .await
            .ok()
            .flatten()
        {
            return Ok(result);
        }

        let items = self
            .repo
            .list_recent(params.offset(), params.limit())
            .await
            .context("Failed to list posts")?;
        let total = self.repo.count().await.context("Failed to count posts")?;

        let result = PagedResult::new(items, total, params);
        let _ = self.cache.set(&cache_key, &result, self.cache_ttl).await;

        Ok(result)
    }

    /// Run a composed filter query with pagination.
    ///
    /// Not cached: the filter space is unbounded and requests rarely repeat.
    pub async fn search(
        &self,
        filter: &PostFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let items = self
            .repo
            .search(filter, params.offset(), params.limit())
            .await
            .context("Failed to search posts")?;
        let total = self
            .repo
            .count_search(filter)
            .await
            .context("Failed to count search results")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// Posts carrying the given tag name, newest first
    pub async fn list_by_tag_name(
        &self,
        tag_name: &str,
        limit: i64,
    ) -> Result<Vec<Post>, PostServiceError> {
        Ok(self
            .repo
            .list_by_tag_name(tag_name, 0, limit)
            .await
            .context("Failed to list posts by tag")?)
    }

    /// Tags attached to a post
    pub async fn tags_for(&self, post_id: i64) -> Result<Vec<crate::models::Tag>, PostServiceError> {
        Ok(self
            .tag_repo
            .list_for_post(post_id)
            .await
            .context("Failed to list tags for post")?)
    }

    /// Update a post
    pub async fn update(
        &self,
        id: i64,
        mut input: UpdatePostInput,
        tag_ids: Option<Vec<i64>>,
    ) -> Result<Post, PostServiceError> {
        let existing = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(id.to_string()))?;

        if let Some(ref title) = input.title {
            if title.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Post title cannot be empty".to_string(),
                ));
            }
        }

        if let Some(ref slug) = input.slug {
            if self
                .repo
                .exists_by_slug_excluding(slug, id)
                .await
                .context("Failed to check slug uniqueness")?
            {
                return Err(PostServiceError::DuplicateSlug(slug.clone()));
            }
        }

        // Re-render when the body changed
        if let Some(ref body) = input.body {
            input.body_html = Some(self.markdown.render(body));
        }

        let post = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update post")?;

        if let Some(ids) = tag_ids {
            self.tag_repo
                .set_post_tags(id, &ids)
                .await
                .context("Failed to update tags")?;
        }

        let _ = self
            .cache
            .delete(&format!("{}{}", CACHE_KEY_POST_BY_SLUG, existing.slug))
            .await;
        self.invalidate_list_cache().await;

        Ok(post)
    }

    /// Delete a post
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let existing = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| PostServiceError::NotFound(id.to_string()))?;

        self.repo.delete(id).await.context("Failed to delete post")?;

        let _ = self
            .cache
            .delete(&format!("{}{}", CACHE_KEY_POST_BY_SLUG, existing.slug))
            .await;
        self.invalidate_list_cache().await;

        Ok(())
    }

    async fn invalidate_list_cache(&self) {
        let _ = self
            .cache
            .delete_pattern(&format!("{}*", CACHE_KEY_POST_LIST))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{SqlxPostRepository, SqlxTagRepository};
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;
    use sqlx::SqlitePool;

    async fn setup() -> (SqlitePool, PostService) {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to migrate");

        let service = PostService::new(
            Arc::new(SqlxPostRepository::new(pool.clone())),
            Arc::new(SqlxTagRepository::new(pool.clone())),
            Arc::new(Cache::Memory(MemoryCache::new())),
            MarkdownRenderer::new(),
        );
        (pool, service)
    }

    async fn seed_author_and_category(pool: &SqlitePool) -> (i64, i64) {
        let author = sqlx::query("INSERT INTO users (name, netid, email) VALUES (?, ?, ?)")
            .bind("Author")
            .bind("auth001")
            .bind("auth001@example.edu")
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let category = sqlx::query("INSERT INTO categories (title, slug) VALUES (?, ?)")
            .bind("News")
            .bind("news")
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid();
        (author, category)
    }

    fn input(title: &str, author_id: i64, category_id: i64) -> CreatePostInput {
        CreatePostInput {
            slug: String::new(),
            title: title.to_string(),
            body: "Some **markdown** body".to_string(),
            body_html: None,
            author_id,
            category_id,
        }
    }

    #[test]
    fn test_slugify_matches_derivation_rule() {
        assert_eq!(slugify("Hello World"), "Hello-World");
        assert_eq!(slugify("Rust 101: Ownership & Borrowing"), "Rust-101-Ownership-Borrowing");
        assert_eq!(slugify("   "), "");
        assert_eq!(slugify("a--b"), "a-b");

        // First 99 characters only
        let long_title = "a".repeat(150);
        assert_eq!(slugify(&long_title).len(), 99);
    }

    proptest! {
        #[test]
        fn property_slugify_is_url_safe(title in ".{0,200}") {
            let slug = slugify(&title);
            prop_assert!(slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
        }
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_renders_body() {
        let (pool, service) = setup().await;
        let (author, category) = seed_author_and_category(&pool).await;

        let post = service
            .create(input("Hello World", author, category), None)
            .await
            .expect("Failed to create post");

        assert_eq!(post.slug, "Hello-World");
        assert!(post.body_html.contains("<strong>markdown</strong>"));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_fields() {
        let (pool, service) = setup().await;
        let (author, category) = seed_author_and_category(&pool).await;

        let result = service.create(input("  ", author, category), None).await;
        assert!(matches!(result, Err(PostServiceError::ValidationError(_))));

        let mut no_body = input("Title", author, category);
        no_body.body = String::new();
        let result = service.create(no_body, None).await;
        assert!(matches!(result, Err(PostServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_slug() {
        let (pool, service) = setup().await;
        let (author, category) = seed_author_and_category(&pool).await;

        service
            .create(input("Same Title", author, category), None)
            .await
            .unwrap();
        let result = service.create(input("Same Title", author, category), None).await;
        assert!(matches!(result, Err(PostServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_create_associates_tags() {
        let (pool, service) = setup().await;
        let (author, category) = seed_author_and_category(&pool).await;
        let tag_repo = SqlxTagRepository::new(pool.clone());
        let tag = tag_repo.get_or_create("rust").await.unwrap();

        let post = service
            .create(input("Tagged", author, category), Some(vec![tag.id]))
            .await
            .unwrap();

        let tags = service.tags_for(post.id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "rust");
    }

    #[tokio::test]
    async fn test_get_by_slug_uses_cache_after_first_read() {
        let (pool, service) = setup().await;
        let (author, category) = seed_author_and_category(&pool).await;

        let created = service
            .create(input("Cached Post", author, category), None)
            .await
            .unwrap();

        // Prime the cache
        let first = service.get_by_slug(&created.slug).await.unwrap().unwrap();
        assert_eq!(first.id, created.id);

        // Delete behind the cache; the read still succeeds from cache
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(created.id)
            .execute(&pool)
            .await
            .unwrap();
        let second = service.get_by_slug(&created.slug).await.unwrap();
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn test_list_recent_pagination() {
        let (pool, service) = setup().await;
        let (author, category) = seed_author_and_category(&pool).await;

        for i in 1..=5 {
            service
                .create(input(&format!("Post {}", i), author, category), None)
                .await
                .unwrap();
        }

        let page = service.list_recent(&ListParams::new(1, 2)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages(), 3);
    }

    #[tokio::test]
    async fn test_update_rerenders_body_and_invalidates() {
        let (pool, service) = setup().await;
        let (author, category) = seed_author_and_category(&pool).await;

        let created = service
            .create(input("Original", author, category), None)
            .await
            .unwrap();

        let updated = service
            .update(
                created.id,
                UpdatePostInput::new().with_body("*italic* now".to_string()),
                None,
            )
            .await
            .unwrap();

        assert!(updated.body_html.contains("<em>italic</em>"));
    }

    #[tokio::test]
    async fn test_update_missing_post() {
        let (_pool, service) = setup().await;
        let result = service
            .update(9999, UpdatePostInput::new().with_title("X".to_string()), None)
            .await;
        assert!(matches!(result, Err(PostServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_post() {
        let (pool, service) = setup().await;
        let (author, category) = seed_author_and_category(&pool).await;

        let created = service
            .create(input("Doomed", author, category), None)
            .await
            .unwrap();

        service.delete(created.id).await.unwrap();
        assert!(service.get_by_id(created.id).await.unwrap().is_none());

        let result = service.delete(created.id).await;
        assert!(matches!(result, Err(PostServiceError::NotFound(_))));
    }
}
