//! Post repository
//!
//! Database operations for posts, including the composed search query: the
//! filter arrives with every dimension concrete (see
//! `services::search::FilterComposer`) and is rendered here into a single
//! SQL statement joining categories and users for the sortable columns.

use crate::models::{CreatePostInput, Post, PostFilter, UpdatePostInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, input: &CreatePostInput) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get post by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// List posts by recency (newest first) with pagination
    async fn list_recent(&self, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Count all posts
    async fn count(&self) -> Result<i64>;

    /// Run a composed filter query with pagination
    async fn search(&self, filter: &PostFilter, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Count the results of a composed filter query
    async fn count_search(&self, filter: &PostFilter) -> Result<i64>;

    /// List posts carrying the given tag name, newest first
    async fn list_by_tag_name(&self, tag_name: &str, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Update a post
    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Post>;

    /// Delete a post
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Check if a slug exists for a different post (for updates)
    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: SqlitePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_COLUMNS: &str =
    "p.id, p.slug, p.title, p.body, p.body_html, p.author_id, p.category_id, p.created_at, p.updated_at";

/// Render an `IN` predicate for a column.
///
/// An empty id set matches nothing (the dimension's table was empty), so the
/// predicate degenerates to a constant-false clause rather than invalid SQL.
fn in_predicate(column: &str, len: usize) -> String {
    if len == 0 {
        "1 = 0".to_string()
    } else {
        let placeholders = vec!["?"; len].join(", ");
        format!("{} IN ({})", column, placeholders)
    }
}

/// Render the search statement for a composed filter.
///
/// All three dimension predicates are always present (the composer enumerates
/// ids for absent dimensions), combined conjunctively with the text match.
fn build_search_sql(filter: &PostFilter, select: &str, paged: bool) -> String {
    let mut sql = format!(
        "SELECT {} FROM posts p \
         JOIN categories c ON p.category_id = c.id \
         JOIN users u ON p.author_id = u.id \
         WHERE (p.title LIKE ? OR p.body_html LIKE ?)",
        select
    );

    sql.push_str(&format!(
        " AND {}",
        in_predicate("p.category_id", filter.category_ids.len())
    ));
    sql.push_str(&format!(
        " AND {}",
        in_predicate("p.author_id", filter.author_ids.len())
    ));
    sql.push_str(&format!(
        " AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND {})",
        in_predicate("pt.tag_id", filter.tag_ids.len())
    ));

    if paged {
        sql.push_str(&format!(" ORDER BY {} LIMIT ? OFFSET ?", filter.order.as_order_by()));
    }

    sql
}

fn bind_filter<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    filter: &PostFilter,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    let pattern = format!("%{}%", filter.text);
    query = query.bind(pattern.clone()).bind(pattern);
    for id in &filter.category_ids {
        query = query.bind(*id);
    }
    for id in &filter.author_ids {
        query = query.bind(*id);
    }
    for id in &filter.tag_ids {
        query = query.bind(*id);
    }
    query
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, input: &CreatePostInput) -> Result<Post> {
        let now = Utc::now();
        let body_html = input.body_html.clone().unwrap_or_default();

        let result = sqlx::query(
            r#"
            INSERT INTO posts (slug, title, body, body_html, author_id, category_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.body)
        .bind(&body_html)
        .bind(input.author_id)
        .bind(input.category_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create post")?;

        Ok(Post {
            id: result.last_insert_rowid(),
            slug: input.slug.clone(),
            title: input.title.clone(),
            body: input.body.clone(),
            body_html,
            author_id: input.author_id,
            category_id: input.category_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM posts p WHERE p.id = ?",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get post by ID")?;

        row.map(|row| row_to_post(&row)).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM posts p WHERE p.slug = ?",
            POST_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get post by slug")?;

        row.map(|row| row_to_post(&row)).transpose()
    }

    async fn list_recent(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts p ORDER BY p.created_at DESC LIMIT ? OFFSET ?",
            POST_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list posts")?;

        rows.iter().map(row_to_post).collect()
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM posts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts")?;

        Ok(row.get("count"))
    }

    async fn search(&self, filter: &PostFilter, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let sql = build_search_sql(filter, POST_COLUMNS, true);
        let query = bind_filter(sqlx::query(&sql), filter).bind(limit).bind(offset);

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to search posts")?;

        rows.iter().map(row_to_post).collect()
    }

    async fn count_search(&self, filter: &PostFilter) -> Result<i64> {
        let sql = build_search_sql(filter, "COUNT(*) as count", false);
        let row = bind_filter(sqlx::query(&sql), filter)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count search results")?;

        Ok(row.get("count"))
    }

    async fn list_by_tag_name(&self, tag_name: &str, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM posts p
            JOIN post_tags pt ON p.id = pt.post_id
            JOIN tags t ON pt.tag_id = t.id
            WHERE t.name = ?
            ORDER BY p.created_at DESC
            LIMIT ? OFFSET ?
            "#,
            POST_COLUMNS
        ))
        .bind(tag_name)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list posts by tag name")?;

        rows.iter().map(row_to_post).collect()
    }

    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Post> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found"))?;

        let now = Utc::now();
        let new_slug = input.slug.as_ref().unwrap_or(&existing.slug);
        let new_title = input.title.as_ref().unwrap_or(&existing.title);
        let new_body = input.body.as_ref().unwrap_or(&existing.body);
        let new_body_html = input.body_html.as_ref().unwrap_or(&existing.body_html);
        let new_category_id = input.category_id.unwrap_or(existing.category_id);

        sqlx::query(
            r#"
            UPDATE posts
            SET slug = ?, title = ?, body = ?, body_html = ?, category_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(new_slug)
        .bind(new_title)
        .bind(new_body)
        .bind(new_body_html)
        .bind(new_category_id)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update post")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // post_tags entries cascade
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete post")?;

        Ok(())
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check post slug existence")?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ? AND id != ?")
            .bind(slug)
            .bind(exclude_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check post slug existence")?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }
}

fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        body: row.get("body"),
        body_html: row.get("body_html"),
        author_id: row.get("author_id"),
        category_id: row.get("category_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
