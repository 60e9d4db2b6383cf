//! Tag repository
//!
//! Tags are identified by name; `get_or_create` backs post tagging so the
//! same name is never inserted twice.

use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Get a tag by name or create it
    async fn get_or_create(&self, name: &str) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List all tags in alphabetical order
    async fn list_all(&self) -> Result<Vec<Tag>>;

    /// List all tag ids
    async fn all_ids(&self) -> Result<Vec<i64>>;

    /// Associate a tag with a post
    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()>;

    /// Remove a tag from a post
    async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<()>;

    /// Tags attached to a post, alphabetical
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Tag>>;

    /// Replace a post's tag set
    async fn set_post_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<()>;

    /// Delete a tag (associations cascade)
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: SqlitePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn get_or_create(&self, name: &str) -> Result<Tag> {
        if let Some(tag) = self.get_by_name(name).await? {
            return Ok(tag);
        }

        let now = Utc::now();
        let result = sqlx::query("INSERT INTO tags (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to create tag")?;

        Ok(Tag {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name, created_at FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get tag by ID")?;

        Ok(row.map(|row| row_to_tag(&row)))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name, created_at FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get tag by name")?;

        Ok(row.map(|row| row_to_tag(&row)))
    }

    async fn list_all(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list tags")?;

        Ok(rows.iter().map(row_to_tag).collect())
    }

    async fn all_ids(&self) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT id FROM tags")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list tag ids")?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn add_to_post(&self, tag_id: i64, post_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .context("Failed to tag post")?;
        Ok(())
    }

    async fn remove_from_post(&self, tag_id: i64, post_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = ? AND tag_id = ?")
            .bind(post_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .context("Failed to untag post")?;
        Ok(())
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, t.created_at
            FROM tags t
            JOIN post_tags pt ON t.id = pt.tag_id
            WHERE pt.post_id = ?
            ORDER BY t.name ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tags for post")?;

        Ok(rows.iter().map(row_to_tag).collect())
    }

    async fn set_post_tags(&self, post_id: i64, tag_ids: &[i64]) -> Result<()> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .context("Failed to clear post tags")?;

        for tag_id in tag_ids {
            self.add_to_post(*tag_id, post_id).await?;
        }

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete tag")?;
        Ok(())
    }
}

fn row_to_tag(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}
