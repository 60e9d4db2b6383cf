//! Category repository

use crate::models::{Category, CreateCategoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories ordered by slug
    async fn list_all(&self) -> Result<Vec<Category>>;

    /// List all category ids
    async fn all_ids(&self) -> Result<Vec<i64>>;

    /// Check if a slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Update title and slug
    async fn update(&self, id: i64, title: &str, slug: &str) -> Result<Category>;

    /// Delete a category
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: SqlitePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO categories (title, slug, created_at) VALUES (?, ?, ?)",
        )
        .bind(&input.title)
        .bind(&input.slug)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create category")?;

        Ok(Category {
            id: result.last_insert_rowid(),
            title: input.title.clone(),
            slug: input.slug.clone(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, title, slug, created_at FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get category by ID")?;

        Ok(row.map(|row| row_to_category(&row)))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, title, slug, created_at FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get category by slug")?;

        Ok(row.map(|row| row_to_category(&row)))
    }

    async fn list_all(&self) -> Result<Vec<Category>> {
        let rows =
            sqlx::query("SELECT id, title, slug, created_at FROM categories ORDER BY slug ASC")
                .fetch_all(&self.pool)
                .await
                .context("Failed to list categories")?;

        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn all_ids(&self) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT id FROM categories")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list category ids")?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check category slug existence")?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn update(&self, id: i64, title: &str, slug: &str) -> Result<Category> {
        sqlx::query("UPDATE categories SET title = ?, slug = ? WHERE id = ?")
            .bind(title)
            .bind(slug)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update category")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete category")?;

        Ok(())
    }
}

fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        created_at: row.get("created_at"),
    }
}
