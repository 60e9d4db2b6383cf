//! Session repository

use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by token id
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session (logout)
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a user
    async fn delete_for_user(&self, user_id: i64) -> Result<()>;

    /// Drop expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: SqlitePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create session")?;

        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get session")?;

        Ok(row.map(|row| Session {
            id: row.get("id"),
            user_id: row.get("user_id"),
            expires_at: row.get("expires_at"),
            created_at: row.get("created_at"),
        }))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete sessions for user")?;
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("Failed to delete expired sessions")?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> (SqlitePool, SqlxSessionRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxSessionRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_user(pool: &SqlitePool) -> i64 {
        sqlx::query("INSERT INTO users (name, netid, email) VALUES (?, ?, ?)")
            .bind("Test User")
            .bind("test001")
            .bind("test@example.edu")
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    fn session_for(user_id: i64, id: &str, ttl_hours: i64) -> Session {
        let now = Utc::now();
        Session {
            id: id.to_string(),
            user_id,
            expires_at: now + Duration::hours(ttl_hours),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let (pool, repo) = setup().await;
        let user_id = create_user(&pool).await;

        repo.create(&session_for(user_id, "tok-1", 24)).await.unwrap();

        let found = repo.get_by_id("tok-1").await.unwrap().expect("Session missing");
        assert_eq!(found.user_id, user_id);

        repo.delete("tok-1").await.unwrap();
        assert!(repo.get_by_id("tok-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_for_user() {
        let (pool, repo) = setup().await;
        let user_id = create_user(&pool).await;

        repo.create(&session_for(user_id, "tok-1", 24)).await.unwrap();
        repo.create(&session_for(user_id, "tok-2", 24)).await.unwrap();

        repo.delete_for_user(user_id).await.unwrap();
        assert!(repo.get_by_id("tok-1").await.unwrap().is_none());
        assert!(repo.get_by_id("tok-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let (pool, repo) = setup().await;
        let user_id = create_user(&pool).await;

        repo.create(&session_for(user_id, "live", 24)).await.unwrap();
        repo.create(&session_for(user_id, "dead", -1)).await.unwrap();

        let removed = repo.delete_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get_by_id("live").await.unwrap().is_some());
        assert!(repo.get_by_id("dead").await.unwrap().is_none());
    }
}
