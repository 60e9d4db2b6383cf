//! User repository
//!
//! Database operations for users: identity lookups (netid, email, payment
//! verification key), admin text search, profile updates, and the payment
//! state transitions.

use crate::models::{MemberRole, MembershipStatus, UpdateUserInput, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; the id field of the argument is ignored
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by netid
    async fn get_by_netid(&self, netid: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get user by pending payment verification key
    async fn get_by_verification_key(&self, key: &str) -> Result<Option<User>>;

    /// Find a user other than `exclude_id` holding the given netid or email
    async fn find_conflict(&self, netid: &str, email: &str, exclude_id: i64)
        -> Result<Option<User>>;

    /// List all users ordered by name
    async fn list_all(&self) -> Result<Vec<User>>;

    /// List all user ids
    async fn all_ids(&self) -> Result<Vec<i64>>;

    /// List users with at least publisher role, ordered by name
    async fn list_publishers(&self) -> Result<Vec<User>>;

    /// Admin text search across name, email, netid, standing, major
    async fn search(&self, term: &str, offset: i64, limit: i64) -> Result<Vec<User>>;

    /// Count admin text search results
    async fn count_search(&self, term: &str) -> Result<i64>;

    /// Update profile/admin fields
    async fn update(&self, id: i64, input: &UpdateUserInput) -> Result<User>;

    /// Store the description's rendered HTML alongside the markdown
    async fn set_description_html(&self, id: i64, html: Option<&str>) -> Result<()>;

    /// Store a freshly generated payment verification key
    async fn set_payment_verification(&self, id: i64, key: &str) -> Result<()>;

    /// Store the gateway's checkout id
    async fn set_checkout_id(&self, id: i64, checkout_id: i64) -> Result<()>;

    /// Transition the user to paid membership at the given instant
    async fn mark_paid(&self, id: i64, paid_on: DateTime<Utc>) -> Result<()>;

    /// Delete a user
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: SqlitePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const USER_COLUMNS: &str = "id, name, netid, email, role, member, member_since, membership_status, \
     membership_paid_on, description, description_html, standing, major, shirt_size, \
     payment_verification, payment_checkout_id, signature, created_at, updated_at";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, netid, email, role, member, member_since, membership_status,
                               membership_paid_on, description, description_html, standing, major,
                               shirt_size, payment_verification, payment_checkout_id, signature,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.netid)
        .bind(&user.email)
        .bind(user.role.to_string())
        .bind(user.member)
        .bind(user.member_since)
        .bind(user.membership_status.as_str())
        .bind(user.membership_paid_on)
        .bind(&user.description)
        .bind(&user.description_html)
        .bind(&user.standing)
        .bind(&user.major)
        .bind(&user.shirt_size)
        .bind(&user.payment_verification)
        .bind(user.payment_checkout_id)
        .bind(&user.signature)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create user")?;

        let mut created = user.clone();
        created.id = result.last_insert_rowid();
        created.created_at = now;
        created.updated_at = now;
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by ID")?;

        row.map(|row| row_to_user(&row)).transpose()
    }

    async fn get_by_netid(&self, netid: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE netid = ?", USER_COLUMNS))
            .bind(netid)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by netid")?;

        row.map(|row| row_to_user(&row)).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by email")?;

        row.map(|row| row_to_user(&row)).transpose()
    }

    async fn get_by_verification_key(&self, key: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE payment_verification = ?",
            USER_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get user by verification key")?;

        row.map(|row| row_to_user(&row)).transpose()
    }

    async fn find_conflict(
        &self,
        netid: &str,
        email: &str,
        exclude_id: i64,
    ) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE (netid = ? OR email = ?) AND id != ?",
            USER_COLUMNS
        ))
        .bind(netid)
        .bind(email)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to check netid/email conflict")?;

        row.map(|row| row_to_user(&row)).transpose()
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users ORDER BY name ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        rows.iter().map(row_to_user).collect()
    }

    async fn all_ids(&self) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT id FROM users")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list user ids")?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn list_publishers(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE role IN ('admin', 'publisher') ORDER BY name ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list publishers")?;

        rows.iter().map(row_to_user).collect()
    }

    async fn search(&self, term: &str, offset: i64, limit: i64) -> Result<Vec<User>> {
        let pattern = format!("%{}%", term);
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM users
            WHERE name LIKE ? OR email LIKE ? OR netid LIKE ? OR standing LIKE ? OR major LIKE ?
            ORDER BY name ASC
            LIMIT ? OFFSET ?
            "#,
            USER_COLUMNS
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to search users")?;

        rows.iter().map(row_to_user).collect()
    }

    async fn count_search(&self, term: &str) -> Result<i64> {
        let pattern = format!("%{}%", term);
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as count FROM users
            WHERE name LIKE ? OR email LIKE ? OR netid LIKE ? OR standing LIKE ? OR major LIKE ?
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count user search results")?;

        Ok(row.get("count"))
    }

    async fn update(&self, id: i64, input: &UpdateUserInput) -> Result<User> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found"))?;

        let now = Utc::now();
        let new_name = input.name.as_ref().unwrap_or(&existing.name);
        let new_netid = input.netid.as_ref().unwrap_or(&existing.netid);
        let new_email = input.email.as_ref().unwrap_or(&existing.email);
        let new_standing = input.standing.as_ref().unwrap_or(&existing.standing);
        let new_major = input.major.as_ref().unwrap_or(&existing.major);
        let new_shirt_size = input.shirt_size.as_ref().unwrap_or(&existing.shirt_size);
        let new_description = input
            .description
            .clone()
            .or_else(|| existing.description.clone());
        let new_role = input.role.unwrap_or(existing.role);
        let new_status = input.membership_status.unwrap_or(existing.membership_status);

        sqlx::query(
            r#"
            UPDATE users
            SET name = ?, netid = ?, email = ?, standing = ?, major = ?, shirt_size = ?,
                description = ?, role = ?, membership_status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(new_name)
        .bind(new_netid)
        .bind(new_email)
        .bind(new_standing)
        .bind(new_major)
        .bind(new_shirt_size)
        .bind(&new_description)
        .bind(new_role.to_string())
        .bind(new_status.as_str())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn set_description_html(&self, id: i64, html: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE users SET description_html = ?, updated_at = ? WHERE id = ?")
            .bind(html)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to store rendered description")?;
        Ok(())
    }

    async fn set_payment_verification(&self, id: i64, key: &str) -> Result<()> {
        sqlx::query("UPDATE users SET payment_verification = ?, updated_at = ? WHERE id = ?")
            .bind(key)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to store payment verification key")?;
        Ok(())
    }

    async fn set_checkout_id(&self, id: i64, checkout_id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET payment_checkout_id = ?, updated_at = ? WHERE id = ?")
            .bind(checkout_id)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to store checkout id")?;
        Ok(())
    }

    async fn mark_paid(&self, id: i64, paid_on: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET membership_status = 'paid', member_since = ?, membership_paid_on = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(paid_on)
        .bind(paid_on)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to mark user as paid")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;
        Ok(())
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = MemberRole::from_str(&role_str)?;

    let status_str: String = row.get("membership_status");
    let membership_status = MembershipStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid membership status: {}", status_str))?;

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        netid: row.get("netid"),
        email: row.get("email"),
        role,
        member: row.get("member"),
        member_since: row.get("member_since"),
        membership_status,
        membership_paid_on: row.get("membership_paid_on"),
        description: row.get("description"),
        description_html: row.get("description_html"),
        standing: row.get("standing"),
        major: row.get("major"),
        shirt_size: row.get("shirt_size"),
        payment_verification: row.get("payment_verification"),
        payment_checkout_id: row.get("payment_checkout_id"),
        signature: row.get("signature"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
pub(crate) fn test_user(name: &str, netid: &str) -> User {
    let now = Utc::now();
    User {
        id: 0,
        name: name.to_string(),
        netid: netid.to_string(),
        email: format!("{}@example.edu", netid),
        role: MemberRole::Member,
        member: true,
        member_since: Some(now),
        membership_status: MembershipStatus::InProgress,
        membership_paid_on: None,
        description: None,
        description_html: None,
        standing: "junior".to_string(),
        major: "CS".to_string(),
        shirt_size: "M".to_string(),
        payment_verification: None,
        payment_checkout_id: None,
        signature: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = setup_test_repo().await;

        let created = repo
            .create(&test_user("Grace Hopper", "ghopp001"))
            .await
            .expect("Failed to create user");
        assert!(created.id > 0);

        let by_netid = repo
            .get_by_netid("ghopp001")
            .await
            .unwrap()
            .expect("User not found by netid");
        assert_eq!(by_netid.id, created.id);

        let by_email = repo
            .get_by_email("ghopp001@example.edu")
            .await
            .unwrap()
            .expect("User not found by email");
        assert_eq!(by_email.id, created.id);

        assert!(repo.get_by_netid("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_conflict() {
        let repo = setup_test_repo().await;

        let existing = repo
            .create(&test_user("Grace Hopper", "ghopp001"))
            .await
            .unwrap();

        // Another user claiming the same netid conflicts
        let conflict = repo
            .find_conflict("ghopp001", "other@example.edu", 0)
            .await
            .unwrap();
        assert!(conflict.is_some());

        // The user herself is excluded
        let conflict = repo
            .find_conflict("ghopp001", "ghopp001@example.edu", existing.id)
            .await
            .unwrap();
        assert!(conflict.is_none());

        // Unrelated identity is free
        let conflict = repo
            .find_conflict("new001", "new@example.edu", 0)
            .await
            .unwrap();
        assert!(conflict.is_none());
    }

    #[tokio::test]
    async fn test_list_publishers_excludes_members() {
        let repo = setup_test_repo().await;

        let mut admin = test_user("Ada Admin", "admin001");
        admin.role = MemberRole::Admin;
        repo.create(&admin).await.unwrap();

        let mut publisher = test_user("Pat Publisher", "pub001");
        publisher.role = MemberRole::Publisher;
        repo.create(&publisher).await.unwrap();

        repo.create(&test_user("Mel Member", "mem001")).await.unwrap();

        let publishers = repo.list_publishers().await.unwrap();
        assert_eq!(publishers.len(), 2);
        // Ordered by name
        assert_eq!(publishers[0].name, "Ada Admin");
        assert_eq!(publishers[1].name, "Pat Publisher");
    }

    #[tokio::test]
    async fn test_search_matches_all_columns() {
        let repo = setup_test_repo().await;

        let mut user = test_user("Grace Hopper", "ghopp001");
        user.major = "CE".to_string();
        user.standing = "senior".to_string();
        repo.create(&user).await.unwrap();
        repo.create(&test_user("Alan Turing", "aturi001")).await.unwrap();

        for term in ["Grace", "ghopp", "example.edu", "senior", "CE"] {
            let found = repo.search(term, 0, 10).await.unwrap();
            assert!(
                found.iter().any(|u| u.netid == "ghopp001"),
                "term {:?} should match",
                term
            );
        }

        assert_eq!(repo.count_search("Grace").await.unwrap(), 1);
        assert_eq!(repo.count_search("example.edu").await.unwrap(), 2);
        assert_eq!(repo.count_search("zzz").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_profile_fields() {
        let repo = setup_test_repo().await;
        let created = repo.create(&test_user("Grace Hopper", "ghopp001")).await.unwrap();

        let input = UpdateUserInput {
            major: Some("CE".to_string()),
            role: Some(MemberRole::Publisher),
            ..Default::default()
        };
        let updated = repo.update(created.id, &input).await.unwrap();

        assert_eq!(updated.major, "CE");
        assert_eq!(updated.role, MemberRole::Publisher);
        assert_eq!(updated.netid, "ghopp001"); // Unchanged
    }

    #[tokio::test]
    async fn test_payment_lifecycle() {
        let repo = setup_test_repo().await;
        let created = repo.create(&test_user("Grace Hopper", "ghopp001")).await.unwrap();
        assert_eq!(created.membership_status, MembershipStatus::InProgress);

        repo.set_payment_verification(created.id, "abc123key")
            .await
            .unwrap();
        repo.set_checkout_id(created.id, 991122).await.unwrap();

        let pending = repo
            .get_by_verification_key("abc123key")
            .await
            .unwrap()
            .expect("User should be findable by key");
        assert_eq!(pending.id, created.id);
        assert_eq!(pending.payment_checkout_id, Some(991122));

        let paid_on = Utc::now();
        repo.mark_paid(created.id, paid_on).await.unwrap();

        let paid = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(paid.membership_status, MembershipStatus::Paid);
        assert!(paid.membership_paid_on.is_some());
        assert!(paid.member_since.is_some());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let repo = setup_test_repo().await;
        let created = repo.create(&test_user("Grace Hopper", "ghopp001")).await.unwrap();

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_all_ids() {
        let repo = setup_test_repo().await;
        repo.create(&test_user("A", "a001")).await.unwrap();
        repo.create(&test_user("B", "b001")).await.unwrap();

        let ids = repo.all_ids().await.unwrap();
        assert_eq!(ids.len(), 2);
    }
}
