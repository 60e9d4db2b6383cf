//! User service
//!
//! Registration, profile management and session handling. There are no
//! local passwords: identity is established by the OAuth provider, so
//! sessions are created for users found by their verified email.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{
    ListParams, MemberRole, MembershipStatus, PagedResult, RegisterUserInput, Session,
    UpdateUserInput, User,
};
use crate::services::markdown::MarkdownRenderer;
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Session lifetime in days
const SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// User not found
    #[error("User not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// NetID or email already registered
    #[error("NetID or email already registered: {0}")]
    UserExists(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// User service
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    markdown: MarkdownRenderer,
}

impl UserService {
    /// Create a new user service
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        markdown: MarkdownRenderer,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            markdown,
        }
    }

    /// Register a new member.
    ///
    /// The signature must already be validated (see `services::signature`).
    /// Registration makes the user a member with status `in-progress`.
    pub async fn register(&self, input: RegisterUserInput) -> Result<User, UserServiceError> {
        if input.name.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "Name is required".to_string(),
            ));
        }
        if input.netid.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "NetID is required".to_string(),
            ));
        }
        if input.email.trim().is_empty() || !input.email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "A valid email is required".to_string(),
            ));
        }

        if self
            .user_repo
            .find_conflict(&input.netid, &input.email, 0)
            .await
            .context("Failed to check registration conflict")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(input.netid));
        }

        let description_html = input
            .description
            .as_deref()
            .map(|d| self.markdown.render(d));

        let now = Utc::now();
        let user = User {
            id: 0,
            name: input.name,
            netid: input.netid,
            email: input.email,
            role: MemberRole::Member,
            member: true,
            member_since: Some(now),
            membership_status: MembershipStatus::InProgress,
            membership_paid_on: None,
            description: input.description,
            description_html,
            standing: input.standing,
            major: input.major,
            shirt_size: input.shirt_size,
            payment_verification: None,
            payment_checkout_id: None,
            signature: Some(input.signature),
            created_at: now,
            updated_at: now,
        };

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        Ok(created)
    }

    /// Create a session for a user authenticated by the OAuth provider.
    pub async fn login_by_email(&self, email: &str) -> Result<(User, Session), UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to look up user by email")?
            .ok_or_else(|| UserServiceError::NotFound(email.to_string()))?;

        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    /// Create a new session for a user
    pub async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(SESSION_EXPIRATION_DAYS),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }

    /// Validate a session token, returning the user when the session is live.
    ///
    /// Expired sessions are removed on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        Ok(self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?)
    }

    /// Destroy a session (logout)
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Update a user's own profile.
    ///
    /// Changing netid/email to another user's identity is rejected.
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        let existing = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| UserServiceError::NotFound(user_id.to_string()))?;

        let netid = input.netid.as_ref().unwrap_or(&existing.netid);
        let email = input.email.as_ref().unwrap_or(&existing.email);

        if self
            .user_repo
            .find_conflict(netid, email, user_id)
            .await
            .context("Failed to check profile conflict")?
            .is_some()
        {
            return Err(UserServiceError::ValidationError(
                "NetID/email already belongs to another user".to_string(),
            ));
        }

        let description_html = input.description.as_deref().map(|d| self.markdown.render(d));

        let updated = self
            .user_repo
            .update(user_id, &input)
            .await
            .context("Failed to update user")?;

        if let Some(html) = description_html {
            self.user_repo
                .set_description_html(user_id, Some(&html))
                .await
                .context("Failed to store rendered description")?;
        }

        Ok(updated)
    }

    /// Get user by netid
    pub async fn get_by_netid(&self, netid: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_netid(netid)
            .await
            .context("Failed to get user by netid")?)
    }

    /// Get user by id
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by id")?)
    }

    /// All users ordered by name (member roster)
    pub async fn list_all(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self
            .user_repo
            .list_all()
            .await
            .context("Failed to list users")?)
    }

    /// Users with at least publisher role, ordered by name
    pub async fn list_publishers(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self
            .user_repo
            .list_publishers()
            .await
            .context("Failed to list publishers")?)
    }

    /// Admin text search across name, email, netid, standing and major
    pub async fn admin_search(
        &self,
        term: &str,
        params: &ListParams,
    ) -> Result<PagedResult<User>, UserServiceError> {
        let items = self
            .user_repo
            .search(term, params.offset(), params.limit())
            .await
            .context("Failed to search users")?;
        let total = self
            .user_repo
            .count_search(term)
            .await
            .context("Failed to count user search")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// Admin update (may change role and membership status)
    pub async fn admin_update(
        &self,
        user_id: i64,
        input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        self.update_profile(user_id, input).await
    }

    /// Delete a user and their sessions
    pub async fn delete(&self, user_id: i64) -> Result<(), UserServiceError> {
        self.user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| UserServiceError::NotFound(user_id.to_string()))?;

        self.session_repo
            .delete_for_user(user_id)
            .await
            .context("Failed to delete user sessions")?;
        self.user_repo
            .delete(user_id)
            .await
            .context("Failed to delete user")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to migrate");

        UserService::new(
            Arc::new(SqlxUserRepository::new(pool.clone())),
            Arc::new(SqlxSessionRepository::new(pool.clone())),
            MarkdownRenderer::new(),
        )
    }

    fn register_input(netid: &str) -> RegisterUserInput {
        RegisterUserInput {
            name: "Grace Hopper".to_string(),
            netid: netid.to_string(),
            email: format!("{}@example.edu", netid),
            standing: "senior".to_string(),
            major: "CS".to_string(),
            shirt_size: "M".to_string(),
            description: Some("I like **compilers**".to_string()),
            signature: "data:image/png;base64,iVBORw0KGgo=".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_in_progress_member() {
        let service = setup().await;

        let user = service.register(register_input("ghopp001")).await.unwrap();

        assert!(user.id > 0);
        assert!(user.member);
        assert_eq!(user.membership_status, MembershipStatus::InProgress);
        assert_eq!(user.role, MemberRole::Member);
        assert!(user.member_since.is_some());
        assert!(user
            .description_html
            .as_deref()
            .unwrap()
            .contains("<strong>compilers</strong>"));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let service = setup().await;

        service.register(register_input("ghopp001")).await.unwrap();

        let result = service.register(register_input("ghopp001")).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));

        // Same email under a different netid is also a conflict
        let mut input = register_input("other001");
        input.email = "ghopp001@example.edu".to_string();
        let result = service.register(input).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_validates_fields() {
        let service = setup().await;

        let mut input = register_input("x001");
        input.name = "  ".to_string();
        assert!(matches!(
            service.register(input).await,
            Err(UserServiceError::ValidationError(_))
        ));

        let mut input = register_input("x001");
        input.email = "not-an-email".to_string();
        assert!(matches!(
            service.register(input).await,
            Err(UserServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_login_by_email_and_session_validation() {
        let service = setup().await;
        let user = service.register(register_input("ghopp001")).await.unwrap();

        let (logged_in, session) = service
            .login_by_email("ghopp001@example.edu")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let validated = service
            .validate_session(&session.id)
            .await
            .unwrap()
            .expect("Session should be valid");
        assert_eq!(validated.id, user.id);

        assert!(service.validate_session("bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let service = setup().await;
        let result = service.login_by_email("stranger@example.edu").await;
        assert!(matches!(result, Err(UserServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let service = setup().await;
        service.register(register_input("ghopp001")).await.unwrap();
        let (_, session) = service
            .login_by_email("ghopp001@example.edu")
            .await
            .unwrap();

        service.logout(&session.id).await.unwrap();
        assert!(service
            .validate_session(&session.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_profile_rejects_identity_theft() {
        let service = setup().await;
        service.register(register_input("ghopp001")).await.unwrap();
        let victim = service.register(register_input("aturi001")).await.unwrap();

        // aturi001 tries to take ghopp001's netid
        let result = service
            .update_profile(
                victim.id,
                UpdateUserInput {
                    netid: Some("ghopp001".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(UserServiceError::ValidationError(_))));

        // Keeping one's own identity is fine
        let updated = service
            .update_profile(
                victim.id,
                UpdateUserInput {
                    major: Some("CE".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.major, "CE");
    }

    #[tokio::test]
    async fn test_admin_search_paged() {
        let service = setup().await;
        for netid in ["a001", "b001", "c001"] {
            let mut input = register_input(netid);
            input.name = format!("User {}", netid);
            service.register(input).await.unwrap();
        }

        let result = service
            .admin_search("example.edu", &ListParams::new(1, 2))
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.total, 3);
    }

    #[tokio::test]
    async fn test_delete_removes_user_and_sessions() {
        let service = setup().await;
        let user = service.register(register_input("ghopp001")).await.unwrap();
        let (_, session) = service
            .login_by_email("ghopp001@example.edu")
            .await
            .unwrap();

        service.delete(user.id).await.unwrap();
        assert!(service.get_by_id(user.id).await.unwrap().is_none());
        assert!(service
            .validate_session(&session.id)
            .await
            .unwrap()
            .is_none());

        let result = service.delete(user.id).await;
        assert!(matches!(result, Err(UserServiceError::NotFound(_))));
    }
}
