//! User model
//!
//! The User entity carries both identity (name, netid, email) and the
//! membership/payment lifecycle state (role, membership status, payment
//! timestamps, checkout id, captured signature).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered member of the organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Full name
    pub name: String,
    /// Campus NetID (unique)
    pub netid: String,
    /// Email address (unique)
    pub email: String,
    /// Authorization role
    pub role: MemberRole,
    /// Whether the user completed registration as a member
    pub member: bool,
    /// When the user became a member
    pub member_since: Option<DateTime<Utc>>,
    /// Dues-payment lifecycle state
    pub membership_status: MembershipStatus,
    /// When the current membership was paid
    pub membership_paid_on: Option<DateTime<Utc>>,
    /// Markdown self-description
    pub description: Option<String>,
    /// Rendered self-description
    pub description_html: Option<String>,
    /// Class standing (freshman, soph, junior, senior, alum, grad, faculty)
    pub standing: String,
    /// Declared major
    pub major: String,
    /// T-shirt size
    pub shirt_size: String,
    /// Pending payment verification key, set when a checkout is initiated
    #[serde(skip_serializing)]
    pub payment_verification: Option<String>,
    /// Checkout id assigned by the payment gateway
    pub payment_checkout_id: Option<i64>,
    /// Signature image captured at registration (PNG data URL)
    #[serde(skip_serializing)]
    pub signature: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == MemberRole::Admin
    }

    /// Check if the user is at least a publisher
    pub fn is_publisher(&self) -> bool {
        matches!(self.role, MemberRole::Admin | MemberRole::Publisher)
    }

    /// Check if the user's dues are currently paid
    pub fn is_paid(&self) -> bool {
        self.membership_status == MembershipStatus::Paid
    }

    /// Gravatar URL for the user's email
    pub fn gravatar_url(&self) -> String {
        let digest = md5::compute(self.email.trim().to_lowercase().as_bytes());
        format!("https://www.gravatar.com/avatar/{:x}?d=identicon", digest)
    }
}

/// Authorization role.
///
/// Admins run the back-office, publishers may author posts, members are
/// regular users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Administrator - full access
    Admin,
    /// Publisher - can author posts
    Publisher,
    /// Regular member
    Member,
}

impl Default for MemberRole {
    fn default() -> Self {
        Self::Member
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRole::Admin => write!(f, "admin"),
            MemberRole::Publisher => write!(f, "publisher"),
            MemberRole::Member => write!(f, "member"),
        }
    }
}

impl FromStr for MemberRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(MemberRole::Admin),
            "publisher" => Ok(MemberRole::Publisher),
            "member" => Ok(MemberRole::Member),
            _ => Err(anyhow::anyhow!("Invalid member role: {}", s)),
        }
    }
}

/// Dues-payment lifecycle state.
///
/// Registration puts a user into `InProgress`; a verified payment moves them
/// to `Paid`; a lapsed year moves them to `Unpaid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MembershipStatus {
    /// Never registered as a member
    Unregistered,
    /// Registered, payment not yet received
    InProgress,
    /// Dues paid for the current year
    Paid,
    /// Previously paid, not renewed
    Unpaid,
}

impl Default for MembershipStatus {
    fn default() -> Self {
        Self::Unregistered
    }
}

impl MembershipStatus {
    /// Database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Unregistered => "unregistered",
            MembershipStatus::InProgress => "in-progress",
            MembershipStatus::Paid => "paid",
            MembershipStatus::Unpaid => "unpaid",
        }
    }

    /// Parse from database string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unregistered" => Some(MembershipStatus::Unregistered),
            "in-progress" => Some(MembershipStatus::InProgress),
            "paid" => Some(MembershipStatus::Paid),
            "unpaid" => Some(MembershipStatus::Unpaid),
            _ => None,
        }
    }

    /// Human-readable label shown on profiles and reports
    pub fn label(&self) -> &'static str {
        match self {
            MembershipStatus::Unregistered => "Unregistered",
            MembershipStatus::InProgress => "In Progress",
            MembershipStatus::Paid => "Official",
            MembershipStatus::Unpaid => "Unrenewed",
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for registering a new user
#[derive(Debug, Clone)]
pub struct RegisterUserInput {
    pub name: String,
    pub netid: String,
    pub email: String,
    pub standing: String,
    pub major: String,
    pub shirt_size: String,
    /// Markdown self-description (optional)
    pub description: Option<String>,
    /// Signature image as a PNG data URL
    pub signature: String,
}

/// Input for updating a user's profile
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub netid: Option<String>,
    pub email: Option<String>,
    pub standing: Option<String>,
    pub major: Option<String>,
    pub shirt_size: Option<String>,
    pub description: Option<String>,
    pub role: Option<MemberRole>,
    pub membership_status: Option<MembershipStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(role: MemberRole) -> User {
        let now = Utc::now();
        User {
            id: 1,
            name: "Ada Lovelace".to_string(),
            netid: "alove001".to_string(),
            email: "Ada.Lovelace@Example.EDU ".to_string(),
            role,
            member: true,
            member_since: Some(now),
            membership_status: MembershipStatus::InProgress,
            membership_paid_on: None,
            description: None,
            description_html: None,
            standing: "senior".to_string(),
            major: "CS".to_string(),
            shirt_size: "M".to_string(),
            payment_verification: None,
            payment_checkout_id: None,
            signature: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_checks() {
        assert!(test_user(MemberRole::Admin).is_admin());
        assert!(test_user(MemberRole::Admin).is_publisher());
        assert!(test_user(MemberRole::Publisher).is_publisher());
        assert!(!test_user(MemberRole::Publisher).is_admin());
        assert!(!test_user(MemberRole::Member).is_publisher());
    }

    #[test]
    fn test_role_roundtrip() {
        assert_eq!(MemberRole::from_str("admin").unwrap(), MemberRole::Admin);
        assert_eq!(MemberRole::from_str("ADMIN").unwrap(), MemberRole::Admin);
        assert_eq!(
            MemberRole::from_str("publisher").unwrap(),
            MemberRole::Publisher
        );
        assert!(MemberRole::from_str("superuser").is_err());
        assert_eq!(MemberRole::Member.to_string(), "member");
    }

    #[test]
    fn test_membership_status_roundtrip() {
        for status in [
            MembershipStatus::Unregistered,
            MembershipStatus::InProgress,
            MembershipStatus::Paid,
            MembershipStatus::Unpaid,
        ] {
            assert_eq!(MembershipStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MembershipStatus::parse("expired"), None);
    }

    #[test]
    fn test_membership_status_labels() {
        assert_eq!(MembershipStatus::Paid.label(), "Official");
        assert_eq!(MembershipStatus::Unpaid.label(), "Unrenewed");
        assert_eq!(MembershipStatus::InProgress.label(), "In Progress");
    }

    #[test]
    fn test_gravatar_url_normalizes_email() {
        // Gravatar hashes the trimmed, lowercased address
        let user = test_user(MemberRole::Member);
        let expected = format!("{:x}", md5::compute(b"ada.lovelace@example.edu"));
        assert!(user.gravatar_url().contains(&expected));
    }
}
