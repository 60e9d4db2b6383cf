//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity. Every post belongs to exactly one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Category title
    pub title: String,
    /// URL-friendly slug
    pub slug: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new category
#[derive(Debug, Clone)]
pub struct CreateCategoryInput {
    /// Category title
    pub title: String,
    /// URL-friendly slug; derived from the title when empty
    pub slug: String,
}
