//! Post model
//!
//! This module provides:
//! - `Post` entity representing a published article
//! - Input types for creating and updating posts
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity.
///
/// A post always belongs to exactly one category and one author; tags are
/// associated through the `post_tags` join table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug derived from the title
    pub slug: String,
    /// Post title
    pub title: String,
    /// Markdown body
    pub body: String,
    /// Rendered HTML body
    pub body_html: String,
    /// Author user ID
    pub author_id: i64,
    /// Category ID
    pub category_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new post
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    /// URL-friendly slug; derived from the title when empty
    pub slug: String,
    /// Post title
    pub title: String,
    /// Markdown body
    pub body: String,
    /// Rendered HTML body (filled in by the service)
    pub body_html: Option<String>,
    /// Author user ID
    pub author_id: i64,
    /// Category ID
    pub category_id: i64,
}

/// Input for updating an existing post
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub body_html: Option<String>,
    pub category_id: Option<i64>,
}

impl UpdatePostInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_category_id(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.slug.is_some()
            || self.title.is_some()
            || self.body.is_some()
            || self.body_html.is_some()
            || self.category_id.is_some()
    }
}

/// Sort key vocabulary for post listings.
///
/// The wire tokens are validated at the request boundary; the resolver only
/// maps known keys to ORDER BY expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Creation time, newest first (default)
    Recency,
    /// Creation time, oldest first
    Created,
    /// Post title
    Title,
    /// Category slug
    Category,
    /// Author name
    Author,
}

impl Default for SortKey {
    fn default() -> Self {
        Self::Recency
    }
}

impl SortKey {
    /// Parse a sort key from its wire token
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "recency" => Some(SortKey::Recency),
            "created" => Some(SortKey::Created),
            "title" => Some(SortKey::Title),
            "category" => Some(SortKey::Category),
            "author" => Some(SortKey::Author),
            _ => None,
        }
    }

    /// Wire token for this key
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Recency => "recency",
            SortKey::Created => "created",
            SortKey::Title => "title",
            SortKey::Category => "category",
            SortKey::Author => "author",
        }
    }

    /// ORDER BY expression over the search query's aliases
    /// (`p` = posts, `c` = categories, `u` = users)
    pub fn as_order_by(&self) -> &'static str {
        match self {
            SortKey::Recency => "p.created_at DESC",
            SortKey::Created => "p.created_at ASC",
            SortKey::Title => "p.title ASC",
            SortKey::Category => "c.slug ASC",
            SortKey::Author => "u.name ASC",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Recency | SortKey::Created => "Recency",
            SortKey::Title => "Post Title",
            SortKey::Category => "Category Name",
            SortKey::Author => "Author Name",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fully composed post filter.
///
/// Every dimension is concrete by the time this struct exists: the composer
/// fills absent dimensions with the full id set of the dimension's table, so
/// the query always carries all three predicates plus the text match.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Free-text term matched against title and rendered body (may be empty)
    pub text: String,
    /// Category ids to match (OR within the set)
    pub category_ids: Vec<i64>,
    /// Author ids to match (OR within the set)
    pub author_ids: Vec<i64>,
    /// Tag ids to match (a post qualifies with any of them)
    pub tag_ids: Vec<i64>,
    /// Resolved sort order
    pub order: SortKey,
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        ((self.page.saturating_sub(1)) * self.per_page) as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        ((self.total as u32) + self.per_page - 1) / self.per_page
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params() {
        let params = ListParams::new(1, 10);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), 10);

        let params = ListParams::new(3, 5);
        assert_eq!(params.offset(), 10);
        assert_eq!(params.limit(), 5);

        // Page 0 becomes 1, per_page clamps to 100
        let params = ListParams::new(0, 200);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
    }

    #[test]
    fn test_paged_result() {
        let params = ListParams::new(1, 10);
        let result = PagedResult::new(vec![1, 2, 3, 4, 5], 25, &params);

        assert_eq!(result.len(), 5);
        assert_eq!(result.total_pages(), 3);
        assert!(result.has_next());
        assert!(!result.has_prev());

        let params = ListParams::new(3, 10);
        let result = PagedResult::new(vec![21, 22, 23, 24, 25], 25, &params);
        assert!(!result.has_next());
        assert!(result.has_prev());
    }

    #[test]
    fn test_update_input_has_changes() {
        assert!(!UpdatePostInput::new().has_changes());
        assert!(UpdatePostInput::new()
            .with_title("New".to_string())
            .has_changes());
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!(SortKey::parse("recency"), Some(SortKey::Recency));
        assert_eq!(SortKey::parse("TITLE"), Some(SortKey::Title));
        assert_eq!(SortKey::parse("category"), Some(SortKey::Category));
        assert_eq!(SortKey::parse("author"), Some(SortKey::Author));
        assert_eq!(SortKey::parse("created"), Some(SortKey::Created));
        assert_eq!(SortKey::parse("id"), None);
        assert_eq!(SortKey::parse("p.title; DROP TABLE posts"), None);
    }

    #[test]
    fn test_sort_key_order_by() {
        assert_eq!(SortKey::default().as_order_by(), "p.created_at DESC");
        assert_eq!(SortKey::Title.as_order_by(), "p.title ASC");
        assert_eq!(SortKey::Category.as_order_by(), "c.slug ASC");
        assert_eq!(SortKey::Author.as_order_by(), "u.name ASC");
    }
}
