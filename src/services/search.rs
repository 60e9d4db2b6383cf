//! Post search: parameter parsing, filter composition, sort resolution
//!
//! The `/articles` listing accepts optional filter parameters: free text
//! (`q`), category ids (`c`), author ids (`a`), tag ids (`t`) and a sort key
//! (`order`). Each id parameter is a comma-separated list; ids within a
//! dimension combine disjunctively, dimensions combine conjunctively.
//!
//! When a dimension parameter is absent the composer enumerates the full
//! current id set for that dimension instead of omitting the predicate, so
//! the rendered query always carries all three dimension clauses. A request
//! with no parameters at all bypasses composition entirely and lists posts
//! by recency.

use crate::db::repositories::{CategoryRepository, TagRepository, UserRepository};
use crate::models::{PostFilter, SortKey};
use anyhow::Context;
use std::sync::Arc;

/// Raw search parameters as they arrive on the query string
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    /// Free-text term (`q`)
    pub q: Option<String>,
    /// Comma-separated category ids (`c`)
    pub categories: Option<String>,
    /// Comma-separated author ids (`a`)
    pub authors: Option<String>,
    /// Comma-separated tag ids (`t`)
    pub tags: Option<String>,
    /// Sort key token (`order`)
    pub order: Option<String>,
}

impl SearchParams {
    /// True when no filter parameter is present at all.
    ///
    /// The unfiltered request is served as a plain recency listing without
    /// going through the composer.
    pub fn is_empty(&self) -> bool {
        self.q.is_none()
            && self.categories.is_none()
            && self.authors.is_none()
            && self.tags.is_none()
            && self.order.is_none()
    }
}

/// Error types for search composition
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An id list failed to parse (Request failure, HTTP 400)
    #[error("Malformed id list: {0:?}")]
    MalformedIdList(String),

    /// The sort key is not in the fixed vocabulary
    #[error("Unknown sort key: {0:?}")]
    UnknownSortKey(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Parse a comma-separated id list.
///
/// Malformed entries are a request-level failure, not silently dropped.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, SearchError> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| SearchError::MalformedIdList(raw.to_string()))
        })
        .collect()
}

/// Resolve a sort key token, defaulting to recency when absent.
pub fn resolve_sort_key(raw: Option<&str>) -> Result<SortKey, SearchError> {
    match raw {
        None => Ok(SortKey::default()),
        Some(token) if token.is_empty() => Ok(SortKey::default()),
        Some(token) => {
            SortKey::parse(token).ok_or_else(|| SearchError::UnknownSortKey(token.to_string()))
        }
    }
}

/// Composes raw request parameters into a concrete `PostFilter`.
///
/// Absent dimensions are filled with every id currently in the dimension's
/// table, so the downstream query shape does not depend on which parameters
/// were supplied.
pub struct FilterComposer {
    category_repo: Arc<dyn CategoryRepository>,
    user_repo: Arc<dyn UserRepository>,
    tag_repo: Arc<dyn TagRepository>,
}

impl FilterComposer {
    /// Create a new filter composer
    pub fn new(
        category_repo: Arc<dyn CategoryRepository>,
        user_repo: Arc<dyn UserRepository>,
        tag_repo: Arc<dyn TagRepository>,
    ) -> Self {
        Self {
            category_repo,
            user_repo,
            tag_repo,
        }
    }

    /// Compose a filter from raw parameters.
    pub async fn compose(&self, params: &SearchParams) -> Result<PostFilter, SearchError> {
        let text = params.q.clone().unwrap_or_default();

        let category_ids = match &params.categories {
            Some(raw) => parse_id_list(raw)?,
            None => self
                .category_repo
                .all_ids()
                .await
                .context("Failed to enumerate category ids")?,
        };

        let author_ids = match &params.authors {
            Some(raw) => parse_id_list(raw)?,
            None => self
                .user_repo
                .all_ids()
                .await
                .context("Failed to enumerate author ids")?,
        };

        let tag_ids = match &params.tags {
            Some(raw) => parse_id_list(raw)?,
            None => self
                .tag_repo
                .all_ids()
                .await
                .context("Failed to enumerate tag ids")?,
        };

        let order = resolve_sort_key(params.order.as_deref())?;

        Ok(PostFilter {
            text,
            category_ids,
            author_ids,
            tag_ids,
            order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxTagRepository, SqlxUserRepository, TagRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreateCategoryInput;
    use proptest::prelude::*;

    #[test]
    fn test_parse_id_list_valid() {
        assert_eq!(parse_id_list("1").unwrap(), vec![1]);
        assert_eq!(parse_id_list("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list(" 4 , 5 ").unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_parse_id_list_malformed() {
        assert!(matches!(
            parse_id_list("1,abc,3"),
            Err(SearchError::MalformedIdList(_))
        ));
        assert!(parse_id_list("").is_err());
        assert!(parse_id_list("1,,3").is_err());
        assert!(parse_id_list("1;2").is_err());
    }

    #[test]
    fn test_resolve_sort_key() {
        assert_eq!(resolve_sort_key(None).unwrap(), SortKey::Recency);
        assert_eq!(resolve_sort_key(Some("")).unwrap(), SortKey::Recency);
        assert_eq!(resolve_sort_key(Some("title")).unwrap(), SortKey::Title);
        assert!(matches!(
            resolve_sort_key(Some("bogus")),
            Err(SearchError::UnknownSortKey(_))
        ));
    }

    #[test]
    fn test_search_params_is_empty() {
        assert!(SearchParams::default().is_empty());
        assert!(!SearchParams {
            q: Some("term".to_string()),
            ..Default::default()
        }
        .is_empty());
        assert!(!SearchParams {
            order: Some("title".to_string()),
            ..Default::default()
        }
        .is_empty());
    }

    async fn setup_composer() -> (
        FilterComposer,
        Arc<SqlxCategoryRepository>,
        Arc<SqlxUserRepository>,
        Arc<SqlxTagRepository>,
    ) {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to migrate");
        let category_repo = Arc::new(SqlxCategoryRepository::new(pool.clone()));
        let user_repo = Arc::new(SqlxUserRepository::new(pool.clone()));
        let tag_repo = Arc::new(SqlxTagRepository::new(pool.clone()));
        let composer = FilterComposer::new(
            category_repo.clone(),
            user_repo.clone(),
            tag_repo.clone(),
        );
        (composer, category_repo, user_repo, tag_repo)
    }

    #[tokio::test]
    async fn test_compose_absent_dimensions_enumerate_all_ids() {
        use crate::db::repositories::CategoryRepository;
        use crate::db::repositories::user::test_user;

        let (composer, category_repo, user_repo, tag_repo) = setup_composer().await;

        let cat = category_repo
            .create(&CreateCategoryInput {
                title: "News".to_string(),
                slug: "news".to_string(),
            })
            .await
            .unwrap();
        let user = user_repo.create(&test_user("Author", "auth001")).await.unwrap();
        let tag = tag_repo.get_or_create("rust").await.unwrap();

        let params = SearchParams {
            q: Some("anything".to_string()),
            ..Default::default()
        };
        let filter = composer.compose(&params).await.unwrap();

        // Absent dimensions carry the full current id sets
        assert_eq!(filter.category_ids, vec![cat.id]);
        assert_eq!(filter.author_ids, vec![user.id]);
        assert_eq!(filter.tag_ids, vec![tag.id]);
        assert_eq!(filter.text, "anything");
        assert_eq!(filter.order, SortKey::Recency);
    }

    #[tokio::test]
    async fn test_compose_present_dimension_uses_requested_ids() {
        let (composer, _category_repo, _user_repo, _tag_repo) = setup_composer().await;

        let params = SearchParams {
            categories: Some("7,9".to_string()),
            order: Some("author".to_string()),
            ..Default::default()
        };
        let filter = composer.compose(&params).await.unwrap();

        assert_eq!(filter.category_ids, vec![7, 9]);
        // Absent dimensions over empty tables compose to empty sets
        assert!(filter.author_ids.is_empty());
        assert!(filter.tag_ids.is_empty());
        assert_eq!(filter.order, SortKey::Author);
    }

    #[tokio::test]
    async fn test_compose_rejects_malformed_ids() {
        let (composer, _c, _u, _t) = setup_composer().await;

        let params = SearchParams {
            tags: Some("1,x".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            composer.compose(&params).await,
            Err(SearchError::MalformedIdList(_))
        ));
    }

    proptest! {
        #[test]
        fn property_parse_id_list_roundtrip(ids in proptest::collection::vec(0i64..1_000_000, 1..10)) {
            let raw = ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",");
            let parsed = parse_id_list(&raw).unwrap();
            prop_assert_eq!(parsed, ids);
        }

        #[test]
        fn property_parse_id_list_rejects_non_numeric(s in "[a-zA-Z]{1,8}") {
            prop_assert!(parse_id_list(&s).is_err());
        }

        #[test]
        fn property_sort_key_roundtrip(key in prop_oneof![
            Just(SortKey::Recency),
            Just(SortKey::Created),
            Just(SortKey::Title),
            Just(SortKey::Category),
            Just(SortKey::Author),
        ]) {
            prop_assert_eq!(resolve_sort_key(Some(key.as_str())).unwrap(), key);
        }
    }
}
