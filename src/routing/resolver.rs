//! Slug resolution.
//!
//! The first non-empty path segment is the slug; whatever follows,
//! re-joined with a leading slash, is the subpath forwarded to the
//! backend. Lookup is a single keyed read against the mapping store.
//! An unmapped slug is reported distinctly from a store transport
//! failure: the former becomes a 404, the latter a 500.

use std::sync::Arc;

use crate::error::{ProxyError, ProxyResult};
use crate::store::{KvStore, SlugMapping};

/// Decomposed request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugPath {
    pub slug: String,
    /// Empty string for `/{slug}` and `/{slug}/`; otherwise starts with `/`.
    pub subpath: String,
}

/// A slug path with its resolved mapping.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub slug: String,
    pub subpath: String,
    pub mapping: SlugMapping,
}

/// Split a request path into slug and subpath.
/// Returns `None` when the path has no non-empty segment.
pub fn split_slug_path(path: &str) -> Option<SlugPath> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let slug = segments.next()?.to_string();

    let rest: Vec<&str> = segments.collect();
    let subpath = if rest.is_empty() {
        String::new()
    } else {
        format!("/{}", rest.join("/"))
    };

    Some(SlugPath { slug, subpath })
}

/// Resolves slugs against the mapping store.
#[derive(Clone)]
pub struct SlugResolver {
    store: Arc<dyn KvStore>,
}

impl SlugResolver {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Resolve a request path to its tenant mapping.
    pub async fn resolve(&self, path: &str) -> ProxyResult<ResolvedRoute> {
        let parts = split_slug_path(path).ok_or_else(|| ProxyError::SlugNotFound {
            slug: String::new(),
        })?;

        let mapping = self
            .store
            .get_mapping(&parts.slug)
            .await?
            .ok_or_else(|| ProxyError::SlugNotFound {
                slug: parts.slug.clone(),
            })?;

        Ok(ResolvedRoute {
            slug: parts.slug,
            subpath: parts.subpath,
            mapping,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    #[test]
    fn test_split_slug_only() {
        let parts = split_slug_path("/my-app").unwrap();
        assert_eq!(parts.slug, "my-app");
        assert_eq!(parts.subpath, "");
    }

    #[test]
    fn test_split_trailing_slash() {
        let parts = split_slug_path("/my-app/").unwrap();
        assert_eq!(parts.slug, "my-app");
        assert_eq!(parts.subpath, "");
    }

    #[test]
    fn test_split_deep_subpath() {
        let parts = split_slug_path("/my-app/static/css/style.css").unwrap();
        assert_eq!(parts.slug, "my-app");
        assert_eq!(parts.subpath, "/static/css/style.css");
    }

    #[test]
    fn test_split_empty_path() {
        assert!(split_slug_path("/").is_none());
        assert!(split_slug_path("").is_none());
    }

    #[tokio::test]
    async fn test_resolve_reports_not_found() {
        let store = Arc::new(MemoryStore::new());
        let resolver = SlugResolver::new(store);

        let err = resolver.resolve("/missing-app").await.unwrap_err();
        match err {
            ProxyError::SlugNotFound { slug } => assert_eq!(slug, "missing-app"),
            other => panic!("expected SlugNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_returns_mapping_and_subpath() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_mapping(&SlugMapping {
                slug: "my-app".into(),
                backend_base_url: "https://backend.example/app/123/exec".into(),
                app_name: "My Test App".into(),
                created_at: Utc::now(),
                access_count: 0,
            })
            .await
            .unwrap();

        let resolver = SlugResolver::new(store);
        let route = resolver.resolve("/my-app/wardeninit").await.unwrap();
        assert_eq!(route.slug, "my-app");
        assert_eq!(route.subpath, "/wardeninit");
        assert_eq!(
            route.mapping.backend_base_url,
            "https://backend.example/app/123/exec"
        );
    }
}
