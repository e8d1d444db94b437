//! Target-URL construction.
//!
//! The mapped backend base URL always ends in the fixed entry suffix
//! (the platform's execution path segment). The top-level page is served
//! from the full base URL; sub-path resources hang off the suffix-stripped
//! base instead:
//!
//! - `/{slug}`            -> `backendBaseUrl + query`
//! - `/{slug}/sub/path`   -> `strip(backendBaseUrl) + /sub/path + query`

/// The query parameter some edge routers use to carry the slug path into
/// the handler. Never forwarded to the backend.
const ROUTING_PARAM: &str = "slug";

/// Remove the internal routing parameter, keeping the rest of the query
/// string byte-for-byte as the client sent it.
pub fn filter_query(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    let kept: Vec<&str> = raw
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or(pair);
            key != ROUTING_PARAM
        })
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join("&"))
    }
}

/// Strip the fixed entry suffix from a backend base URL. A base that does
/// not carry the suffix is returned unchanged.
pub fn strip_entry_suffix<'a>(base: &'a str, entry_suffix: &str) -> &'a str {
    base.strip_suffix(entry_suffix).unwrap_or(base)
}

/// Build the outbound URL for a resolved route.
pub fn build_target_url(
    base: &str,
    entry_suffix: &str,
    subpath: &str,
    query: Option<&str>,
) -> String {
    let query = query.map(|q| format!("?{}", q)).unwrap_or_default();
    if subpath.is_empty() || subpath == "/" {
        format!("{}{}", base, query)
    } else {
        format!("{}{}{}", strip_entry_suffix(base, entry_suffix), subpath, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://backend.example/app/123/exec";

    #[test]
    fn test_empty_subpath_uses_full_base() {
        assert_eq!(build_target_url(BASE, "/exec", "", None), BASE);
        assert_eq!(
            build_target_url(BASE, "/exec", "", Some("x=1")),
            "https://backend.example/app/123/exec?x=1"
        );
    }

    #[test]
    fn test_subpath_strips_entry_suffix() {
        assert_eq!(
            build_target_url(BASE, "/exec", "/static/style.css", None),
            "https://backend.example/app/123/static/style.css"
        );
        assert_eq!(
            build_target_url(BASE, "/exec", "/wardeninit", Some("v=2")),
            "https://backend.example/app/123/wardeninit?v=2"
        );
    }

    #[test]
    fn test_bare_slash_subpath_is_top_level() {
        assert_eq!(build_target_url(BASE, "/exec", "/", Some("x=1")),
            "https://backend.example/app/123/exec?x=1");
    }

    #[test]
    fn test_base_without_suffix_is_left_alone() {
        assert_eq!(
            build_target_url("https://backend.example/app", "/exec", "/a", None),
            "https://backend.example/app/a"
        );
    }

    #[test]
    fn test_filter_query_drops_routing_param() {
        assert_eq!(filter_query(Some("slug=my-app")), None);
        assert_eq!(
            filter_query(Some("slug=my-app&x=1")),
            Some("x=1".to_string())
        );
        assert_eq!(
            filter_query(Some("x=1&slug=my-app&y=2")),
            Some("x=1&y=2".to_string())
        );
    }

    #[test]
    fn test_filter_query_keeps_everything_else_verbatim() {
        assert_eq!(
            filter_query(Some("a=%20b&empty&c=1")),
            Some("a=%20b&empty&c=1".to_string())
        );
        assert_eq!(filter_query(None), None);
    }

    #[test]
    fn test_filter_query_does_not_drop_prefixed_keys() {
        assert_eq!(
            filter_query(Some("slugged=1")),
            Some("slugged=1".to_string())
        );
    }
}
