//! The ordered HTML rewrite pipeline.
//!
//! Six passes, applied in a fixed order, each idempotent and
//! non-destructive of the previous passes' output:
//!
//! 1. nonce extraction
//! 2. shim injection at the start of `<head>`
//! 3. origin-link normalization (absolute proxy links)
//! 4. relative-link normalization (root-relative references)
//! 5. attribute-targeted pass (`src`, `href`, `action`, `data-url`,
//!    `data-href`)
//! 6. bootstrap-call deferral
//!
//! Earlier cascading regex replacements over the whole document proved
//! fragile and order-dependent; each pass here is a discrete stage with
//! its own unit tests.

use regex::Regex;

use crate::rewrite::{shim, RewriteContext};

/// Run the full pipeline over one document.
pub fn rewrite_document(html: &str, ctx: &RewriteContext) -> String {
    let nonce = extract_nonce(html);
    let out = inject_shim(html, ctx, nonce.as_deref());
    let out = rewrite_origin_links(&out, ctx);
    let out = rewrite_root_relative(&out, ctx);
    let out = rewrite_attributes(&out, ctx);
    defer_bootstrap_calls(&out, ctx)
}

/// Stage 1: find a CSP nonce already present in the document, so injected
/// script can reuse it instead of being blocked by the backend's policy.
pub fn extract_nonce(html: &str) -> Option<String> {
    let re = Regex::new(r#"nonce=["']([^"']+)["']"#).ok()?;
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Stage 2: insert the routing shim at the very start of `<head>`.
/// Falls back to prepending when the document has no head tag.
pub fn inject_shim(html: &str, ctx: &RewriteContext, nonce: Option<&str>) -> String {
    if html.contains("__slugProxyBoot") {
        return html.to_string();
    }
    let tag = shim::routing_shim(ctx, nonce);

    // `<head(\s...)?>` and not `<header>`.
    if let Ok(re) = Regex::new(r"(?i)<head(\s[^>]*)?>") {
        if let Some(m) = re.find(html) {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..m.end()]);
            out.push_str(&tag);
            out.push_str(&html[m.end()..]);
            return out;
        }
    }
    format!("{}{}", tag, html)
}

/// Stage 3: rewrite absolute links pointing at `proxy_origin/slug`.
///
/// Resource and API sub-paths go to the suffix-stripped backend base.
/// Root links (no path, bare `/`, or a bare query string) keep routing
/// through the proxy's entry: they become the backend's full entry URL
/// only on the outbound side, so the top-level page stays proxied.
pub fn rewrite_origin_links(html: &str, ctx: &RewriteContext) -> String {
    let pattern = format!(
        r#"{}/{}(/[^"'\s?<>]*)?(\?[^"'\s<>]*)?"#,
        regex::escape(&ctx.proxy_origin),
        regex::escape(&ctx.slug)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return html.to_string(),
    };

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for caps in re.captures_iter(html) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        // The slug must end at a delimiter; `/my-apple` is another slug.
        if matches!(
            html.as_bytes().get(whole.end()),
            Some(b) if b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_'
        ) {
            continue;
        }

        let path = caps.get(1).map_or("", |m| m.as_str());
        let query = caps.get(2).map_or("", |m| m.as_str());

        out.push_str(&html[last..whole.start()]);
        if !path.is_empty() && path != "/" {
            out.push_str(&ctx.stripped_base);
            out.push_str(path);
        } else {
            out.push_str(&ctx.entry_url);
        }
        out.push_str(query);
        last = whole.end();
    }
    out.push_str(&html[last..]);
    out
}

/// Stage 4: rewrite remaining quoted root-relative references (single
/// leading slash, not protocol-relative) to the suffix-stripped base.
pub fn rewrite_root_relative(html: &str, ctx: &RewriteContext) -> String {
    let re = match Regex::new(r#"(["'])(/[A-Za-z0-9_][^"'\s<>]*)"#) {
        Ok(re) => re,
        Err(_) => return html.to_string(),
    };
    re.replace_all(html, |caps: &regex::Captures| {
        let quote = caps.get(1).map_or("", |m| m.as_str());
        let path = caps.get(2).map_or("", |m| m.as_str());
        format!("{}{}{}", quote, ctx.stripped_base, path)
    })
    .into_owned()
}

/// Apply the absolute/relative rules to one attribute value.
/// `None` means the value is left as written.
fn rewrite_target_value(value: &str, ctx: &RewriteContext) -> Option<String> {
    let prefix = format!("{}/{}", ctx.proxy_origin, ctx.slug);
    if let Some(rest) = value.strip_prefix(&prefix) {
        if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')) {
            return None; // longer slug, not ours
        }
        let (path, query) = match rest.find('?') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };
        if !path.is_empty() && path != "/" {
            return Some(format!("{}{}{}", ctx.stripped_base, path, query));
        }
        return Some(format!("{}{}", ctx.entry_url, query));
    }

    let bytes = value.as_bytes();
    if value.len() > 1 && bytes[0] == b'/' && bytes[1] != b'/' {
        return Some(format!("{}{}", ctx.stripped_base, value));
    }
    None
}

/// Stage 5: a narrower, attribute-targeted pass catching references the
/// generic passes missed.
pub fn rewrite_attributes(html: &str, ctx: &RewriteContext) -> String {
    let patterns = [
        r#"(?i)\b(src|href|action|data-url|data-href)\s*=\s*"([^"]*)""#,
        r#"(?i)\b(src|href|action|data-url|data-href)\s*=\s*'([^']*)'"#,
    ];

    let mut out = html.to_string();
    for (idx, pattern) in patterns.iter().enumerate() {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(_) => continue,
        };
        let quote = if idx == 0 { '"' } else { '\'' };
        out = re
            .replace_all(&out, |caps: &regex::Captures| {
                let attr = caps.get(1).map_or("", |m| m.as_str());
                let value = caps.get(2).map_or("", |m| m.as_str());
                match rewrite_target_value(value, ctx) {
                    Some(rewritten) => {
                        format!("{}={}{}{}", attr, quote, rewritten, quote)
                    }
                    None => caps.get(0).map_or(String::new(), |m| m.as_str().to_string()),
                }
            })
            .into_owned();
    }
    out
}

/// Stage 6: wrap direct calls to the platform bootstrap function in the
/// shim's bounded poll-and-retry guard. The shim runs earlier in document
/// order than the platform runtime loads, so the symbol may not exist yet
/// at call time.
pub fn defer_bootstrap_calls(html: &str, ctx: &RewriteContext) -> String {
    let pattern = format!(
        r#"(^|[^.\w$]){}\s*\(([^()]*)\)"#,
        regex::escape(&ctx.bootstrap_fn)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return html.to_string(),
    };

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for caps in re.captures_iter(html) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let lead = caps.get(1).map_or("", |m| m.as_str());
        let args = caps.get(2).map_or("", |m| m.as_str());

        // Skip declarations: `function wardenInit(...)`.
        let sym_start = whole.start() + lead.len();
        if html[..sym_start].trim_end().ends_with("function") {
            continue;
        }

        out.push_str(&html[last..whole.start()]);
        out.push_str(lead);
        out.push_str("__slugProxyBoot('");
        out.push_str(&ctx.bootstrap_fn);
        out.push_str("',function(){return window.");
        out.push_str(&ctx.bootstrap_fn);
        out.push('(');
        out.push_str(args);
        out.push_str(");})");
        last = whole.end();
    }
    out.push_str(&html[last..]);
    out
}
