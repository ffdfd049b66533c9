//! Static resource URL resolution.
//!
//! Maps logical resource paths referenced from templates (`staticURL`) to
//! deployment-specific URLs, so content can say `/style.css` while the
//! deployed site serves `/assets/css/style.css` — a deploy-time decision,
//! not a content decision.
//!
//! # Resolution order
//!
//! 1. Absolute URLs (anything with a scheme) pass through untouched.
//! 2. Exact (lower-cased) match in the `Resource_map` table.
//! 3. Root-relative paths fall back to a content-type prefix by extension:
//!    `.css` → `Css_path` (default `/css`), images → `Img_path` (default
//!    `/img`), `.js` → `Js_path` (default `/js`).
//! 4. Everything else is returned unchanged.
//!
//! The table is parsed from `site.Resource_map` exactly once, at build-context
//! construction — not lazily on first use — so concurrent page processing
//! reads an immutable structure.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

const DEFAULT_CSS_PREFIX: &str = "/css";
const DEFAULT_IMG_PREFIX: &str = "/img";
const DEFAULT_JS_PREFIX: &str = "/js";

const IMAGE_EXTENSIONS: [&str; 6] = [".png", ".jpg", ".jpeg", ".gif", ".ico", ".webp"];

/// RFC 3986 scheme: letter followed by letters/digits/`+`/`-`/`.`, then `:`.
static SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[A-Za-z][A-Za-z0-9+.-]*:").unwrap());

/// Immutable deploy-time resolution table, built once per build.
#[derive(Debug, Default)]
pub struct ResourceMap {
    table: HashMap<String, String>,
    css_prefix: String,
    img_prefix: String,
    js_prefix: String,
}

impl ResourceMap {
    /// Build the table from the site's configuration keys.
    ///
    /// `Resource_map` is a comma-separated list of `logical:deploy` pairs,
    /// split on the first colon. Malformed groups (no colon, empty key or
    /// value) are silently skipped — a partial map beats a failed build.
    pub fn from_site_config(other: &std::collections::BTreeMap<String, String>) -> Self {
        let mut table = HashMap::new();
        if let Some(raw) = other.get("Resource_map") {
            for group in raw.split(',') {
                let Some((key, value)) = group.split_once(':') else {
                    continue;
                };
                let key = key.trim_matches(' ');
                let value = value.trim_matches(' ');
                if key.is_empty() || value.is_empty() {
                    continue;
                }
                table.insert(key.to_lowercase(), value.to_string());
            }
        }
        let prefix = |key: &str, default: &str| {
            other.get(key).cloned().unwrap_or_else(|| default.to_string())
        };
        Self {
            table,
            css_prefix: prefix("Css_path", DEFAULT_CSS_PREFIX),
            img_prefix: prefix("Img_path", DEFAULT_IMG_PREFIX),
            js_prefix: prefix("Js_path", DEFAULT_JS_PREFIX),
        }
    }

    /// Resolve a logical resource path to its deployment URL.
    ///
    /// Malformed paths (embedded whitespace or control characters) are
    /// logged and returned unchanged — a broken reference in one template
    /// should not sink the build.
    pub fn static_url(&self, path: &str) -> String {
        if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
            eprintln!("warning: malformed resource path {path:?}, leaving as-is");
            return path.to_string();
        }
        if SCHEME.is_match(path) {
            return path.to_string();
        }

        let lower = path.to_lowercase();
        if let Some(mapped) = self.table.get(&lower) {
            return mapped.clone();
        }

        // Content-type fallback only applies to root-relative paths, and the
        // prefix is applied to the original-case path.
        if lower.starts_with('/') {
            if lower.ends_with(".css") {
                return format!("{}{}", self.css_prefix, path);
            }
            if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                return format!("{}{}", self.img_prefix, path);
            }
            if lower.ends_with(".js") {
                return format!("{}{}", self.js_prefix, path);
            }
        }

        path.to_string()
    }
}
