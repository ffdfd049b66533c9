//! Shared test utilities for the pagemill test suite.
//!
//! Unit tests mostly need "a build context over these pages" — these
//! helpers construct one with an isolated temp output directory so tests
//! can exercise the pipeline, template layer, and output stages without a
//! source tree on disk.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (ctx, tmp) = context_with_pages(&[
//!     ("index.html", &["template", "minify"], "{{ hash(\"x\") }}"),
//!     ("style.css", &[], "body{}"),
//! ]);
//! let page = ctx.site.page("index.html").unwrap().clone();
//! ```
//!
//! The returned `TempDir` owns the output directory (`<tmp>/out`); keep it
//! alive for the duration of the test.

use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

use crate::config::Stage;
use crate::pipeline::BuildContext;
use crate::site::{Page, Site};

/// Build a context over synthetic text pages: `(path, stage entries, raw
/// content)`. Stage entries use the config syntax (`"ext .html"`).
pub fn context_with_pages(pages: &[(&str, &[&str], &str)]) -> (Arc<BuildContext>, TempDir) {
    context_with_site(&[], pages)
}

/// Like [`context_with_pages`] with explicit `[site]` configuration keys.
pub fn context_with_site(
    site_other: &[(&str, &str)],
    pages: &[(&str, &[&str], &str)],
) -> (Arc<BuildContext>, TempDir) {
    let other: BTreeMap<String, String> = site_other
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let mut site = Site::new(other);
    for (path, stages, content) in pages {
        let stages: Vec<Stage> = stages.iter().filter_map(|s| Stage::parse(s)).collect();
        site.add_page(Page::new(path, stages, content));
    }

    let tmp = TempDir::new().unwrap();
    let ctx = BuildContext::new(site, &tmp.path().join("out"));
    (ctx, tmp)
}
