//! Cache-busting version URLs for cross-page references.
//!
//! `versionize` is why the pipeline has to be re-entrant: the hash in
//! `style.css?v=ab12cd34` must be computed over the target page's *final*
//! content, so referencing a page forces it through its own pipeline first.
//! Cycle detection and idempotence live in the executor, not here — this
//! module only states the dependency and consumes the result.

use crate::pipeline::{BuildContext, PipelineError, process_page};
use crate::site::Page;
use crate::transform;
use std::sync::Arc;

/// Resolve `target` to a page, force it through its pipeline, and return its
/// URL (relative to `current`) with a `?v=<content-hash>` suffix.
///
/// A target that doesn't exist in the site index is a build-configuration
/// error and fatal: a broken content graph must not ship silently.
pub fn versionize(
    ctx: &Arc<BuildContext>,
    current: &Arc<Page>,
    target: &str,
) -> Result<String, PipelineError> {
    let Some(page) = ctx.site.page(target) else {
        return Err(PipelineError::PageNotFound {
            target: target.to_string(),
            from: current.path.clone(),
        });
    };
    let page = page.clone();
    process_page(ctx, &page)?;

    let hash = transform::hash(&page.content());
    Ok(format!("{}?v={}", current.url_to(&page), hash))
}
