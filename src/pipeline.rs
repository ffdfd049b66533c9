//! The build context, the page pipeline executor, and the error taxonomy.
//!
//! # Execution model
//!
//! A build constructs one [`BuildContext`] (site, processor registry, change
//! ledger, resource table, output directory) and drives every page through
//! [`process_page`]. Pages run sequentially; re-entrancy comes from
//! *within* a page — a `version(...)` call in a template forces the target
//! page through its own pipeline before the current render can finish.
//!
//! The executor is the single place that understands re-entrancy:
//! processing a `Done` page is a no-op, and re-entering an `InFlight` page
//! means the version-reference graph has a cycle, which is reported as
//! [`PipelineError::Cycle`] instead of recursing forever.
//!
//! # Error policy
//!
//! Errors are page-local: a failed stage aborts the remaining stages for
//! that page, the page is marked `Failed`, and the build moves on. The one
//! exception is [`PipelineError::PageNotFound`] from a `version` reference —
//! that means the content graph itself is broken, so the whole build aborts
//! ([`PipelineError::is_fatal`]).

use crate::ledger::ChangeLedger;
use crate::processor::{ProcessorMap, RunMode, default_processors};
use crate::resource::ResourceMap;
use crate::site::{Page, PageStatus, Site};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A `version` reference names a page that does not exist. Build-fatal:
    /// the content graph is inconsistent.
    #[error("version reference to non-existent page {target} (from {from})")]
    PageNotFound { target: String, from: String },

    /// A configured stage name is not in the registry. Aborts this page only.
    #[error("unknown processor: {0}")]
    UnknownProcessor(String),

    /// Cyclic version references (A versions B versions A).
    #[error("cycle detected while processing {0}")]
    Cycle(String),

    /// A page that previously failed is referenced again.
    #[error("page {0} previously failed processing")]
    PageFailed(String),

    /// A cut pattern failed to compile. Recoverable by the caller.
    #[error("bad pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The minifier rejected content; the primary output is unaffected.
    #[error("minify failed for {path}: {reason}")]
    Transform { path: String, reason: String },

    /// A stage was invoked with missing or unusable arguments.
    #[error("stage {stage}: {reason}")]
    InvalidArgs {
        stage: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for errors that abort the whole build rather than one page.
    ///
    /// Template errors are walked for a nested fatal cause, because a
    /// `version` failure inside a render surfaces wrapped in the template
    /// engine's error.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::PageNotFound { .. } => true,
            Self::Template(err) => {
                let mut source = std::error::Error::source(err);
                while let Some(cause) = source {
                    if let Some(nested) = cause.downcast_ref::<PipelineError>() {
                        return nested.is_fatal();
                    }
                    source = cause.source();
                }
                false
            }
            _ => false,
        }
    }
}

/// Everything a stage needs: shared, read-mostly build state.
pub struct BuildContext {
    pub site: Arc<Site>,
    pub processors: ProcessorMap,
    pub ledger: ChangeLedger,
    pub resources: ResourceMap,
    pub output_dir: PathBuf,
    /// Names of `RunMode::Once` stages that have already run this build.
    once_done: Mutex<HashSet<String>>,
}

impl BuildContext {
    /// Context with the stock processor registry. The resource table is
    /// populated here, once, from the site configuration.
    pub fn new(site: Site, output_dir: &Path) -> Arc<Self> {
        Self::with_processors(site, output_dir, default_processors())
    }

    /// Context with a caller-supplied registry (out-of-tree stages).
    pub fn with_processors(site: Site, output_dir: &Path, processors: ProcessorMap) -> Arc<Self> {
        let resources = ResourceMap::from_site_config(&site.other);
        Arc::new(Self {
            site: Arc::new(site),
            processors,
            ledger: ChangeLedger::new(),
            resources,
            output_dir: output_dir.to_path_buf(),
            once_done: Mutex::new(HashSet::new()),
        })
    }

    fn once_already_ran(&self, name: &str) -> bool {
        let mut done = self.once_done.lock().unwrap_or_else(|e| e.into_inner());
        !done.insert(name.to_string())
    }
}

/// Drive a page through its configured stage list.
///
/// Safe to call again on the same page (no-op once `Done`) and from within
/// another page's stage (`version` re-entrancy). Holding no page lock while
/// stages run is what makes the re-entrant case deadlock-free.
pub fn process_page(ctx: &Arc<BuildContext>, page: &Arc<Page>) -> Result<(), PipelineError> {
    {
        let mut state = page.lock();
        match state.status {
            PageStatus::Done => return Ok(()),
            PageStatus::InFlight => return Err(PipelineError::Cycle(page.path.clone())),
            PageStatus::Failed => return Err(PipelineError::PageFailed(page.path.clone())),
            PageStatus::Raw => state.status = PageStatus::InFlight,
        }
    }

    for stage in &page.stages {
        let Some(processor) = ctx.processors.get(&stage.name) else {
            page.lock().status = PageStatus::Failed;
            return Err(PipelineError::UnknownProcessor(stage.name.clone()));
        };
        if processor.mode() == RunMode::Once && ctx.once_already_ran(&stage.name) {
            continue;
        }
        if let Err(err) = processor.execute(ctx, page, &stage.args) {
            page.lock().status = PageStatus::Failed;
            return Err(err);
        }
    }

    page.lock().status = PageStatus::Done;
    Ok(())
}

/// Outcome of a full build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Output-relative paths written, in write order.
    pub written: Vec<String>,
    /// Pages excluded by the `ignore` stage.
    pub ignored: usize,
    /// Page-local failures: (source path, error).
    pub failed: Vec<(String, PipelineError)>,
}

/// Process every page, then write all outputs.
///
/// Page-local errors are collected into the report; a fatal error aborts
/// immediately. The write fan-out runs on the rayon pool — each page has a
/// unique output path, so writes are independent.
pub fn run_build(ctx: &Arc<BuildContext>) -> Result<BuildReport, PipelineError> {
    let mut report = BuildReport::default();

    for page in ctx.site.pages() {
        if let Err(err) = process_page(ctx, page) {
            // A re-entrant run may have already failed this page; don't
            // double-report it.
            if err.is_fatal() {
                return Err(err);
            }
            if !matches!(err, PipelineError::PageFailed(_)) {
                report.failed.push((page.path.clone(), err));
            }
        }
    }

    let writable: Vec<&Arc<Page>> = ctx
        .site
        .pages()
        .filter(|page| {
            let state = page.lock();
            if state.ignored {
                return false;
            }
            state.status == PageStatus::Done || page.stages.is_empty()
        })
        .collect();
    report.ignored = ctx
        .site
        .pages()
        .filter(|page| page.lock().ignored)
        .count();

    writable
        .par_iter()
        .try_for_each(|page| write_output(ctx, page))?;
    report.written = writable.iter().map(|page| page.output_path()).collect();

    Ok(report)
}

/// Write one page's primary output artifact.
fn write_output(ctx: &Arc<BuildContext>, page: &Arc<Page>) -> Result<(), PipelineError> {
    let out_path = ctx.output_dir.join(page.output_path());
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if page.is_text {
        std::fs::write(&out_path, page.content())?;
    } else {
        std::fs::copy(&page.source, &out_path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    // =========================================================================
    // Executor basics
    // =========================================================================

    #[test]
    fn process_page_runs_stages_in_order() {
        let (ctx, _tmp) = context_with_pages(&[(
            "a.md",
            &["markdown", "ext .html"],
            "# Title",
        )]);
        let page = ctx.site.page("a.md").unwrap().clone();
        process_page(&ctx, &page).unwrap();

        assert!(page.content().contains("<h1>"));
        assert_eq!(page.output_path(), "a.html");
        assert_eq!(page.lock().status, PageStatus::Done);
    }

    #[test]
    fn process_page_is_idempotent() {
        let (ctx, _tmp) = context_with_pages(&[("a.md", &["markdown"], "*x*")]);
        let page = ctx.site.page("a.md").unwrap().clone();
        process_page(&ctx, &page).unwrap();
        let first = page.content();
        process_page(&ctx, &page).unwrap();
        assert_eq!(page.content(), first);
    }

    #[test]
    fn unknown_processor_fails_only_that_page() {
        let (ctx, _tmp) = context_with_pages(&[
            ("bad.md", &["no-such-stage"], "x"),
            ("good.md", &["markdown"], "y"),
        ]);
        let bad = ctx.site.page("bad.md").unwrap().clone();
        let good = ctx.site.page("good.md").unwrap().clone();

        let err = process_page(&ctx, &bad).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownProcessor(_)));
        assert!(!err.is_fatal());
        assert_eq!(bad.lock().status, PageStatus::Failed);

        process_page(&ctx, &good).unwrap();
        assert_eq!(good.lock().status, PageStatus::Done);
    }

    #[test]
    fn error_aborts_remaining_stages() {
        let (ctx, _tmp) = context_with_pages(&[("a.md", &["no-such-stage", "markdown"], "*x*")]);
        let page = ctx.site.page("a.md").unwrap().clone();
        process_page(&ctx, &page).unwrap_err();
        // markdown never ran
        assert_eq!(page.content(), "*x*");
    }

    // =========================================================================
    // Re-entrancy and cycles
    // =========================================================================

    #[test]
    fn version_reference_processes_target_first() {
        let (ctx, _tmp) = context_with_pages(&[
            ("index.html", &["template"], r#"<a href="{{ version("style.css") }}">x</a>"#),
            ("style.css", &["template"], "body { color: {{ site.other.Color }} }"),
        ]);
        let index = ctx.site.page("index.html").unwrap().clone();
        process_page(&ctx, &index).unwrap();

        let css = ctx.site.page("style.css").unwrap();
        assert_eq!(css.lock().status, PageStatus::Done);
        assert!(index.content().contains("style.css?v="));
    }

    #[test]
    fn cyclic_version_references_are_detected() {
        let (ctx, _tmp) = context_with_pages(&[
            ("a.html", &["template"], r#"{{ version("b.html") }}"#),
            ("b.html", &["template"], r#"{{ version("a.html") }}"#),
        ]);
        let a = ctx.site.page("a.html").unwrap().clone();
        let err = process_page(&ctx, &a).unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("template error"));
    }

    #[test]
    fn missing_version_target_is_fatal() {
        let (ctx, _tmp) = context_with_pages(&[(
            "a.html",
            &["template"],
            r#"{{ version("missing.css") }}"#,
        )]);
        let a = ctx.site.page("a.html").unwrap().clone();
        let err = process_page(&ctx, &a).unwrap_err();
        assert!(err.is_fatal());
    }

    // =========================================================================
    // run_build
    // =========================================================================

    #[test]
    fn run_build_writes_outputs_and_reports_failures() {
        let (ctx, tmp) = context_with_pages(&[
            ("ok.md", &["markdown", "ext .html"], "# fine"),
            ("bad.md", &["no-such-stage"], "x"),
            ("skipped.md", &["ignore"], "x"),
        ]);
        let report = run_build(&ctx).unwrap();

        assert_eq!(report.written, vec!["ok.html".to_string()]);
        assert_eq!(report.ignored, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "bad.md");
        assert!(tmp.path().join("out/ok.html").exists());
        assert!(!tmp.path().join("out/bad.md").exists());
    }

    #[test]
    fn run_build_copies_stage_less_pages_verbatim() {
        let (ctx, tmp) = context_with_pages(&[("plain.txt", &[], "keep me")]);
        run_build(&ctx).unwrap();
        let written = std::fs::read_to_string(tmp.path().join("out/plain.txt")).unwrap();
        assert_eq!(written, "keep me");
    }

    #[test]
    fn run_build_aborts_on_fatal_error() {
        let (ctx, tmp) = context_with_pages(&[
            ("a.html", &["template"], r#"{{ version("missing.css") }}"#),
            ("b.md", &["markdown"], "x"),
        ]);
        assert!(run_build(&ctx).is_err());
        assert!(!tmp.path().join("out/b.md").exists());
    }

    #[test]
    fn write_output_creates_nested_directories() {
        let (ctx, tmp) = context_with_pages(&[("deep/nested/a.md", &["markdown"], "hi")]);
        run_build(&ctx).unwrap();
        assert!(tmp.path().join("out/deep/nested/a.md").exists());
    }
}
