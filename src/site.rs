//! The Page and Site data model.
//!
//! A [`Page`] is one unit of content moving through the pipeline: an
//! immutable identity (source-relative path, declared stage list) plus a
//! mutexed [`PageState`] holding everything stages mutate — content, output
//! path, front-matter metadata, and processing status.
//!
//! # Why per-page locks
//!
//! Cross-page references (`version` in a template) force *another* page
//! through its pipeline mid-render, so a page's state must be lockable
//! independently of its neighbours. The executor holds no page lock while
//! running stages; each stage takes the lock only to read or write state, so
//! re-entrant processing of a different page can never deadlock against the
//! page that triggered it.
//!
//! # Status lifecycle
//!
//! ```text
//! Raw ──> InFlight ──> Done       (normal)
//!              │
//!              └─────> Failed     (a stage errored; content keeps the
//!                                  result of the last completed stage)
//! ```
//!
//! Re-processing a `Done` page is a no-op; hitting an `InFlight` page again
//! means a cyclic version reference and is reported as such.

use crate::config::{BuildConfig, Stage};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use walkdir::WalkDir;

/// Where a page is in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Raw,
    InFlight,
    Done,
    Failed,
}

/// The mutable half of a page, guarded by [`Page::lock`].
#[derive(Debug)]
pub struct PageState {
    /// Result of the last completed stage (starts as the raw source text).
    pub content: String,
    /// Output-relative path, forward slashes. Starts equal to the source
    /// path; `ext`/`directorify`/`rename` reshape it.
    pub output_path: String,
    /// Front-matter style metadata (`config` stage) and stage bookkeeping.
    pub other: BTreeMap<String, String>,
    pub status: PageStatus,
    /// Set by the `ignore` stage; excluded from output.
    pub ignored: bool,
}

/// One content unit, shared behind `Arc` so templates can reference pages
/// other than the one being rendered.
#[derive(Debug)]
pub struct Page {
    /// Source-relative path with forward slashes — the page's identity and
    /// its key in the site index.
    pub path: String,
    /// Absolute source file location (empty for synthetic test pages).
    pub source: PathBuf,
    /// Ordered stage list from the matching config rule.
    pub stages: Vec<Stage>,
    /// False for files that aren't valid UTF-8; those bypass the pipeline
    /// and are byte-copied by the driver.
    pub is_text: bool,
    state: Mutex<PageState>,
}

impl Page {
    /// A text page with the given raw content.
    pub fn new(path: &str, stages: Vec<Stage>, content: &str) -> Self {
        Self {
            path: path.to_string(),
            source: PathBuf::new(),
            stages,
            is_text: true,
            state: Mutex::new(PageState {
                content: content.to_string(),
                output_path: path.to_string(),
                other: BTreeMap::new(),
                status: PageStatus::Raw,
                ignored: false,
            }),
        }
    }

    /// A non-UTF-8 page: no stages, byte-copied at write time.
    pub fn binary(path: &str, source: PathBuf) -> Self {
        let mut page = Self::new(path, Vec::new(), "");
        page.source = source;
        page.is_text = false;
        page
    }

    /// Lock the mutable state. Recovers from poisoning — a panicking stage
    /// in another thread must not wedge the rest of the build.
    pub fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current content (result of the last completed stage).
    pub fn content(&self) -> String {
        self.lock().content.clone()
    }

    /// Snapshot of the current output-relative path.
    pub fn output_path(&self) -> String {
        self.lock().output_path.clone()
    }

    /// The page's URL: its output path with a trailing `index.html` elided.
    pub fn url(&self) -> String {
        let out = self.output_path();
        match out.strip_suffix("index.html") {
            Some(dir) => dir.to_string(),
            None => out,
        }
    }

    /// URL of `other` relative to this page's output directory — what an
    /// `href` in this page's rendered output should say.
    pub fn url_to(&self, other: &Page) -> String {
        relative_url(&self.url(), &other.url())
    }

    /// Number of directory levels between this page's output and the site
    /// root. Used by `relativize` to rewrite root-relative references.
    pub fn depth(&self) -> usize {
        self.output_path().matches('/').count()
    }
}

/// Render `to` relative to the directory containing `from`.
fn relative_url(from: &str, to: &str) -> String {
    let from_dir = match from.rfind('/') {
        Some(i) => &from[..i],
        None => "",
    };
    let from_parts: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to_parts: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = "../".repeat(from_parts.len() - common);
    rel.push_str(&to_parts[common..].join("/"));
    if to.ends_with('/') && !rel.is_empty() && !rel.ends_with('/') {
        rel.push('/');
    }
    if rel.is_empty() {
        rel.push_str("./");
    }
    rel
}

/// The full page collection plus global configuration.
#[derive(Debug, Default)]
pub struct Site {
    /// Global string configuration from `[site]` in `site.toml`.
    pub other: BTreeMap<String, String>,
    pages: BTreeMap<String, Arc<Page>>,
}

impl Site {
    pub fn new(other: BTreeMap<String, String>) -> Self {
        Self {
            other,
            pages: BTreeMap::new(),
        }
    }

    pub fn add_page(&mut self, page: Page) {
        self.pages.insert(page.path.clone(), Arc::new(page));
    }

    /// Look up a page by its source-relative path.
    pub fn page(&self, path: &str) -> Option<&Arc<Page>> {
        self.pages.get(path)
    }

    /// All pages in path order.
    pub fn pages(&self) -> impl Iterator<Item = &Arc<Page>> {
        self.pages.values()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Walk `source_dir` and build the Site: every non-hidden file becomes a
/// page with the stage list of its first matching rule.
///
/// The config file itself is skipped. Files that aren't valid UTF-8 become
/// binary pages regardless of rules — there is nothing textual to process.
pub fn load_site(
    source_dir: &Path,
    config: &BuildConfig,
    config_file_name: &str,
) -> io::Result<Site> {
    let mut site = Site::new(config.site.clone());

    let walker = WalkDir::new(source_dir).into_iter().filter_entry(|entry| {
        // The root is the source dir itself; only entries inside it are
        // subject to the hidden-name filter.
        entry.depth() == 0
            || !entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with('.'))
    });

    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_str() == Some(config_file_name) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(io::Error::other)?;
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let bytes = std::fs::read(entry.path())?;
        let page = match String::from_utf8(bytes) {
            Ok(text) => {
                let mut page = Page::new(&rel, config.stages_for(&rel), &text);
                page.source = entry.path().to_path_buf();
                page
            }
            Err(_) => Page::binary(&rel, entry.path().to_path_buf()),
        };
        site.add_page(page);
    }

    Ok(site)
}
