//! Built-in pipeline stages.
//!
//! Each stage is a small unit struct implementing
//! [`Processor`](crate::processor::Processor). Content-shaping stages
//! (`template`, `markdown`, `external`, …) rewrite `state.content`;
//! path-shaping stages (`ext`, `directorify`, `rename`) rewrite
//! `state.output_path`; `config` and `tags` fill `state.other`. None of
//! them write to disk — the only filesystem-touching stage is `minify`
//! ([`crate::minify`]), which is terminal and side-effect-only.

use crate::pipeline::{BuildContext, PipelineError};
use crate::processor::{Processor, RunMode};
use crate::site::Page;
use crate::{template, transform};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

/// Root-relative `href`/`src` attribute values. A double slash is
/// protocol-relative and must be left alone.
static ROOT_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(href|src)\s*=\s*"/([^/"][^"]*)?""#).unwrap());

/// Split an output-relative path into (directory-with-slash, file name).
fn split_base(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..i + 1], &path[i + 1..]),
        None => ("", path),
    }
}

/// File name minus its extension.
fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

// ============================================================================
// template / inner-template
// ============================================================================

/// First-pass template evaluation over the page's current content.
pub struct TemplateProcessor;

impl Processor for TemplateProcessor {
    fn execute(
        &self,
        ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        _args: &[String],
    ) -> Result<(), PipelineError> {
        let source = page.content();
        let rendered = template::render(ctx, page, &source)?;
        page.lock().content = rendered;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "evaluate page content as a template"
    }
}

/// Second-pass template evaluation, for content whose *rendered* form
/// contains template syntax (e.g. a markdown stage emitted a `{{ ... }}`
/// that an earlier pass produced). Identical mechanics to `template`, run
/// against the accumulated content — it never re-triggers the first pass.
pub struct InnerTemplateProcessor;

impl Processor for InnerTemplateProcessor {
    fn execute(
        &self,
        ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        _args: &[String],
    ) -> Result<(), PipelineError> {
        let accumulated = page.content();
        let rendered = template::render(ctx, page, &accumulated)?;
        page.lock().content = rendered;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "re-evaluate already-templated content as a template"
    }
}

// ============================================================================
// config
// ============================================================================

/// Parse a leading front-matter block of `key: value` lines terminated by a
/// `----` line into page metadata, stripping it from the content.
pub struct ConfigProcessor;

/// Returns the parsed keys and the remaining content, or `None` if the
/// content has no well-formed front-matter block.
fn parse_front_matter(content: &str) -> Option<(BTreeMap<String, String>, String)> {
    let mut keys = BTreeMap::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.chars().count() >= 4 && trimmed.chars().all(|c| c == '-') {
            offset += line.len();
            return Some((keys, content[offset..].to_string()));
        }
        let (key, value) = trimmed.split_once(':')?;
        keys.insert(key.trim().to_string(), value.trim().to_string());
        offset += line.len();
    }
    // Ran out of lines without a terminator: not front matter.
    None
}

impl Processor for ConfigProcessor {
    fn execute(
        &self,
        _ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        _args: &[String],
    ) -> Result<(), PipelineError> {
        let content = page.content();
        if let Some((keys, rest)) = parse_front_matter(&content) {
            let mut state = page.lock();
            state.other.extend(keys);
            state.content = rest;
        }
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "parse front-matter key: value block into page metadata"
    }
}

// ============================================================================
// markdown
// ============================================================================

/// Render the page's content from markdown to HTML.
pub struct MarkdownProcessor;

impl Processor for MarkdownProcessor {
    fn execute(
        &self,
        _ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        _args: &[String],
    ) -> Result<(), PipelineError> {
        let content = page.content();
        page.lock().content = transform::markdown(&content);
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "render markdown content to HTML"
    }
}

// ============================================================================
// ext / directorify / rename
// ============================================================================

/// Swap the output path's extension: `ext .html`.
pub struct ExtProcessor;

impl Processor for ExtProcessor {
    fn execute(
        &self,
        _ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        args: &[String],
    ) -> Result<(), PipelineError> {
        let ext = args.first().ok_or(PipelineError::InvalidArgs {
            stage: "ext",
            reason: "expected an extension argument, e.g. `ext .html`".into(),
        })?;
        let ext = ext.strip_prefix('.').unwrap_or(ext);

        let mut state = page.lock();
        let (dir, base) = split_base(&state.output_path);
        let new_path = format!("{dir}{}.{ext}", stem(base));
        state.output_path = new_path;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "change the output path's extension"
    }
}

/// `foo.html` → `foo/index.html`, so pages get clean directory URLs.
/// Idempotent: files already named `index.html` are untouched.
pub struct DirectorifyProcessor;

impl Processor for DirectorifyProcessor {
    fn execute(
        &self,
        _ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        _args: &[String],
    ) -> Result<(), PipelineError> {
        let mut state = page.lock();
        let (dir, base) = split_base(&state.output_path);
        if base == "index.html" {
            return Ok(());
        }
        let new_path = format!("{dir}{}/index.html", stem(base));
        state.output_path = new_path;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "move the page into its own directory as index.html"
    }
}

/// Replace the output file name: `rename feed.xml`. A `*` in the argument
/// expands to the current stem, so `rename *.txt` keeps the name and swaps
/// everything after it.
pub struct RenameProcessor;

impl Processor for RenameProcessor {
    fn execute(
        &self,
        _ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        args: &[String],
    ) -> Result<(), PipelineError> {
        let name = args.first().ok_or(PipelineError::InvalidArgs {
            stage: "rename",
            reason: "expected a file name argument, e.g. `rename feed.xml`".into(),
        })?;

        let mut state = page.lock();
        let (dir, base) = split_base(&state.output_path);
        let new_base = name.replace('*', stem(base));
        let new_path = format!("{dir}{new_base}");
        state.output_path = new_path;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "replace the output file name (* expands to the current stem)"
    }
}

// ============================================================================
// tags / paginate
// ============================================================================

/// Normalize the `tags` metadata key into a canonical comma-joined list.
/// Index generation itself happens outside the pipeline.
pub struct TagsProcessor;

impl Processor for TagsProcessor {
    fn execute(
        &self,
        _ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        _args: &[String],
    ) -> Result<(), PipelineError> {
        let mut state = page.lock();
        if let Some(raw) = state.other.get("tags") {
            let tags: Vec<&str> = raw
                .split([',', ' '])
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            let joined = tags.join(", ");
            state.other.insert("tags".into(), joined);
        }
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "normalize the page's tags metadata"
    }
}

/// Record the configured page size: `paginate 10`.
pub struct PaginateProcessor;

impl Processor for PaginateProcessor {
    fn execute(
        &self,
        _ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        args: &[String],
    ) -> Result<(), PipelineError> {
        let size: usize = args
            .first()
            .and_then(|arg| arg.parse().ok())
            .ok_or(PipelineError::InvalidArgs {
                stage: "paginate",
                reason: "expected a positive page size, e.g. `paginate 10`".into(),
            })?;
        page.lock().other.insert("paginate".into(), size.to_string());
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "record the pagination page size"
    }
}

/// Record the site-wide page count. Runs once per build — the count is a
/// global fact, not a per-page one.
pub struct PaginateCollectPagesProcessor;

impl Processor for PaginateCollectPagesProcessor {
    fn execute(
        &self,
        ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        _args: &[String],
    ) -> Result<(), PipelineError> {
        page.lock()
            .other
            .insert("collected_pages".into(), ctx.site.len().to_string());
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "collect the site-wide page count (runs once per build)"
    }

    fn mode(&self) -> RunMode {
        RunMode::Once
    }
}

// ============================================================================
// relativize
// ============================================================================

/// Rewrite root-relative `href`/`src` references relative to the page's
/// output depth, so a site renders correctly from a subdirectory deploy.
pub struct RelativizeProcessor;

impl Processor for RelativizeProcessor {
    fn execute(
        &self,
        _ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        _args: &[String],
    ) -> Result<(), PipelineError> {
        let prefix = "../".repeat(page.depth());
        let content = page.content();
        let rewritten = ROOT_REF
            .replace_all(&content, |caps: &regex::Captures| {
                let target = caps.get(2).map_or("", |m| m.as_str());
                format!(r#"{}="{prefix}{target}""#, &caps[1])
            })
            .into_owned();
        page.lock().content = rewritten;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "rewrite root-relative href/src references to relative ones"
    }
}

// ============================================================================
// external / ignore
// ============================================================================

/// Filter the page's content through an external command's stdin/stdout:
/// `external sed s/a/b/`.
pub struct ExternalProcessor;

impl Processor for ExternalProcessor {
    fn execute(
        &self,
        _ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        args: &[String],
    ) -> Result<(), PipelineError> {
        let (cmd, rest) = args.split_first().ok_or(PipelineError::InvalidArgs {
            stage: "external",
            reason: "expected a command, e.g. `external sed s/a/b/`".into(),
        })?;
        let content = page.content();
        let filtered = transform::filter_through(cmd, rest, &content)?;
        page.lock().content = filtered;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "filter content through an external command"
    }
}

/// Exclude the page from output entirely.
pub struct IgnoreProcessor;

impl Processor for IgnoreProcessor {
    fn execute(
        &self,
        _ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        _args: &[String],
    ) -> Result<(), PipelineError> {
        page.lock().ignored = true;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "exclude the page from output"
    }
}
