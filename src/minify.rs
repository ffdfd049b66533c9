//! The terminal minify+compress output stage.
//!
//! Writes a pre-compressed sibling artifact next to the primary output:
//! `/foo/bar.html` gains `/foo/bar-min.html.gz`, ready for a web server's
//! `gzip_static`-style serving. The stage is side-effect-only — it never
//! mutates the page's in-memory content, so it can sit at the end of any
//! stage list without affecting what the driver writes as the primary file.
//!
//! The minifier is selected by declared content type (a stage argument;
//! `text/html` is the default). HTML goes through `minify-html`, which also
//! minifies embedded CSS and JS; the standalone `text/css`,
//! `text/javascript` and `image/svg+xml` types get a conservative
//! whitespace pass.

use crate::pipeline::{BuildContext, PipelineError};
use crate::processor::Processor;
use crate::site::Page;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;

/// Compressed-artifact suffix.
const COMPRESSED_EXT: &str = "gz";

/// Derive the sibling artifact path: insert `-min` before the extension and
/// append the compression suffix.
fn artifact_path(output_path: &str) -> String {
    match output_path.rfind('.') {
        Some(i) if !output_path[i..].contains('/') => {
            let (raw, ext) = output_path.split_at(i);
            format!("{raw}-min{ext}.{COMPRESSED_EXT}")
        }
        _ => format!("{output_path}-min.{COMPRESSED_EXT}"),
    }
}

/// Minify `content` according to its declared content type.
fn minify_content(content_type: &str, content: &str) -> Result<String, String> {
    match content_type {
        "text/html" => {
            let mut cfg = minify_html::Cfg::new();
            cfg.keep_closing_tags = true;
            cfg.keep_html_and_head_opening_tags = true;
            cfg.keep_comments = false;
            cfg.minify_css = true;
            cfg.minify_js = true;
            let out = minify_html::minify(content.as_bytes(), &cfg);
            String::from_utf8(out).map_err(|e| format!("minifier produced invalid UTF-8: {e}"))
        }
        "text/css" | "image/svg+xml" => Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("")),
        // Whole-line trimming only: anything smarter needs real JS parsing
        // (automatic semicolon insertion makes newline removal unsafe).
        "text/javascript" => Ok(content
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim_start().is_empty())
            .collect::<Vec<_>>()
            .join("\n")),
        other => Err(format!("no minifier registered for content type {other}")),
    }
}

/// Terminal stage: write `<stem>-min<ext>.gz` beside the primary output.
pub struct MinifyProcessor;

impl Processor for MinifyProcessor {
    fn execute(
        &self,
        ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        args: &[String],
    ) -> Result<(), PipelineError> {
        let content_type = args.first().map(String::as_str).unwrap_or("text/html");
        let output_path = page.output_path();
        let content = page.content();

        let minified =
            minify_content(content_type, &content).map_err(|reason| PipelineError::Transform {
                path: output_path.clone(),
                reason,
            })?;

        let full_path = ctx.output_dir.join(artifact_path(&output_path));
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&full_path)?;

        // GzEncoder owns the file; finish() flushes the stream and every
        // early return drops (and closes) both.
        let mut encoder = GzEncoder::new(file, Compression::best());
        encoder.write_all(minified.as_bytes())?;
        encoder.finish()?;
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "write a minified, gzip-compressed sibling artifact"
    }
}
