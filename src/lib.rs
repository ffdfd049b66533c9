//! # pagemill
//!
//! A static-site build pipeline: an ordered sequence of named transformation
//! stages ("processors") applied to in-memory pages, producing rendered,
//! cache-bust-versioned, minified, and compressed artifacts on disk.
//!
//! # Architecture: Pages Through a Processor Pipeline
//!
//! Every source file becomes a [`site::Page`]. A config rule assigns each
//! page an ordered stage list, and the executor drives it through the
//! processor registry:
//!
//! ```text
//! post.md ── config → ext .html → directorify → markdown → template
//!                                              → relativize → minify
//! ```
//!
//! Stages mutate the page in place (content, output path, metadata); the
//! driver writes the final content as the primary output, and the terminal
//! `minify` stage writes a gzip-compressed sibling artifact.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`transform`] | Pure string transforms: hashing, excerpting, tag-stripping, `cut`, … |
//! | [`resource`] | Deploy-time resource URL resolution (`staticURL`) |
//! | [`ledger`] | Per-build change-detection store (`changed`) |
//! | [`version`] | Cache-busting `?v=<hash>` URLs via re-entrant page processing |
//! | [`template`] | minijinja environment exposing the template function registry |
//! | [`processor`] | The `Processor` trait and the stage-name registry |
//! | [`processors`] | Built-in stages: `template`, `config`, `markdown`, `directorify`, … |
//! | [`minify`] | Terminal minify+gzip output stage |
//! | [`pipeline`] | Build context, page executor, error taxonomy, build driver |
//! | [`site`] | `Page`/`Site` data model and source-tree loading |
//! | [`config`] | `site.toml` loading and pattern → stage-list rules |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Cross-Page Dependencies Through the Executor
//!
//! `{{ version("css/site.css") }}` needs the *processed* stylesheet's
//! content hash, so rendering one page can force another through its
//! pipeline first. All re-entrancy rules live in one place — the executor
//! ([`pipeline::process_page`]): finished pages are a no-op, in-flight
//! pages mean a cyclic reference and fail that page with a cycle error.
//! The version resolver itself just asks and consumes the answer.
//!
//! ## Content-Addressed Cache Busting
//!
//! Version tags are a truncated SHA-256 of the page's final content
//! ([`transform::hash`]). Content-based rather than mtime-based, so tags
//! survive fresh checkouts and rebuilds; the tag changes exactly when the
//! served bytes change.
//!
//! ## Page-Local Error Policy
//!
//! A failing stage aborts that page and nothing else; the build reports it
//! at the end. The single exception is a `version` reference to a page
//! that doesn't exist — that is a broken content graph and aborts the
//! whole build. See [`pipeline::PipelineError`].
//!
//! ## Explicit Shared State
//!
//! The change ledger and the static-resource table are the only shared
//! mutable/built-once state. Both are owned by the build context: the
//! ledger behind a mutex, the resource table built eagerly at context
//! construction so concurrent readers only ever see an immutable table.

pub mod config;
pub mod ledger;
pub mod minify;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod processors;
pub mod resource;
pub mod site;
pub mod template;
pub mod transform;
pub mod version;

#[cfg(test)]
pub(crate) mod test_helpers;
