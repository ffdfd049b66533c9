//! Template evaluation: a minijinja environment wired to the transform
//! library, the resource resolver, and the version resolver.
//!
//! Each render builds a fresh [`Environment`] whose functions close over the
//! build context and the page being rendered — that is what lets a template
//! say `{{ version("css/site.css") }}` and have the *other* page's fully
//! processed content hashed into the URL.
//!
//! The callable names are a fixed contract (templates in the wild depend on
//! them): `changed`, `chomp`, `cut`, `hash`, `version`, `truncate`,
//! `staticURL`, `strip_html`, `strip_newlines`, `replace`, `replacen`,
//! `split`, `contains`, `markdown`, `exec`, `excerpt`.

use crate::pipeline::{BuildContext, PipelineError};
use crate::site::Page;
use crate::{transform, version};
use minijinja::value::Rest;
use minijinja::{Environment, ErrorKind, Value, context};
use std::sync::Arc;

/// Wrap a pipeline error for the template engine, keeping it reachable as a
/// source so the executor can recognize fatal causes through the wrapper.
fn template_err(err: PipelineError) -> minijinja::Error {
    minijinja::Error::new(ErrorKind::InvalidOperation, err.to_string()).with_source(err)
}

/// Render `source` as a template in the context of `page`.
///
/// Takes content as an argument rather than reading the page itself so the
/// `template` stage can pass raw source and `inner-template` can pass the
/// accumulated result of earlier stages.
pub fn render(
    ctx: &Arc<BuildContext>,
    page: &Arc<Page>,
    source: &str,
) -> Result<String, minijinja::Error> {
    let env = environment(ctx, page);

    // Snapshot template-visible state, then release the lock: rendering may
    // re-enter the pipeline for other pages. `url()` takes the page lock
    // itself, so it must run outside the guard.
    let other = page.lock().other.clone();
    let url = page.url();
    let vars = context! {
        page => context! {
            path => page.path.clone(),
            url => url,
            other => other,
        },
        site => context! {
            other => ctx.site.other.clone(),
        },
    };
    env.render_str(source, vars)
}

/// Build the function registry for one page render.
fn environment(ctx: &Arc<BuildContext>, page: &Arc<Page>) -> Environment<'static> {
    let mut env = Environment::new();

    {
        let ctx = ctx.clone();
        env.add_function("changed", move |name: String, value: Value| {
            ctx.ledger.has_changed(&name, &value.to_string())
        });
    }
    env.add_function("chomp", |value: String| transform::chomp(&value));
    env.add_function(
        "cut",
        |begin: String, end: String, value: String| -> Result<String, minijinja::Error> {
            transform::cut(&begin, &end, &value)
                .map_err(|e| template_err(PipelineError::Pattern(e)))
        },
    );
    env.add_function("hash", |value: String| transform::hash(&value));
    {
        let ctx = ctx.clone();
        let current = page.clone();
        env.add_function(
            "version",
            move |target: String| -> Result<String, minijinja::Error> {
                version::versionize(&ctx, &current, &target).map_err(template_err)
            },
        );
    }
    env.add_function("truncate", |length: i64, value: String| {
        transform::truncate(length.max(0) as usize, &value)
    });
    {
        let ctx = ctx.clone();
        env.add_function("staticURL", move |path: String| {
            ctx.resources.static_url(&path)
        });
    }
    env.add_function("strip_html", |value: String| transform::strip_html(&value));
    env.add_function("strip_newlines", |value: String| {
        transform::strip_newlines(&value)
    });
    env.add_function("replace", |old: String, new: String, value: String| {
        transform::replace(&old, &new, &value)
    });
    env.add_function(
        "replacen",
        |old: String, new: String, n: i64, value: String| transform::replacen(&old, &new, n, &value),
    );
    env.add_function("split", |sep: String, value: String| {
        transform::split(&sep, &value)
    });
    env.add_function("contains", |needle: String, value: String| {
        transform::contains(&needle, &value)
    });
    env.add_function("markdown", |text: String| transform::markdown(&text));
    env.add_function(
        "exec",
        |cmd: String, args: Rest<String>| -> Result<String, minijinja::Error> {
            transform::exec(&cmd, &args.0)
                .map_err(|e| template_err(PipelineError::Io(e)))
        },
    );
    env.add_function("excerpt", |text: String, max_words: i64| {
        transform::excerpt(&text, max_words)
    });

    env
}
