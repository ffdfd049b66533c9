//! Build configuration: `site.toml` loading and rule matching.
//!
//! A config file has two parts:
//!
//! ```toml
//! [site]                       # free-form string keys, exposed as site.other
//! Resource_map = "/logo.png:/cdn/logo.png"
//! Css_path = "/assets/css"
//!
//! [[rule]]                     # ordered: first matching pattern wins
//! pattern = "*.md"
//! stages = ["config", "markdown", "template", "directorify", "relativize", "minify"]
//!
//! [[rule]]
//! pattern = "*.html"
//! stages = ["template", "relativize", "minify"]
//! ```
//!
//! Rules are an **array of tables** rather than a map so their order is the
//! order in the file — rule precedence is positional. Each stage entry is a
//! processor name optionally followed by whitespace-separated arguments
//! (`"ext .html"`, `"rename *.txt"`), parsed by [`Stage::parse`].
//!
//! Files matching no rule get an empty stage list and are copied through
//! verbatim by the build driver.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML error in {path}: {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// One ordered pattern → stage-list rule.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub pattern: String,
    pub stages: Vec<String>,
}

/// Parsed `site.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    /// Free-form site configuration, exposed to processors and templates as
    /// `site.other` (`Resource_map`, `Css_path`, `Title`, …).
    #[serde(default)]
    pub site: BTreeMap<String, String>,
    /// Ordered page rules; the first matching pattern wins.
    #[serde(default, rename = "rule")]
    pub rules: Vec<Rule>,
}

/// A single stage invocation: processor name plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: String,
    pub args: Vec<String>,
}

impl Stage {
    /// Parse `"ext .html"` into name `ext` with args `[".html"]`.
    ///
    /// Returns `None` for blank entries.
    pub fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.split_whitespace();
        let name = parts.next()?.to_string();
        Some(Self {
            name,
            args: parts.map(str::to_string).collect(),
        })
    }
}

impl BuildConfig {
    /// Load and parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Toml {
            path: display,
            source,
        })
    }

    /// Resolve the stage list for a source-relative path: the first rule
    /// whose pattern matches, parsed into [`Stage`] invocations.
    pub fn stages_for(&self, path: &str) -> Vec<Stage> {
        for rule in &self.rules {
            if pattern_matches(&rule.pattern, path) {
                return rule.stages.iter().filter_map(|s| Stage::parse(s)).collect();
            }
        }
        Vec::new()
    }
}

/// Simple `*` glob match against the full source-relative path and, failing
/// that, against the file name alone (so `*.md` matches `blog/post.md`).
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    if glob_matches(pattern, path) {
        return true;
    }
    match path.rsplit_once('/') {
        Some((_, name)) => glob_matches(pattern, name),
        None => false,
    }
}

fn glob_matches(pattern: &str, text: &str) -> bool {
    // Translate the glob to an anchored regex; `*` is the only wildcard.
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    let mut first = true;
    for part in pattern.split('*') {
        if !first {
            re.push_str(".*");
        }
        first = false;
        re.push_str(&regex::escape(part));
    }
    re.push('$');
    regex::Regex::new(&re).map(|r| r.is_match(text)).unwrap_or(false)
}

/// Documented starter config, printed by `pagemill gen-config`.
pub fn stock_config_toml() -> &'static str {
    r#"# pagemill site configuration.
#
# [site] holds free-form string keys available to processors and templates
# as site.other. The keys below are the ones pagemill itself consults.

[site]
# Deploy-time remapping for staticURL: comma-separated logical:deploy pairs.
# Resource_map = "/logo.png:/cdn/logo.png, /app.js:/cdn/app.js"

# Prefixes for root-relative resources that miss the Resource_map.
# Css_path = "/css"
# Js_path = "/js"
# Img_path = "/img"

# Rules are checked in order; the first matching pattern wins. A stage entry
# is a processor name plus optional arguments. Run `pagemill processors` for
# the full list.

[[rule]]
pattern = "*.md"
stages = ["config", "ext .html", "directorify", "markdown", "template", "relativize", "minify"]

[[rule]]
pattern = "*.html"
stages = ["config", "template", "relativize", "minify"]

[[rule]]
pattern = "*.draft"
stages = ["ignore"]
"#
}
