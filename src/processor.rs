//! The processor contract and the stage-name registry.
//!
//! Every pipeline stage implements [`Processor`]: execute against a page,
//! describe itself for `pagemill processors`, and declare a [`RunMode`]
//! scheduling hint. The registry ([`ProcessorMap`]) is an
//! ordered-by-registration name → implementation table, built once at
//! build-context construction and immutable afterwards.

use crate::pipeline::{BuildContext, PipelineError};
use crate::site::Page;
use std::sync::Arc;

/// Scheduling policy for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Runs for every page that lists it (the default).
    PerPage,
    /// Runs at most once per build; later pages listing it are skipped.
    Once,
}

/// A named transformation applied to a page.
///
/// Implementations are stateless (or lightly stateful through the build
/// context) and must be `Send + Sync` — template evaluation can trigger
/// re-entrant processing from whatever context drives the outer page.
pub trait Processor: Send + Sync {
    /// Apply this stage to `page`. Errors abort the remaining stages for
    /// this page only.
    fn execute(
        &self,
        ctx: &Arc<BuildContext>,
        page: &Arc<Page>,
        args: &[String],
    ) -> Result<(), PipelineError>;

    /// One-line human description for the processor listing.
    fn describe(&self) -> &'static str;

    fn mode(&self) -> RunMode {
        RunMode::PerPage
    }
}

/// Registration-ordered stage name → processor table.
#[derive(Default)]
pub struct ProcessorMap {
    entries: Vec<(String, Box<dyn Processor>)>,
}

impl ProcessorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor under `name`. Later registrations under the same
    /// name shadow earlier ones on lookup; registration order is kept for
    /// the listing.
    pub fn register(&mut self, name: &str, processor: Box<dyn Processor>) {
        self.entries.push((name.to_string(), processor));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Processor> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.as_ref())
    }

    /// Registered names with descriptions, in registration order.
    pub fn describe_all(&self) -> Vec<(&str, &'static str)> {
        self.entries
            .iter()
            .map(|(n, p)| (n.as_str(), p.describe()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The stock registry: every built-in stage under its configured name.
pub fn default_processors() -> ProcessorMap {
    use crate::minify::MinifyProcessor;
    use crate::processors::*;

    let mut map = ProcessorMap::new();
    map.register("template", Box::new(TemplateProcessor));
    map.register("inner-template", Box::new(InnerTemplateProcessor));
    map.register("config", Box::new(ConfigProcessor));
    map.register("markdown", Box::new(MarkdownProcessor));
    map.register("ext", Box::new(ExtProcessor));
    map.register("directorify", Box::new(DirectorifyProcessor));
    map.register("tags", Box::new(TagsProcessor));
    map.register("paginate", Box::new(PaginateProcessor));
    map.register("paginate-collect-pages", Box::new(PaginateCollectPagesProcessor));
    map.register("relativize", Box::new(RelativizeProcessor));
    map.register("rename", Box::new(RenameProcessor));
    map.register("external", Box::new(ExternalProcessor));
    map.register("ignore", Box::new(IgnoreProcessor));
    map.register("minify", Box::new(MinifyProcessor));
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_stage_names() {
        let map = default_processors();
        for name in [
            "template",
            "inner-template",
            "config",
            "markdown",
            "ext",
            "directorify",
            "tags",
            "paginate",
            "paginate-collect-pages",
            "relativize",
            "rename",
            "external",
            "ignore",
            "minify",
        ] {
            assert!(map.get(name).is_some(), "missing processor {name}");
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(default_processors().get("nope").is_none());
    }

    #[test]
    fn descriptions_are_nonempty_and_ordered() {
        let map = default_processors();
        let described = map.describe_all();
        assert_eq!(described.len(), map.len());
        assert_eq!(described[0].0, "template");
        assert!(described.iter().all(|(_, d)| !d.is_empty()));
    }

    #[test]
    fn later_registration_shadows_on_lookup() {
        struct A;
        impl Processor for A {
            fn execute(
                &self,
                _: &Arc<BuildContext>,
                _: &Arc<Page>,
                _: &[String],
            ) -> Result<(), PipelineError> {
                Ok(())
            }
            fn describe(&self) -> &'static str {
                "a"
            }
        }
        struct B;
        impl Processor for B {
            fn execute(
                &self,
                _: &Arc<BuildContext>,
                _: &Arc<Page>,
                _: &[String],
            ) -> Result<(), PipelineError> {
                Ok(())
            }
            fn describe(&self) -> &'static str {
                "b"
            }
        }
        let mut map = ProcessorMap::new();
        map.register("x", Box::new(A));
        map.register("x", Box::new(B));
        assert_eq!(map.get("x").unwrap().describe(), "b");
    }
}
