//! Change-detection ledger for the `changed` template callable.
//!
//! Templates can ask "has this named value changed since I last looked?" —
//! e.g. to emit a date header only when the date differs from the previous
//! post in a list. The ledger is the last-seen store behind that question.
//!
//! One ledger is constructed per build and injected through the build
//! context, so tests (and hypothetical embedders running several builds in
//! one process) get isolated state instead of a process-wide global. Nothing
//! persists across runs.

use std::collections::HashMap;
use std::sync::Mutex;

/// Per-build last-seen value store. Interior-mutexed so template callables
/// can consult it through a shared reference.
#[derive(Debug, Default)]
pub struct ChangeLedger {
    seen: Mutex<HashMap<String, String>>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` under `name` and report whether it differed from the
    /// previously recorded value. The first sighting of a name counts as
    /// changed.
    pub fn has_changed(&self, name: &str, value: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        match seen.get(name) {
            Some(prev) if prev == value => false,
            _ => {
                seen.insert(name.to_string(), value.to_string());
                true
            }
        }
    }
}
