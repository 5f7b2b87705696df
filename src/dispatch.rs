//! Per-entry processing executed on a worker thread.

use crate::entry::LogEntry;
use crate::exec::Executor;
use crate::hook::{mark_hook_thread, Counters};
use crate::options::{DiagnosticSink, Filter};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Prefix of every line written to the diagnostic sink.
pub const DIAGNOSTIC_PREFIX: &str = "[log-hook]";

pub(crate) struct Pipeline {
    pub(crate) extra: BTreeMap<String, serde_json::Value>,
    pub(crate) filter: Option<Arc<dyn Filter>>,
    pub(crate) exec: Option<Arc<dyn Executor>>,
    pub(crate) out: Option<DiagnosticSink>,
    pub(crate) handle: Handle,
    pub(crate) counters: Arc<Counters>,
}

impl Pipeline {
    /// Merge extras, filter, execute and report. Never panics on backend
    /// failure and never propagates it.
    pub(crate) fn process(&self, entry: LogEntry) {
        // Events the executor raises on this thread must not re-enter the hook.
        mark_hook_thread();
        let entry = self.prepare(entry);

        let Some(exec) = self.exec.as_ref() else {
            return;
        };

        match self.handle.block_on(exec.exec(&entry)) {
            Ok(()) => {
                self.counters.executed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                self.report(&format!("execution error: {}", e));
            }
        }
    }

    /// Merge extras then apply the filter.
    pub(crate) fn prepare(&self, mut entry: LogEntry) -> LogEntry {
        merge_extra(&mut entry, &self.extra);
        match &self.filter {
            Some(filter) => filter.filter(entry),
            None => entry,
        }
    }

    pub(crate) fn report(&self, message: &str) {
        if let Some(out) = &self.out {
            let line = format!("{} {}", DIAGNOSTIC_PREFIX, message);
            if let Err(e) = out.write_line(&line) {
                tracing::debug!(error = %e, "failed to write log hook diagnostic");
            }
        }
    }
}

/// Insert every extra whose key the entry doesn't already have.
pub(crate) fn merge_extra(entry: &mut LogEntry, extra: &BTreeMap<String, serde_json::Value>) {
    for (key, value) in extra {
        if !entry.fields.contains_key(key) {
            entry.fields.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Level;
    use serde_json::json;

    #[test]
    fn entry_fields_win_over_extras() {
        let mut extra = BTreeMap::new();
        extra.insert("service".to_string(), json!("billing"));
        extra.insert("region".to_string(), json!("eu-west-1"));

        let mut entry = LogEntry::new(Level::Info, "charged").with_field("service", "payments");
        merge_extra(&mut entry, &extra);

        assert_eq!(entry.fields["service"], json!("payments"));
        assert_eq!(entry.fields["region"], json!("eu-west-1"));
    }

    #[test]
    fn empty_extras_leave_entry_untouched() {
        let mut entry = LogEntry::new(Level::Info, "x").with_field("a", 1);
        merge_extra(&mut entry, &BTreeMap::new());
        assert_eq!(entry.fields.len(), 1);
    }
}
