use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, info_span, warn};
use tracing_persist_hook::{BoxError, Executor, Hook, HookOptions, Level, LogEntry};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

#[derive(Default)]
struct MemoryExec {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl Executor for MemoryExec {
    async fn exec(&self, entry: &LogEntry) -> Result<(), BoxError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

fn capture<F: FnOnce()>(options: HookOptions, f: F) -> Vec<LogEntry> {
    let exec = Arc::new(MemoryExec::default());
    let hook = Hook::shared(options.exec(exec.clone())).unwrap();

    let subscriber = Registry::default().with(hook.layer());
    tracing::subscriber::with_default(subscriber, f);
    hook.flush();

    let entries = exec.entries.lock().unwrap().clone();
    entries
}

#[test]
fn event_becomes_entry_with_call_site() {
    let entries = capture(HookOptions::default(), || {
        error!(user_id = 42, retry = false, ratio = 0.5, "payment declined");
    });

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.level, Level::Error);
    assert_eq!(entry.message, "payment declined");
    assert_eq!(entry.fields["user_id"], json!(42));
    assert_eq!(entry.fields["retry"], json!(false));
    assert_eq!(entry.fields["ratio"], json!(0.5));
    assert_eq!(entry.module_path.as_deref(), Some("subscriber"));

    let file = entry.fields["file"].as_str().unwrap();
    assert!(file.contains("subscriber.rs:"), "unexpected file field {file}");
    assert_eq!(entry.fields["func"], json!("subscriber"));
    assert!(entry.caller.as_ref().unwrap().line > 0);
}

#[test]
fn enclosing_span_names_the_function() {
    let entries = capture(HookOptions::default(), || {
        let span = info_span!("checkout", order_id = 7);
        let _guard = span.enter();
        warn!("inventory low");
    });

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].fields["func"], json!("checkout"));
}

#[test]
fn only_accepted_levels_are_persisted() {
    let entries = capture(HookOptions::default().levels([Level::Error]), || {
        info!("started");
        warn!("slow");
        error!("failed");
    });

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "failed");
}

#[test]
fn hook_does_not_persist_its_own_events() {
    let entries = capture(HookOptions::default(), || {
        error!(target: "tracing_persist_hook::queue", "internal failure");
        error!(target: "app", "user failure");
    });

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].target, "app");
}

#[test]
fn extras_and_filter_apply_to_layer_events() {
    let options = HookOptions::default()
        .extra_field("service", "billing")
        .filter(|mut e: LogEntry| {
            e.fields.remove("card_number");
            e
        });
    let entries = capture(options, || {
        error!(card_number = "4111111111111111", service = "override", "charge failed");
    });

    let fields = &entries[0].fields;
    assert!(!fields.contains_key("card_number"));
    assert_eq!(fields["service"], json!("override"));
}
