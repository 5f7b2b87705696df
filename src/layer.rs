use crate::callsite::Frame;
use crate::entry::{Level, LogEntry};
use crate::hook::{on_hook_thread, Hook};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Target prefix of this crate's own events, which are never persisted.
const SELF_TARGET: &str = "tracing_persist_hook";

/// `tracing_subscriber` layer that turns events into [`LogEntry`]s and
/// fires them into a shared [`Hook`].
///
/// Events whose level the hook does not accept are ignored, as are events
/// raised by the hook itself or on its worker threads. The stack handed to
/// the call-site resolver is the event's own location followed by the
/// enclosing spans, innermost first.
#[derive(Clone)]
pub struct HookLayer {
    hook: Arc<Hook>,
}

impl HookLayer {
    pub fn new(hook: Arc<Hook>) -> Self {
        Self { hook }
    }

    pub fn hook(&self) -> &Arc<Hook> {
        &self.hook
    }
}

impl<S> Layer<S> for HookLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target().starts_with(SELF_TARGET) || on_hook_thread() {
            return;
        }

        let level = Level::from(meta.level());
        if !self.hook.accepts(level) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let mut stack = Vec::new();
        let spans: Vec<Frame> = ctx
            .event_scope(event)
            .map(|scope| {
                scope
                    .map(|span| {
                        let span_meta = span.metadata();
                        Frame {
                            module_path: span_meta.module_path().map(str::to_string),
                            file: span_meta.file().map(str::to_string),
                            line: span_meta.line(),
                            function: Some(span.name().to_string()),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        // Inside an instrumented function of the same module, the innermost
        // span names the function the event came from.
        let function = match (spans.first(), meta.module_path()) {
            (Some(span), Some(module)) if span.module_path.as_deref() == Some(module) => {
                span.function.clone()
            }
            (_, module) => module.map(str::to_string),
        };
        stack.push(Frame {
            module_path: meta.module_path().map(str::to_string),
            file: meta.file().map(str::to_string),
            line: meta.line(),
            function,
        });
        stack.extend(spans);

        let mut entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.unwrap_or_default(),
            target: meta.target().to_string(),
            module_path: meta.module_path().map(str::to_string),
            fields,
            caller: None,
        };

        let _ = self.hook.fire(&mut entry, &stack);
    }
}

/// Collects an event's fields as JSON values, splitting out `message`.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
