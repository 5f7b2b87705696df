use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a [`LogEntry`], ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Level {
    /// Every level, most severe first.
    pub const ALL: [Level; 5] = [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::INFO => Level::Info,
            tracing::Level::DEBUG => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        Level::from(&level)
    }
}

/// Resolved origin of a log call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub file: String,
    pub line: u32,
    /// Base identifier of the originating function, without module prefix.
    pub function: Option<String>,
}

/// A structured log entry as handed to the hook.
///
/// Once [`LogEntry::snapshot`] has been taken the copy is owned by exactly
/// one worker; the producer keeps (and may keep mutating) the original.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub target: String,
    pub module_path: Option<String>,
    pub fields: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<CallSite>,
}

impl LogEntry {
    /// Create an entry stamped with the current time and no fields.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            target: String::new(),
            module_path: None,
            fields: BTreeMap::new(),
            caller: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Produce an independent copy of this entry.
    ///
    /// The copy gets a fresh field map holding every current field plus the
    /// timestamp, level and message. Field values are owned JSON values, so
    /// nothing is shared with the original after this returns.
    pub fn snapshot(&self) -> LogEntry {
        let mut fields = BTreeMap::new();
        for (key, value) in &self.fields {
            fields.insert(key.clone(), value.clone());
        }

        LogEntry {
            timestamp: self.timestamp,
            level: self.level,
            message: self.message.clone(),
            target: self.target.clone(),
            module_path: self.module_path.clone(),
            fields,
            caller: self.caller.clone(),
        }
    }

    /// Record a resolved call site on the entry, both as structured
    /// `caller` data and as the `file` / `func` fields.
    pub fn annotate(&mut self, site: CallSite) {
        self.fields.insert(
            "file".to_string(),
            serde_json::Value::String(format!("{}:{}", site.file, site.line)),
        );
        if let Some(function) = &site.function {
            self.fields
                .insert("func".to_string(), serde_json::Value::String(function.clone()));
        }
        self.caller = Some(site);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn levels_order_most_severe_first() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Debug < Level::Trace);
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warn);
        assert_eq!(Level::from(&tracing::Level::TRACE), Level::Trace);
    }

    #[test]
    fn snapshot_is_independent_of_original() {
        let mut original = LogEntry::new(Level::Info, "hello").with_field("user", 7);
        let copy = original.snapshot();

        original.fields.insert("user".into(), json!(8));
        original.fields.insert("late".into(), json!(true));
        original.message.push_str(" world");

        assert_eq!(copy.fields.get("user"), Some(&json!(7)));
        assert!(!copy.fields.contains_key("late"));
        assert_eq!(copy.message, "hello");
        assert_eq!(copy.timestamp, original.timestamp);
        assert_eq!(copy.level, Level::Info);
    }

    #[test]
    fn annotate_writes_file_and_func() {
        let mut entry = LogEntry::new(Level::Error, "boom");
        entry.annotate(CallSite {
            file: "src/orders.rs".into(),
            line: 42,
            function: Some("place_order".into()),
        });

        assert_eq!(entry.fields["file"], json!("src/orders.rs:42"));
        assert_eq!(entry.fields["func"], json!("place_order"));
        assert_eq!(entry.caller.as_ref().map(|c| c.line), Some(42));
    }

    #[test]
    fn serializes_level_lowercase() {
        let entry = LogEntry::new(Level::Warn, "careful");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["level"], json!("warn"));
        assert!(value.get("caller").is_none());
    }
}
