use crate::callsite::{CallSiteResolver, FrameWalker};
use crate::entry::{Level, LogEntry};
use crate::exec::Executor;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Default number of buffered entries before producers block.
pub const DEFAULT_MAX_QUEUES: usize = 512;

/// Default number of worker threads.
pub const DEFAULT_MAX_WORKERS: usize = 2;

/// Transform applied to every entry right before it is executed.
///
/// A filter may rewrite, drop or redact fields; whatever it returns is
/// what the executor receives.
pub trait Filter: Send + Sync {
    fn filter(&self, entry: LogEntry) -> LogEntry;
}

impl<F> Filter for F
where
    F: Fn(LogEntry) -> LogEntry + Send + Sync,
{
    fn filter(&self, entry: LogEntry) -> LogEntry {
        self(entry)
    }
}

/// Shared writer receiving diagnostics about failed executions.
#[derive(Clone)]
pub struct DiagnosticSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl DiagnosticSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        DiagnosticSink {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stderr() -> Self {
        DiagnosticSink::new(io::stderr())
    }

    /// Write `line` followed by a newline as a single write.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(buf.as_bytes())?;
        out.flush()
    }
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DiagnosticSink")
    }
}

/// Configuration captured once when a [`crate::hook::Hook`] is built.
///
/// ```no_run
/// use std::sync::Arc;
/// use tracing_persist_hook::{HookOptions, Level, NoopExec};
///
/// let options = HookOptions::default()
///     .max_queues(1024)
///     .max_workers(4)
///     .levels([Level::Error, Level::Warn])
///     .exec(Arc::new(NoopExec));
/// ```
#[derive(Clone)]
pub struct HookOptions {
    pub(crate) max_queues: usize,
    pub(crate) max_workers: usize,
    pub(crate) levels: Vec<Level>,
    pub(crate) extra: BTreeMap<String, serde_json::Value>,
    pub(crate) exec: Option<Arc<dyn Executor>>,
    pub(crate) filter: Option<Arc<dyn Filter>>,
    pub(crate) out: Option<DiagnosticSink>,
    pub(crate) resolver: Arc<dyn CallSiteResolver>,
    pub(crate) runtime: Option<tokio::runtime::Handle>,
}

impl Default for HookOptions {
    fn default() -> Self {
        HookOptions {
            max_queues: DEFAULT_MAX_QUEUES,
            max_workers: DEFAULT_MAX_WORKERS,
            levels: Level::ALL.to_vec(),
            extra: BTreeMap::new(),
            exec: None,
            filter: None,
            out: Some(DiagnosticSink::stderr()),
            resolver: Arc::new(FrameWalker::default()),
            runtime: None,
        }
    }
}

impl HookOptions {
    /// Capacity of the entry buffer.
    pub fn max_queues(mut self, max_queues: usize) -> Self {
        self.max_queues = max_queues;
        self
    }

    /// Number of worker threads draining the buffer.
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Accepted levels. An empty set leaves the current levels untouched.
    pub fn levels<I: IntoIterator<Item = Level>>(mut self, levels: I) -> Self {
        let levels: Vec<Level> = levels.into_iter().collect();
        if !levels.is_empty() {
            self.levels = levels;
        }
        self
    }

    /// Static fields added to every entry that doesn't already carry them.
    pub fn extra(mut self, extra: BTreeMap<String, serde_json::Value>) -> Self {
        self.extra = extra;
        self
    }

    pub fn extra_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn exec(mut self, exec: Arc<dyn Executor>) -> Self {
        self.exec = Some(exec);
        self
    }

    pub fn filter<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Where execution failures are reported. Defaults to stderr.
    pub fn out<W: Write + Send + 'static>(mut self, out: W) -> Self {
        self.out = Some(DiagnosticSink::new(out));
        self
    }

    pub fn diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.out = Some(sink);
        self
    }

    /// Silence execution failure reports.
    pub fn no_out(mut self) -> Self {
        self.out = None;
        self
    }

    pub fn resolver<R: CallSiteResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Drive executors on an existing tokio runtime instead of a private one.
    pub fn runtime(mut self, handle: tokio::runtime::Handle) -> Self {
        self.runtime = Some(handle);
        self
    }
}

impl fmt::Debug for HookOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookOptions")
            .field("max_queues", &self.max_queues)
            .field("max_workers", &self.max_workers)
            .field("levels", &self.levels)
            .field("extra", &self.extra)
            .field("exec", &self.exec.is_some())
            .field("filter", &self.filter.is_some())
            .field("out", &self.out.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn defaults() {
        let opts = HookOptions::default();
        assert_eq!(opts.max_queues, 512);
        assert_eq!(opts.max_workers, 2);
        assert_eq!(opts.levels.len(), 5);
        assert!(opts.exec.is_none());
        assert!(opts.out.is_some());
    }

    #[test]
    fn empty_levels_are_ignored() {
        let opts = HookOptions::default().levels([Level::Error]).levels(Vec::new());
        assert_eq!(opts.levels, vec![Level::Error]);
    }

    #[test]
    fn closures_are_filters() {
        let redact = |mut e: LogEntry| {
            e.fields.remove("password");
            e
        };
        let entry = LogEntry::new(Level::Info, "login").with_field("password", "hunter2");
        assert!(!redact.filter(entry).fields.contains_key("password"));
    }

    #[test]
    fn diagnostic_lines_end_with_newline() {
        let capture = Capture::default();
        let sink = DiagnosticSink::new(capture.clone());
        sink.write_line("one").unwrap();
        sink.write_line("two").unwrap();
        assert_eq!(capture.0.lock().unwrap().as_slice(), b"one\ntwo\n");
    }
}
