use crate::backend::{BackendBuildError, DsnError};
use crate::callsite::{CallSiteResolver, Frame};
use crate::dispatch::Pipeline;
use crate::entry::{Level, LogEntry};
use crate::layer::HookLayer;
use crate::options::HookOptions;
use crate::queue::{Job, Queue, QueueError};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tokio::runtime::{Builder, Runtime};

/// Errors raised while building or installing a [`Hook`].
///
/// None of these can come out of [`Hook::fire`].
#[derive(thiserror::Error, Debug)]
pub enum HookError {
    #[error("failed to build executor runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("failed to install global subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error(transparent)]
    Dsn(#[from] DsnError),

    #[error(transparent)]
    Backend(#[from] BackendBuildError),
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) fired: AtomicU64,
    pub(crate) enqueued: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) executed: AtomicU64,
    pub(crate) failed: AtomicU64,
}

/// Point-in-time view of the hook's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookStats {
    /// Entries handed to [`Hook::fire`].
    pub fired: u64,
    /// Entries accepted by the queue.
    pub enqueued: u64,
    /// Entries rejected because the queue was already terminated.
    pub dropped: u64,
    /// Entries the executor accepted.
    pub executed: u64,
    /// Entries the executor failed on.
    pub failed: u64,
}

thread_local! {
    static HOOK_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// True on threads owned by a hook (queue workers and the private
/// executor runtime). Events raised there are not fed back into the hook.
pub(crate) fn on_hook_thread() -> bool {
    HOOK_THREAD.with(Cell::get)
}

pub(crate) fn mark_hook_thread() {
    HOOK_THREAD.with(|flag| flag.set(true));
}

/// Asynchronous persistence hook.
///
/// Entries passed to [`Hook::fire`] are annotated with their call site,
/// copied and queued; worker threads merge extra fields, apply the filter
/// and hand the entry to the configured [`crate::exec::Executor`].
///
/// [`Hook::flush`] must be called before the process exits, otherwise
/// queued entries are lost. Dropping the hook flushes it as well.
pub struct Hook {
    levels: Vec<Level>,
    resolver: Arc<dyn CallSiteResolver>,
    queue: Queue<LogEntry>,
    pipeline: Arc<Pipeline>,
    counters: Arc<Counters>,
    closed: AtomicBool,
    runtime: Mutex<Option<Runtime>>,
}

impl Hook {
    /// Build a hook and start its workers.
    ///
    /// A missing executor is not an error: the hook runs in degraded mode
    /// and every entry is discarded after the filter.
    pub fn new(options: HookOptions) -> Result<Self, HookError> {
        if options.exec.is_none() {
            tracing::warn!("no log executor configured; entries will not be persisted");
        }

        let (handle, runtime) = match options.runtime {
            Some(handle) => (handle, None),
            None => {
                let runtime = Builder::new_multi_thread()
                    .worker_threads(1)
                    .thread_name("log-hook-io")
                    .on_thread_start(mark_hook_thread)
                    .enable_all()
                    .build()
                    .map_err(HookError::Runtime)?;
                (runtime.handle().clone(), Some(runtime))
            }
        };

        let counters = Arc::new(Counters::default());
        let pipeline = Arc::new(Pipeline {
            extra: options.extra,
            filter: options.filter,
            exec: options.exec,
            out: options.out,
            handle,
            counters: Arc::clone(&counters),
        });

        let queue = Queue::new(options.max_queues, options.max_workers);
        queue.run()?;

        Ok(Hook {
            levels: options.levels,
            resolver: options.resolver,
            queue,
            pipeline,
            counters,
            closed: AtomicBool::new(false),
            runtime: Mutex::new(runtime),
        })
    }

    /// Shorthand for `Arc::new(Hook::new(options)?)`.
    pub fn shared(options: HookOptions) -> Result<Arc<Self>, HookError> {
        Hook::new(options).map(Arc::new)
    }

    /// Levels this hook accepts.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn accepts(&self, level: Level) -> bool {
        self.levels.contains(&level)
    }

    /// `tracing_subscriber` layer feeding events into this hook.
    pub fn layer(self: &Arc<Self>) -> HookLayer {
        HookLayer::new(Arc::clone(self))
    }

    /// Hand an entry to the hook.
    ///
    /// When `stack` is non-empty the resolved call site is written into
    /// `entry` (`file` and `func` fields) before it is copied. The copy is
    /// queued; this blocks only while the queue is full. Always returns
    /// `Ok(())`: entries arriving after [`Hook::flush`] are counted as
    /// dropped and discarded.
    pub fn fire(&self, entry: &mut LogEntry, stack: &[Frame]) -> Result<(), HookError> {
        self.counters.fired.fetch_add(1, Ordering::Relaxed);

        if !stack.is_empty() {
            if let Some(site) = self.resolver.resolve(stack) {
                entry.annotate(site);
            }
        }

        let copy = entry.snapshot();
        let pipeline = Arc::clone(&self.pipeline);
        match self.queue.push(Job::new(copy, move |entry| pipeline.process(entry))) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Drain the queue, wait for in-flight entries and close the executor.
    ///
    /// The hook accepts no further entries afterwards. Safe to call more
    /// than once and from inside an async context.
    pub fn flush(&self) {
        self.queue.terminate();

        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(exec) = self.pipeline.exec.as_ref() else {
            return;
        };

        // `block_on` may not run on a runtime thread, so close from a
        // short-lived thread of our own.
        let pipeline = &self.pipeline;
        let result = thread::scope(|s| {
            s.spawn(|| {
                mark_hook_thread();
                pipeline.handle.block_on(exec.close())
            })
            .join()
        });
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => pipeline.report(&format!("close error: {}", e)),
            Err(_) => pipeline.report("close error: executor panicked"),
        }
    }

    pub fn stats(&self) -> HookStats {
        let c = &self.counters;
        HookStats {
            fired: c.fired.load(Ordering::Relaxed),
            enqueued: c.enqueued.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            executed: c.executed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
        }
    }

    /// Entries currently waiting for a worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for Hook {
    fn drop(&mut self) {
        self.flush();
        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{BoxError, Executor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::{self, Write};

    #[derive(Default)]
    struct Recording {
        entries: Mutex<Vec<LogEntry>>,
        closed: AtomicBool,
    }

    #[async_trait]
    impl Executor for Recording {
        async fn exec(&self, entry: &LogEntry) -> Result<(), BoxError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn close(&self) -> Result<(), BoxError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

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
    fn fire_resolves_call_site_on_original_and_copy() {
        let exec = Arc::new(Recording::default());
        let hook = Hook::new(HookOptions::default().exec(exec.clone())).unwrap();

        let mut entry = LogEntry::new(Level::Info, "placed");
        let stack = [Frame::new("shop::orders", "src/orders.rs", 12).with_function("shop::orders::place")];
        hook.fire(&mut entry, &stack).unwrap();
        hook.flush();

        assert_eq!(entry.fields["func"], json!("place"));
        let stored = exec.entries.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].fields["file"], json!("src/orders.rs:12"));
        assert!(exec.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn empty_stack_skips_resolution() {
        let exec = Arc::new(Recording::default());
        let hook = Hook::new(HookOptions::default().exec(exec.clone())).unwrap();

        let mut entry = LogEntry::new(Level::Info, "no caller");
        hook.fire(&mut entry, &[]).unwrap();
        hook.flush();

        assert!(entry.caller.is_none());
        assert!(!exec.entries.lock().unwrap()[0].fields.contains_key("file"));
    }

    #[test]
    fn producer_mutation_after_fire_does_not_leak_into_copy() {
        let exec = Arc::new(Recording::default());
        let hook = Hook::new(HookOptions::default().exec(exec.clone())).unwrap();

        let mut entry = LogEntry::new(Level::Warn, "reused").with_field("n", 1);
        hook.fire(&mut entry, &[]).unwrap();
        entry.fields.insert("n".into(), json!(2));
        hook.fire(&mut entry, &[]).unwrap();
        hook.flush();

        let mut seen: Vec<_> = exec
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.fields["n"].clone())
            .collect();
        seen.sort_by_key(|v| v.as_i64());
        assert_eq!(seen, vec![json!(1), json!(2)]);
    }

    #[test]
    fn fire_after_flush_is_dropped_silently() {
        let exec = Arc::new(Recording::default());
        let hook = Hook::new(HookOptions::default().exec(exec.clone())).unwrap();
        hook.flush();

        let mut entry = LogEntry::new(Level::Error, "late");
        assert!(hook.fire(&mut entry, &[]).is_ok());
        hook.flush();

        let stats = hook.stats();
        assert_eq!(stats.fired, 1);
        assert_eq!(stats.dropped, 1);
        assert!(exec.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn close_failure_is_reported() {
        struct FailingClose;

        #[async_trait]
        impl Executor for FailingClose {
            async fn exec(&self, _entry: &LogEntry) -> Result<(), BoxError> {
                Ok(())
            }

            async fn close(&self) -> Result<(), BoxError> {
                Err("connection reset".into())
            }
        }

        let out = Capture::default();
        let hook = Hook::new(HookOptions::default().exec(Arc::new(FailingClose)).out(out.clone())).unwrap();
        hook.flush();
        hook.flush();

        assert_eq!(out.text(), "[log-hook] close error: connection reset\n");
    }

    #[test]
    fn levels_reflect_options() {
        let hook = Hook::new(HookOptions::default().levels([Level::Error, Level::Warn])).unwrap();
        assert_eq!(hook.levels(), &[Level::Error, Level::Warn]);
        assert!(hook.accepts(Level::Warn));
        assert!(!hook.accepts(Level::Info));
    }
}
