//! Call-site resolution.
//!
//! The stack handed to a resolver is a list of [`Frame`]s, innermost
//! first. For `tracing` events that is the event's own call site followed
//! by the enclosing spans, see [`crate::layer::HookLayer`].

use crate::entry::CallSite;
use std::fmt;
use std::sync::Arc;

/// One candidate location in the calling stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Function name, possibly qualified with a module path.
    pub function: Option<String>,
}

impl Frame {
    pub fn new(module_path: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Frame {
            module_path: Some(module_path.into()),
            file: Some(file.into()),
            line: Some(line),
            function: None,
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    fn to_call_site(&self) -> Option<CallSite> {
        let file = self.file.clone()?;
        Some(CallSite {
            file,
            line: self.line.unwrap_or(0),
            function: self.function.as_deref().map(base_name).map(str::to_string),
        })
    }
}

/// Strip a `a::b::c` path down to `c`.
pub fn base_name(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Capability that picks the frame a log entry should be attributed to.
pub trait CallSiteResolver: Send + Sync {
    /// Returns `None` when no usable frame exists; callers skip annotation.
    fn resolve(&self, stack: &[Frame]) -> Option<CallSite>;
}

/// Predicate answering "does this frame belong to logging-library code".
pub type InternalFramePredicate = Arc<dyn Fn(&Frame) -> bool + Send + Sync>;

/// Module roots treated as logging-library code by default.
pub const DEFAULT_INTERNAL_MODULES: &[&str] = &[
    "tracing",
    "tracing_core",
    "tracing_subscriber",
    "tracing_log",
    "log",
    "tracing_persist_hook",
];

/// Default predicate: the frame's module root is one of
/// [`DEFAULT_INTERNAL_MODULES`].
pub fn is_logging_library_frame(frame: &Frame) -> bool {
    match frame.module_path.as_deref() {
        Some(path) => {
            let root = path.split("::").next().unwrap_or(path);
            DEFAULT_INTERNAL_MODULES.contains(&root)
        }
        None => false,
    }
}

/// Walks a bounded window of frames looking for the first one outside
/// logging-library code.
///
/// The window starts at `start_depth` and spans `lookback` frames. When
/// every frame in the window is internal (or unusable), the frame at
/// `fallback_depth` is used as-is.
#[derive(Clone)]
pub struct FrameWalker {
    start_depth: usize,
    lookback: usize,
    fallback_depth: usize,
    is_internal: InternalFramePredicate,
}

impl FrameWalker {
    pub fn new(start_depth: usize, lookback: usize) -> Self {
        FrameWalker {
            start_depth,
            lookback,
            fallback_depth: start_depth + lookback,
            is_internal: Arc::new(is_logging_library_frame),
        }
    }

    pub fn fallback_depth(mut self, depth: usize) -> Self {
        self.fallback_depth = depth;
        self
    }

    /// Replace the "is this frame inside logging-library code" predicate.
    pub fn internal_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Frame) -> bool + Send + Sync + 'static,
    {
        self.is_internal = Arc::new(predicate);
        self
    }
}

impl Default for FrameWalker {
    fn default() -> Self {
        FrameWalker::new(0, 3)
    }
}

impl fmt::Debug for FrameWalker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameWalker")
            .field("start_depth", &self.start_depth)
            .field("lookback", &self.lookback)
            .field("fallback_depth", &self.fallback_depth)
            .finish_non_exhaustive()
    }
}

impl CallSiteResolver for FrameWalker {
    fn resolve(&self, stack: &[Frame]) -> Option<CallSite> {
        let window = stack.iter().skip(self.start_depth).take(self.lookback);
        for frame in window {
            if (self.is_internal)(frame) {
                continue;
            }
            if let Some(site) = frame.to_call_site() {
                return Some(site);
            }
        }

        stack.get(self.fallback_depth).and_then(Frame::to_call_site)
    }
}
