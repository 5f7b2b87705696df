pub mod entry;
pub mod callsite;
pub mod queue;
pub mod exec;
pub mod options;
pub mod dispatch;
pub mod hook;
pub mod layer;

pub mod backend;
pub mod env;
pub mod init;
pub mod jsonl;
pub mod noop_exec;

#[cfg(feature = "opensearch")]
pub mod opensearch;

pub use callsite::{CallSiteResolver, Frame, FrameWalker};
pub use entry::{CallSite, Level, LogEntry};
pub use exec::{BoxError, Executor};
pub use hook::{Hook, HookError, HookStats};
pub use layer::HookLayer;
pub use noop_exec::NoopExec;
pub use options::{DiagnosticSink, Filter, HookOptions};
