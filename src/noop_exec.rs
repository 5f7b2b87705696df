use crate::entry::LogEntry;
use crate::exec::{BoxError, Executor};
use async_trait::async_trait;

/// An executor that simply drops all entries.
///
/// Useful for measuring the overhead of the hook itself without any
/// external I/O, and for unit tests that don't care about persistence.
#[derive(Clone, Default)]
pub struct NoopExec;

#[async_trait]
impl Executor for NoopExec {
    async fn exec(&self, _entry: &LogEntry) -> Result<(), BoxError> {
        Ok(())
    }
}
