use crate::entry::LogEntry;
use async_trait::async_trait;
use std::error::Error;

/// Error type returned by [`Executor`] implementations.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Execution backend that persists a single [`LogEntry`].
///
/// Implementations are responsible for transporting entries to a concrete
/// store (a document database, a file, a remote index). The hook calls
/// `exec` from one of its worker threads and never on the thread that
/// produced the log line.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Persist one entry.
    ///
    /// **Returns**
    /// - `Ok(())` if the entry was accepted by the backend.
    /// - `Err(..)` if the backend failed. The hook reports the error to its
    ///   diagnostic sink and drops the entry; there is no retry.
    ///
    /// A call that never returns occupies one worker for good, so
    /// implementations should bound their own I/O.
    async fn exec(&self, entry: &LogEntry) -> Result<(), BoxError>;

    /// Release backend resources once the hook has been flushed.
    ///
    /// Default implementation is a no-op.
    async fn close(&self) -> Result<(), BoxError> {
        Ok(())
    }
}
