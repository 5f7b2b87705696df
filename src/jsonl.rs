use crate::entry::LogEntry;
use crate::exec::{BoxError, Executor};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

/// File-backed executor writing one JSON document per line.
///
/// The writer is shared by all hook workers, so each line is written
/// under a lock.
pub struct JsonLinesExec<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesExec<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesExec {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the executor and hand back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl JsonLinesExec<File> {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(JsonLinesExec::new(file))
    }
}

#[async_trait]
impl<W: Write + Send> Executor for JsonLinesExec<W> {
    async fn exec(&self, entry: &LogEntry) -> Result<(), BoxError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().map_err(|_| "jsonl writer lock poisoned")?;
        writer.write_all(&line)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BoxError> {
        let mut writer = self.writer.lock().map_err(|_| "jsonl writer lock poisoned")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Level;

    #[tokio::test]
    async fn writes_one_document_per_line() {
        let exec = JsonLinesExec::new(Vec::new());
        exec.exec(&LogEntry::new(Level::Info, "first").with_field("n", 1))
            .await
            .unwrap();
        exec.exec(&LogEntry::new(Level::Error, "second")).await.unwrap();
        exec.close().await.unwrap();

        let out = String::from_utf8(exec.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["message"], "first");
        assert_eq!(lines[0]["fields"]["n"], 1);
        assert_eq!(lines[1]["level"], "error");
    }
}
