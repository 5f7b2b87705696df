use std::sync::Arc;

use crate::exec::Executor;
use crate::jsonl::JsonLinesExec;
use crate::noop_exec::NoopExec;

/// Supported backend kinds that can be selected via DSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Noop,
    File,
    OpenSearch,
}

/// Backend configuration built from a DSN.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Selected backend implementation.
    pub kind: BackendKind,
    /// Raw DSN that was used to construct this config.
    pub dsn: String,
}

impl BackendConfig {
    pub fn new(kind: BackendKind, dsn: impl Into<String>) -> Self {
        BackendConfig { kind, dsn: dsn.into() }
    }

    /// Everything after `scheme://`.
    fn location(&self) -> &str {
        self.dsn.split_once("://").map(|(_, rest)| rest).unwrap_or(&self.dsn)
    }
}

/// Parse a DSN string and infer the backend kind from its scheme.
///
/// Examples:
/// - "noop://"
/// - "file:///var/log/app/entries.jsonl"
/// - "opensearch://127.0.0.1:9200/app-logs"
pub fn parse_dsn(dsn: &str) -> Result<BackendConfig, DsnError> {
    let lower = dsn.to_ascii_lowercase();

    if lower.starts_with("noop://") {
        Ok(BackendConfig::new(BackendKind::Noop, dsn))
    } else if lower.starts_with("file://") {
        if dsn["file://".len()..].is_empty() {
            return Err(DsnError::MissingPath);
        }
        Ok(BackendConfig::new(BackendKind::File, dsn))
    } else if lower.starts_with("opensearch://") {
        Ok(BackendConfig::new(BackendKind::OpenSearch, dsn))
    } else {
        Err(DsnError::UnknownScheme)
    }
}

/// Error type returned when parsing a DSN.
#[derive(thiserror::Error, Debug)]
pub enum DsnError {
    #[error("unknown or unsupported DSN scheme")]
    UnknownScheme,

    #[error("file DSN has no path")]
    MissingPath,
}

/// Error type returned when building an executor from configuration.
#[derive(thiserror::Error, Debug)]
pub enum BackendBuildError {
    #[error("opensearch feature is not enabled")]
    OpenSearchFeatureDisabled,

    #[error("failed to open log file: {0}")]
    File(#[from] std::io::Error),
}

/// Create a concrete [`Executor`] from a [`BackendConfig`].
///
/// This is the main entry point for applications that want to select
/// a backend using a single DSN string instead of constructing executors
/// manually.
pub fn make_exec_from_config(cfg: &BackendConfig) -> Result<Arc<dyn Executor>, BackendBuildError> {
    match cfg.kind {
        BackendKind::Noop => Ok(Arc::new(NoopExec)),
        BackendKind::File => {
            let exec = JsonLinesExec::open(cfg.location())?;
            Ok(Arc::new(exec))
        }
        BackendKind::OpenSearch => {
            #[cfg(feature = "opensearch")]
            {
                use crate::opensearch::OpenSearchExec;

                // The URL variant re-derives host and index on each call.
                Ok(Arc::new(OpenSearchExec::from_url(cfg.dsn.clone())))
            }

            #[cfg(not(feature = "opensearch"))]
            {
                let _ = cfg;
                Err(BackendBuildError::OpenSearchFeatureDisabled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_kind_from_scheme() {
        assert_eq!(parse_dsn("noop://").unwrap().kind, BackendKind::Noop);
        assert_eq!(parse_dsn("FILE:///tmp/x.jsonl").unwrap().kind, BackendKind::File);
        assert_eq!(
            parse_dsn("opensearch://localhost:9200/logs").unwrap().kind,
            BackendKind::OpenSearch
        );
        assert!(matches!(parse_dsn("mongodb://localhost"), Err(DsnError::UnknownScheme)));
        assert!(matches!(parse_dsn("file://"), Err(DsnError::MissingPath)));
    }

    #[test]
    fn file_location_strips_scheme() {
        let cfg = parse_dsn("file:///var/log/app.jsonl").unwrap();
        assert_eq!(cfg.location(), "/var/log/app.jsonl");
    }

    #[test]
    fn builds_file_executor() {
        let path = std::env::temp_dir().join(format!("log-hook-backend-{}.jsonl", std::process::id()));
        let cfg = parse_dsn(&format!("file://{}", path.display())).unwrap();
        assert!(make_exec_from_config(&cfg).is_ok());
        let _ = std::fs::remove_file(path);
    }
}
