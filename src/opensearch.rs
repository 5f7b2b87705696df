use crate::entry::LogEntry;
use crate::exec::{BoxError, Executor};
use async_trait::async_trait;
use reqwest::Client;

/// Where an [`OpenSearchExec`] sends its documents.
#[derive(Clone, Debug)]
enum Target {
    /// Pre-established client, base URL and index.
    Connected {
        client: Client,
        base_url: String,
        index: String,
    },
    /// `opensearch://host:port/index` or `http(s)://host:port/index`,
    /// resolved on every call.
    Url(String),
}

/// OpenSearch executor that indexes each log entry as a document via the
/// HTTP bulk API.
#[derive(Clone, Debug)]
pub struct OpenSearchExec {
    target: Target,
}

impl OpenSearchExec {
    /// Use an existing client against `base_url`, e.g. "http://localhost:9200".
    pub fn connect(client: Client, base_url: impl Into<String>, index: impl Into<String>) -> Self {
        OpenSearchExec {
            target: Target::Connected {
                client,
                base_url: base_url.into(),
                index: index.into(),
            },
        }
    }

    /// Derive the cluster address and index from `url` each time an entry
    /// is executed.
    pub fn from_url(url: impl Into<String>) -> Self {
        OpenSearchExec {
            target: Target::Url(url.into()),
        }
    }

    fn resolve(&self) -> (Client, String, String) {
        match &self.target {
            Target::Connected {
                client,
                base_url,
                index,
            } => (client.clone(), base_url.clone(), index.clone()),
            Target::Url(url) => {
                let (base_url, index) = split_url(url);
                (Client::new(), base_url, index)
            }
        }
    }
}

/// Split `scheme://host:port/index` into an HTTP base URL and index name.
/// Missing parts default to `localhost:9200` and `logs`.
pub(crate) fn split_url(url: &str) -> (String, String) {
    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("opensearch") => ("http", rest),
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", url),
    };

    let mut parts = rest.splitn(2, '/');
    let host = parts.next().filter(|h| !h.is_empty()).unwrap_or("localhost:9200");
    let index = parts
        .next()
        .map(|i| i.trim_matches('/'))
        .filter(|i| !i.is_empty())
        .unwrap_or("logs");

    (format!("{}://{}", scheme, host), index.to_string())
}

#[async_trait]
impl Executor for OpenSearchExec {
    async fn exec(&self, entry: &LogEntry) -> Result<(), BoxError> {
        let (client, base_url, index) = self.resolve();

        // Minimal bulk body with a single operation.
        let action = serde_json::json!({ "index": { "_index": &index } }).to_string() + "\n";
        let doc = serde_json::to_string(entry)? + "\n";
        let body = format!("{}{}", action, doc);

        let url = format!(
            "{}/{}/_bulk",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&index)
        );
        let resp = client
            .post(&url)
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("OpenSearch bulk insert failed with status {}: {}", status, text).into())
        }
    }
}
