//! Thin REST client for the document store.
//!
//! Speaks the Elasticsearch wire protocol over JSON: search (with kNN),
//! bulk NDJSON writes, delete-by-query with `conflicts=proceed`, scrolled
//! scans, and single-document reads and writes with refresh. The client is
//! deliberately schema-free; typed mapping lives with the callers.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use crate::error::StoreError;

/// Scroll context keep-alive window.
const SCROLL_KEEP_ALIVE: &str = "5m";
/// Maximum response body bytes echoed into error messages.
const ERROR_BODY_LIMIT: usize = 2048;

/// One operation in a bulk request.
#[derive(Debug, Clone)]
pub enum BulkOp {
    /// Index (create or replace) a document.
    Index {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
        /// Full document body.
        doc: Value,
    },
    /// Partial update of an existing document.
    Update {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
        /// Fields to merge into the document.
        doc: Value,
    },
}

impl BulkOp {
    /// Appends this operation's NDJSON lines to `out`.
    fn write_ndjson(&self, out: &mut String) {
        match self {
            Self::Index { index, id, doc } => {
                let action = json!({"index": {"_index": index, "_id": id}});
                out.push_str(&action.to_string());
                out.push('\n');
                out.push_str(&doc.to_string());
                out.push('\n');
            }
            Self::Update { index, id, doc } => {
                let action = json!({"update": {"_index": index, "_id": id}});
                out.push_str(&action.to_string());
                out.push('\n');
                out.push_str(&json!({ "doc": doc }).to_string());
                out.push('\n');
            }
        }
    }
}

/// Builds the NDJSON body for a slice of bulk operations.
#[must_use]
pub fn bulk_body(ops: &[BulkOp]) -> String {
    let mut body = String::new();
    for op in ops {
        op.write_ndjson(&mut body);
    }
    body
}

/// REST client for one document store.
#[derive(Debug, Clone)]
pub struct EsClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    bulk_timeout: Duration,
}

impl EsClient {
    /// Creates a client for the store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        bulk_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            bulk_timeout,
        })
    }

    /// Maps a response to an error unless its status is a success.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let mut body = response.text().await.unwrap_or_default();
        body.truncate(ERROR_BODY_LIMIT);
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Runs a search request against `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on transport failures or non-success statuses.
    pub async fn search(&self, index: &str, body: &Value) -> Result<Value, StoreError> {
        let url = format!("{}/{}/_search", self.base_url, index);
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Runs a scrolled scan over `index` and returns every hit.
    ///
    /// `body` must carry its own `size` (the page size) and `_source`
    /// selection. The scroll context is cleared before returning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on transport failures, non-success statuses,
    /// or a response without the scroll id.
    pub async fn scroll_hits(&self, index: &str, body: &Value) -> Result<Vec<Value>, StoreError> {
        let url = format!(
            "{}/{}/_search?scroll={SCROLL_KEEP_ALIVE}",
            self.base_url, index
        );
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;
        let mut page: Value = Self::check(response).await?.json().await?;

        let mut all_hits = Vec::new();
        loop {
            let scroll_id = page
                .get("_scroll_id")
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::BadResponse {
                    message: "scroll response missing _scroll_id".to_string(),
                })?
                .to_string();
            let hits = page
                .get("hits")
                .and_then(|h| h.get("hits"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if hits.is_empty() {
                self.clear_scroll(&scroll_id).await;
                break;
            }
            all_hits.extend(hits);

            let response = self
                .http
                .post(format!("{}/_search/scroll", self.base_url))
                .timeout(self.timeout)
                .json(&json!({"scroll": SCROLL_KEEP_ALIVE, "scroll_id": scroll_id}))
                .send()
                .await?;
            page = Self::check(response).await?.json().await?;
        }
        Ok(all_hits)
    }

    /// Clears a scroll context; failures are logged and swallowed since the
    /// context expires on its own.
    async fn clear_scroll(&self, scroll_id: &str) {
        let result = self
            .http
            .delete(format!("{}/_search/scroll", self.base_url))
            .timeout(self.timeout)
            .json(&json!({"scroll_id": [scroll_id]}))
            .send()
            .await;
        if let Err(err) = result {
            debug!(error = %err, "failed to clear scroll context");
        }
    }

    /// Indexes (creates or replaces) a single document with refresh, so the
    /// next read observes the write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on transport failures or non-success statuses.
    pub async fn index_doc(&self, index: &str, id: &str, doc: &Value) -> Result<(), StoreError> {
        let url = format!(
            "{}/{}/_doc/{}?refresh=true",
            self.base_url,
            index,
            urlencoding::encode(id)
        );
        let response = self
            .http
            .put(&url)
            .timeout(self.timeout)
            .json(doc)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Fetches a single document's `_source`, or `None` when it does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on transport failures or non-success,
    /// non-404 statuses.
    pub async fn get_doc(&self, index: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let url = format!(
            "{}/{}/_doc/{}",
            self.base_url,
            index,
            urlencoding::encode(id)
        );
        let response = self.http.get(&url).timeout(self.timeout).send().await?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let body: Value = Self::check(response).await?.json().await?;
        Ok(body.get("_source").cloned())
    }

    /// Deletes a single document with refresh. A missing document is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on transport failures or non-success,
    /// non-404 statuses.
    pub async fn delete_doc(&self, index: &str, id: &str) -> Result<(), StoreError> {
        let url = format!(
            "{}/{}/_doc/{}?refresh=true",
            self.base_url,
            index,
            urlencoding::encode(id)
        );
        let response = self.http.delete(&url).timeout(self.timeout).send().await?;
        if response.status().as_u16() == 404 {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    /// Deletes every document matching `query`, proceeding past version
    /// conflicts and refreshing so subsequent reads observe the deletes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on transport failures or non-success statuses.
    pub async fn delete_by_query(&self, index: &str, query: &Value) -> Result<(), StoreError> {
        let url = format!(
            "{}/{}/_delete_by_query?conflicts=proceed&refresh=true",
            self.base_url, index
        );
        let response = self
            .http
            .post(&url)
            .timeout(self.bulk_timeout)
            .json(&json!({ "query": query }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Executes bulk operations in pages of `chunk_size`, failing on the
    /// first page with item-level errors.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BulkItems`] when the store reports failed
    /// items, and [`StoreError`] for transport or status failures.
    pub async fn bulk(&self, ops: &[BulkOp], chunk_size: usize) -> Result<(), StoreError> {
        for page in ops.chunks(chunk_size.max(1)) {
            let body = bulk_body(page);
            let response = self
                .http
                .post(format!("{}/_bulk", self.base_url))
                .timeout(self.bulk_timeout)
                .header("content-type", "application/x-ndjson")
                .body(body)
                .send()
                .await?;
            let parsed: Value = Self::check(response).await?.json().await?;
            if parsed.get("errors").and_then(Value::as_bool) == Some(true) {
                let (failed, first) = summarize_bulk_errors(&parsed);
                return Err(StoreError::BulkItems { failed, first });
            }
        }
        Ok(())
    }
}

/// Counts failed items in a bulk response and extracts the first error.
fn summarize_bulk_errors(response: &Value) -> (usize, String) {
    let mut failed = 0;
    let mut first = String::new();
    if let Some(items) = response.get("items").and_then(Value::as_array) {
        for item in items {
            let op = item
                .get("index")
                .or_else(|| item.get("update"))
                .or_else(|| item.get("delete"));
            if let Some(error) = op.and_then(|op| op.get("error")) {
                failed += 1;
                if first.is_empty() {
                    first = error.to_string();
                }
            }
        }
    }
    (failed.max(1), first)
}
