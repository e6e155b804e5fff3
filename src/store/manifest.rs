//! Manifest of indexed files: `{path → fingerprint}`.
//!
//! The manifest is the authority on what is currently indexed. It lives in
//! its own index, one entry per path, id equal to the path. The pipeline
//! only writes a manifest entry after the path's chunks are durable, so a
//! failed file is naturally retried on the next run.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::client::EsClient;
use crate::error::StoreError;

/// Page size for the scrolled full scan of the manifest.
const LIST_PAGE_SIZE: usize = 1000;

/// One manifest entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Repo-relative POSIX path.
    pub path: String,
    /// Git blob fingerprint at index time.
    pub hash: String,
    /// UTC ISO-8601 timestamp of the first index of this path.
    pub created_at: String,
    /// UTC ISO-8601 timestamp of the latest index of this path.
    pub updated_at: String,
}

/// Store-backed manifest operations.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    client: Arc<EsClient>,
    index: String,
}

impl ManifestStore {
    /// Creates a manifest store over `index`.
    #[must_use]
    pub fn new(client: Arc<EsClient>, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }

    /// Lists every `{path → hash}` pair via a scrolled full scan.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on transport or status failures.
    pub async fn list(&self) -> Result<HashMap<String, String>, StoreError> {
        let body = json!({
            "size": LIST_PAGE_SIZE,
            "_source": ["path", "hash"],
            "query": {"match_all": {}},
        });
        // A manifest index that does not exist yet is an empty manifest.
        let hits = match self.client.scroll_hits(&self.index, &body).await {
            Ok(hits) => hits,
            Err(StoreError::Status { status: 404, .. }) => Vec::new(),
            Err(err) => return Err(err),
        };
        let mut map = HashMap::with_capacity(hits.len());
        for hit in hits {
            let source = hit.get("_source");
            let path = source
                .and_then(|s| s.get("path"))
                .and_then(Value::as_str);
            let hash = source
                .and_then(|s| s.get("hash"))
                .and_then(Value::as_str);
            if let (Some(path), Some(hash)) = (path, hash) {
                map.insert(path.to_string(), hash.to_string());
            }
        }
        Ok(map)
    }

    /// Fetches one manifest entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on transport or status failures.
    pub async fn get(&self, path: &str) -> Result<Option<ManifestEntry>, StoreError> {
        let Some(source) = self.client.get_doc(&self.index, path).await? else {
            return Ok(None);
        };
        let entry =
            serde_json::from_value(source).map_err(|err| StoreError::BadResponse {
                message: format!("malformed manifest entry for {path}: {err}"),
            })?;
        Ok(Some(entry))
    }

    /// Writes the manifest entry for `path` with refresh, preserving
    /// `created_at` across re-index runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on transport or status failures.
    pub async fn upsert(&self, path: &str, hash: &str) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let created_at = match self.get(path).await? {
            Some(existing) => existing.created_at,
            None => now.clone(),
        };
        let entry = ManifestEntry {
            path: path.to_string(),
            hash: hash.to_string(),
            created_at,
            updated_at: now,
        };
        let doc = serde_json::to_value(&entry).map_err(|err| StoreError::BadResponse {
            message: format!("failed to serialize manifest entry: {err}"),
        })?;
        self.client.index_doc(&self.index, path, &doc).await
    }

    /// Deletes the manifest entry for `path`. A missing entry is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on transport or status failures.
    pub async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.client.delete_doc(&self.index, path).await
    }
}
