//! Incremental indexing pipeline.
//!
//! One logical orchestrator: scan the tree, diff fingerprints against the
//! manifest, and for each changed file run the strict per-file sequence
//! split → normalize → embed → bulk-write → manifest-upsert. Files are
//! independent, so a bounded number of them may be in flight at once; the
//! manifest row for a path is only ever written after that path's chunks
//! are durable.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures_util::{StreamExt, stream};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::document::{FileRecord, build_documents};
use crate::config::Config;
use crate::embedding::{Embedder, HttpEmbedder};
use crate::error::{EmbedError, IndexError, ScanError};
use crate::llm::AnthropicClient;
use crate::scanner::{FileScanner, IgnoreMatcher, ScannedFile};
use crate::splitter::BlockSplitter;
use crate::splitter::normalize_blocks;
use crate::store::{BulkOp, EsClient, ManifestStore};

/// Bulk page size for chunk writes.
const BULK_CHUNK_SIZE: usize = 2000;

/// What the pipeline decided to do with one scanned path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAction {
    /// Fingerprint unchanged; leave everything alone.
    Skip,
    /// New path; index it and add a manifest entry.
    Index,
    /// Fingerprint changed; delete old chunks, then index anew.
    Reindex,
    /// Path is ignored or gone but was indexed; delete chunks + manifest.
    Delete,
    /// Path is ignored and was never indexed; nothing to do.
    Ignore,
}

/// Chooses the action for a path from its current and stored fingerprints.
#[must_use]
pub fn decide_action(current: Option<&str>, stored: Option<&str>) -> IndexAction {
    match (current, stored) {
        (Some(current), Some(stored)) if current == stored => IndexAction::Skip,
        (Some(_), Some(_)) => IndexAction::Reindex,
        (Some(_), None) => IndexAction::Index,
        (None, Some(_)) => IndexAction::Delete,
        (None, None) => IndexAction::Ignore,
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Regular files the scanner reported.
    pub scanned: usize,
    /// Files indexed or re-indexed.
    pub indexed: usize,
    /// Files skipped as unchanged.
    pub skipped: usize,
    /// Files whose chunks and manifest entries were deleted (ignored,
    /// disappeared, or tombstoned).
    pub deleted: usize,
    /// Files that failed and were left for the next run.
    pub failed: usize,
    /// Chunk documents written.
    pub chunks_written: usize,
}

impl std::fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scanned {} file(s): {} indexed ({} chunks), {} skipped, {} deleted, {} failed",
            self.scanned, self.indexed, self.chunks_written, self.skipped, self.deleted, self.failed
        )
    }
}

/// Per-file outcome, folded into the summary.
enum Outcome {
    Indexed { chunks: usize },
    Skipped,
    Deleted,
    Ignored,
    Failed,
}

/// The indexing pipeline with its remote clients.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    store: Arc<EsClient>,
    manifest: ManifestStore,
    splitter: BlockSplitter,
    embedder: Arc<HttpEmbedder>,
}

impl Pipeline {
    /// Builds the pipeline and its clients from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when any of the HTTP clients cannot be
    /// constructed.
    pub fn new(config: Config) -> Result<Self, IndexError> {
        let store = Arc::new(EsClient::new(
            config.es_url(),
            config.store_timeout,
            config.bulk_timeout,
        )?);
        let manifest = ManifestStore::new(Arc::clone(&store), config.manifest_index.clone());
        let llm = AnthropicClient::new(config.anthropic_api_key.clone(), config.llm_timeout)?;
        let splitter = BlockSplitter::new(llm, config.claude_model.clone());
        let embedder = Arc::new(HttpEmbedder::new(
            config.embed_url.clone(),
            config.store_timeout,
        )?);
        Ok(Self {
            config,
            store,
            manifest,
            splitter,
            embedder,
        })
    }

    /// Verifies the embedding service dimension against the index mapping.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::DimensionMismatch`] on a wrong dimension and
    /// [`EmbedError`] for transport failures. Both are fatal to the caller.
    pub async fn probe_dimension(&self) -> Result<(), EmbedError> {
        self.embedder.probe_dimension().await
    }

    /// Runs one full incremental pass over the repository root.
    ///
    /// Per-file failures are logged and counted, never fatal; the manifest
    /// for a failed file stays untouched so the next run retries it.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the manifest listing or the tombstone
    /// pass fails — conditions under which continuing would corrupt the
    /// index's view of the tree.
    pub async fn build(&self, matcher: &IgnoreMatcher) -> Result<BuildSummary, IndexError> {
        let started = Instant::now();
        let stored = self.manifest.list().await?;
        info!(manifest_entries = stored.len(), "manifest loaded");

        let mut summary = BuildSummary::default();
        let mut observed: HashSet<String> = HashSet::new();
        let mut entries: Vec<ScannedFile> = Vec::new();

        let scanner = FileScanner::new(self.config.repos_root.clone(), matcher);
        for result in scanner.scan() {
            match result {
                Ok(entry) => {
                    observed.insert(entry.rel_path.clone());
                    entries.push(entry);
                }
                Err(ScanError::Unreadable { path, source }) => {
                    warn!(path = %path, error = %source, "unreadable file, skipped");
                    observed.insert(path);
                    summary.failed += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
        summary.scanned = entries.len() + summary.failed;

        let outcomes = stream::iter(entries.into_iter().map(|entry| {
            let stored_hash = stored.get(&entry.rel_path).cloned();
            self.process_entry(entry, stored_hash)
        }))
        .buffer_unordered(self.config.file_workers)
        .collect::<Vec<Outcome>>()
        .await;

        for outcome in outcomes {
            match outcome {
                Outcome::Indexed { chunks } => {
                    summary.indexed += 1;
                    summary.chunks_written += chunks;
                }
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Deleted => summary.deleted += 1,
                Outcome::Ignored => {}
                Outcome::Failed => summary.failed += 1,
            }
        }

        // Tombstone every manifest path the scan did not observe.
        for path in stored.keys() {
            if !observed.contains(path) {
                info!(path = %path, "tombstoning vanished path");
                self.delete_chunks(path).await?;
                self.manifest.delete(path).await?;
                summary.deleted += 1;
            }
        }

        info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            indexed = summary.indexed,
            skipped = summary.skipped,
            deleted = summary.deleted,
            failed = summary.failed,
            "build complete"
        );
        Ok(summary)
    }

    /// Handles one scanned path end to end.
    async fn process_entry(&self, entry: ScannedFile, stored_hash: Option<String>) -> Outcome {
        let path = entry.rel_path.as_str();
        match decide_action(entry.fingerprint.as_deref(), stored_hash.as_deref()) {
            IndexAction::Skip => {
                debug!(path = %path, "skipped (unchanged)");
                Outcome::Skipped
            }
            IndexAction::Ignore => Outcome::Ignored,
            IndexAction::Delete => match self.delete_file(path).await {
                Ok(()) => Outcome::Deleted,
                Err(err) => {
                    error!(path = %path, error = %err, "delete failed");
                    Outcome::Failed
                }
            },
            IndexAction::Reindex => {
                if let Err(err) = self.delete_chunks(path).await {
                    error!(path = %path, error = %err, "stale chunk delete failed");
                    return Outcome::Failed;
                }
                self.index_file(entry).await
            }
            IndexAction::Index => self.index_file(entry).await,
        }
    }

    /// Deletes a path's chunks and manifest entry.
    async fn delete_file(&self, path: &str) -> Result<(), IndexError> {
        let started = Instant::now();
        self.delete_chunks(path).await?;
        self.manifest.delete(path).await?;
        info!(
            path = %path,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "deleted"
        );
        Ok(())
    }

    /// Deletes every chunk owned by `path`.
    async fn delete_chunks(&self, path: &str) -> Result<(), IndexError> {
        self.store
            .delete_by_query(&self.config.chunk_index, &json!({"term": {"path": path}}))
            .await?;
        Ok(())
    }

    /// Splits, embeds and writes one file, then records it in the manifest.
    async fn index_file(&self, entry: ScannedFile) -> Outcome {
        let started = Instant::now();
        let path = entry.rel_path.clone();
        let Some(hash) = entry.fingerprint else {
            return Outcome::Ignored;
        };
        match self.try_index_file(&path, hash, entry.size).await {
            Ok(chunks) => {
                info!(
                    path = %path,
                    chunks,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "added"
                );
                Outcome::Indexed { chunks }
            }
            Err(err) => {
                error!(path = %path, error = %err, "index failed, manifest untouched");
                Outcome::Failed
            }
        }
    }

    /// The strict per-file sequence. Any failure leaves the manifest row
    /// untouched so the next run retries the file.
    async fn try_index_file(
        &self,
        path: &str,
        hash: String,
        size: u64,
    ) -> Result<usize, IndexError> {
        let abs = self.config.repos_root.join(path);
        let bytes = std::fs::read(&abs).map_err(|source| ScanError::Unreadable {
            path: path.to_string(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let file = FileRecord::new(path, hash, text, size);

        let raw = self.splitter.split(&file.text, &file.lang, path).await?;
        let (blocks, report) = normalize_blocks(&raw, file.lines);
        info!(
            path = %path,
            input_blocks = report.input_blocks,
            output_blocks = report.output_blocks,
            out_of_bounds = report.out_of_bounds,
            dropped = report.dropped,
            gaps = report.gaps,
            gap_lines = report.gap_lines,
            overlaps = report.overlaps,
            overlap_lines = report.overlap_lines,
            raw_coverage_pct = report.raw_coverage_pct,
            "normalized"
        );

        let lines: Vec<&str> = file.text.split('\n').collect();
        let texts: Vec<String> = blocks
            .iter()
            .map(|b| super::document::block_text(&lines, b.start_line, b.end_line))
            .collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let docs = build_documents(&file, &blocks, embeddings, &self.config.claude_model, &now);

        let mut ops: Vec<BulkOp> = Vec::with_capacity(docs.len());
        for doc in &docs {
            let value = serde_json::to_value(doc).map_err(|err| {
                IndexError::Store(crate::error::StoreError::BadResponse {
                    message: format!("failed to serialize chunk document: {err}"),
                })
            })?;
            ops.push(BulkOp::Index {
                index: self.config.chunk_index.clone(),
                id: crate::store::chunk_doc_id(&doc.path, doc.chunk_id, doc.chunks),
                doc: value,
            });
        }
        self.store.bulk(&ops, BULK_CHUNK_SIZE).await?;

        self.manifest.upsert(path, &file.hash).await?;
        Ok(docs.len())
    }
}
