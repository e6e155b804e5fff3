//! Chunk-to-chunk Q/A link graph.
//!
//! A post-pass over the whole chunk set: embed every distinct graph
//! question and answer phrase once, score every ordered chunk pair by the
//! best cosine between one side's answers and the other side's questions,
//! and attach the top links per chunk in both directions. Runs as a
//! one-shot job, never concurrently with the indexer.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::embedding::{Embedder, HttpEmbedder};
use crate::error::IndexError;
use crate::store::{BulkOp, ChunkLink, EsClient};

/// Scroll page size for loading chunk signals.
const SCAN_PAGE_SIZE: usize = 1000;
/// Bulk page size for the link updates.
const UPDATE_PAGE_SIZE: usize = 1000;
/// Phrases embedded per embedding-service call.
const EMBED_BATCH_SIZE: usize = 64;

/// Q/A phrases of one chunk.
#[derive(Debug, Clone)]
struct ChunkSignals {
    id: String,
    questions: Vec<String>,
    answers: Vec<String>,
}

/// A scored directed edge candidate between two chunks.
#[derive(Debug, Clone)]
pub struct LinkEdge {
    /// Source chunk id (the answering side).
    pub source: String,
    /// Target chunk id (the asking side).
    pub target: String,
    /// Cosine similarity of the best answer/question pair.
    pub similarity: f32,
    /// The answer phrase.
    pub answer: String,
    /// The question phrase.
    pub question: String,
}

/// Counters for one graph pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphSummary {
    /// Chunks loaded.
    pub chunks: usize,
    /// Distinct phrases embedded.
    pub phrases: usize,
    /// Directed edges kept after thresholding and capping.
    pub links: usize,
}

impl std::fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "linked {} chunk(s) via {} phrase(s): {} directed link(s)",
            self.chunks, self.phrases, self.links
        )
    }
}

/// Dot product of two equal-length vectors.
///
/// The embeddings are unit-normalized, so this is the cosine similarity.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Keeps the top `max_links` edges per chunk for both directions.
///
/// Returns `(links_out, links_in)` keyed by chunk id. Each list is sorted
/// by similarity descending with ties broken by target id, so reruns over
/// identical inputs produce identical documents.
#[must_use]
pub fn select_links(
    edges: &[LinkEdge],
    max_links: usize,
) -> (HashMap<String, Vec<ChunkLink>>, HashMap<String, Vec<ChunkLink>>) {
    let mut links_out: HashMap<String, Vec<ChunkLink>> = HashMap::new();
    let mut links_in: HashMap<String, Vec<ChunkLink>> = HashMap::new();

    for edge in edges {
        links_out
            .entry(edge.source.clone())
            .or_default()
            .push(ChunkLink {
                target: edge.target.clone(),
                similarity: edge.similarity,
                answer: edge.answer.clone(),
                question: edge.question.clone(),
            });
        links_in
            .entry(edge.target.clone())
            .or_default()
            .push(ChunkLink {
                target: edge.source.clone(),
                similarity: edge.similarity,
                answer: edge.answer.clone(),
                question: edge.question.clone(),
            });
    }

    for links in links_out.values_mut().chain(links_in.values_mut()) {
        links.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.target.cmp(&b.target))
        });
        links.truncate(max_links);
    }
    (links_out, links_in)
}

/// The graph linking job.
#[derive(Debug)]
pub struct GraphLinker {
    store: Arc<EsClient>,
    embedder: Arc<HttpEmbedder>,
    chunk_index: String,
    max_links: usize,
    threshold: f32,
}

impl GraphLinker {
    /// Creates a linker over `chunk_index`.
    #[must_use]
    pub fn new(
        store: Arc<EsClient>,
        embedder: Arc<HttpEmbedder>,
        chunk_index: impl Into<String>,
        max_links: usize,
        threshold: f32,
    ) -> Self {
        Self {
            store,
            embedder,
            chunk_index: chunk_index.into(),
            max_links,
            threshold,
        }
    }

    /// Runs the full pass: load, embed, score, select, write back.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] on store or embedding failures.
    pub async fn run(&self) -> Result<GraphSummary, IndexError> {
        let started = Instant::now();
        let chunks = self.load_signals().await?;
        info!(chunks = chunks.len(), "chunk signals loaded");
        if chunks.is_empty() {
            return Ok(GraphSummary::default());
        }

        let embeddings = self.embed_phrases(&chunks).await?;
        let edges = score_pairs(&chunks, &embeddings, self.threshold);
        let (links_out, links_in) = select_links(&edges, self.max_links);
        let total_links: usize = links_out.values().map(Vec::len).sum();

        let mut ops = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let out = links_out.get(&chunk.id).cloned().unwrap_or_default();
            let inn = links_in.get(&chunk.id).cloned().unwrap_or_default();
            let doc = json!({
                "links_out": serde_json::to_value(&out).unwrap_or(Value::Null),
                "links_in": serde_json::to_value(&inn).unwrap_or(Value::Null),
            });
            ops.push(BulkOp::Update {
                index: self.chunk_index.clone(),
                id: chunk.id.clone(),
                doc,
            });
        }
        self.store.bulk(&ops, UPDATE_PAGE_SIZE).await?;

        let summary = GraphSummary {
            chunks: chunks.len(),
            phrases: embeddings.len(),
            links: total_links,
        };
        info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            chunks = summary.chunks,
            phrases = summary.phrases,
            links = summary.links,
            "graph pass complete"
        );
        Ok(summary)
    }

    /// Scrolls every chunk's Q/A phrases out of the store.
    async fn load_signals(&self) -> Result<Vec<ChunkSignals>, IndexError> {
        let body = json!({
            "size": SCAN_PAGE_SIZE,
            "_source": ["graph_questions", "graph_answers"],
            "query": {"match_all": {}},
        });
        // A chunk index that does not exist yet has nothing to link.
        let hits = match self.store.scroll_hits(&self.chunk_index, &body).await {
            Ok(hits) => hits,
            Err(crate::error::StoreError::Status { status: 404, .. }) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        let mut chunks = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(id) = hit.get("_id").and_then(Value::as_str) else {
                warn!("chunk hit without _id, skipped");
                continue;
            };
            let source = hit.get("_source");
            chunks.push(ChunkSignals {
                id: id.to_string(),
                questions: string_list(source, "graph_questions"),
                answers: string_list(source, "graph_answers"),
            });
        }
        chunks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(chunks)
    }

    /// Embeds each distinct phrase exactly once.
    async fn embed_phrases(
        &self,
        chunks: &[ChunkSignals],
    ) -> Result<BTreeMap<String, Vec<f32>>, IndexError> {
        let mut distinct: BTreeMap<String, Vec<f32>> = BTreeMap::new();
        for chunk in chunks {
            for phrase in chunk.questions.iter().chain(&chunk.answers) {
                distinct.entry(phrase.clone()).or_default();
            }
        }
        let phrases: Vec<String> = distinct.keys().cloned().collect();
        for batch in phrases.chunks(EMBED_BATCH_SIZE) {
            let vectors = self.embedder.embed_batch(batch).await?;
            for (phrase, vector) in batch.iter().zip(vectors) {
                distinct.insert(phrase.clone(), vector);
            }
        }
        Ok(distinct)
    }
}

/// Extracts a string array field from a hit `_source`.
fn string_list(source: Option<&Value>, field: &str) -> Vec<String> {
    source
        .and_then(|s| s.get(field))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Scores every ordered chunk pair and keeps the best qualifying
/// answer/question pair per edge.
///
/// The work is parallelized over source chunks; the final best-per-pair
/// reduction is sequential over a deterministic ordering so that equal
/// similarities cannot reorder results between runs.
fn score_pairs(
    chunks: &[ChunkSignals],
    embeddings: &BTreeMap<String, Vec<f32>>,
    threshold: f32,
) -> Vec<LinkEdge> {
    let mut candidates: Vec<LinkEdge> = chunks
        .par_iter()
        .enumerate()
        .flat_map_iter(|(source_idx, source)| {
            let mut found = Vec::new();
            for (target_idx, target) in chunks.iter().enumerate() {
                if source_idx == target_idx {
                    continue;
                }
                let mut best: Option<(f32, &str, &str)> = None;
                for answer in &source.answers {
                    let Some(answer_vec) = embeddings.get(answer) else {
                        continue;
                    };
                    for question in &target.questions {
                        let Some(question_vec) = embeddings.get(question) else {
                            continue;
                        };
                        let similarity = dot(answer_vec, question_vec);
                        let better = match best {
                            Some((current, ..)) => similarity > current,
                            None => true,
                        };
                        if better {
                            best = Some((similarity, answer.as_str(), question.as_str()));
                        }
                    }
                }
                if let Some((similarity, answer, question)) = best {
                    if similarity >= threshold {
                        found.push(LinkEdge {
                            source: source.id.clone(),
                            target: target.id.clone(),
                            similarity,
                            answer: answer.to_string(),
                            question: question.to_string(),
                        });
                    }
                }
            }
            found
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then_with(|| a.target.cmp(&b.target))
    });
    candidates
}
