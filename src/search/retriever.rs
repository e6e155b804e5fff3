//! Hybrid retrieval: BM25 + kNN, fused with RRF, optionally reranked.
//!
//! Query-time only: read-only, idempotent, never writes to the index and
//! never calls the LLM. Zero hits from both retrievals is an empty result,
//! not an error.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::fusion::rrf_fuse;
use crate::embedding::{Embedder, HttpEmbedder, HttpReranker};
use crate::error::RetrievalError;
use crate::store::{ChunkLink, EsClient};

/// Upper bound on `top_n`.
pub const MAX_TOP_N: usize = 60;
/// Shortlist floor when the reranker is enabled.
const MIN_RERANK_SHORTLIST: usize = 32;
/// Shortlist multiplier when the reranker is enabled.
const RERANK_SHORTLIST_FACTOR: usize = 6;
/// kNN candidate multiplier.
const KNN_CANDIDATE_FACTOR: usize = 4;

/// Source fields projected into results. `chunk_id` is not listed: the
/// result's `chunk_id` is the document id itself.
const SOURCE_FIELDS: [&str; 13] = [
    "text",
    "path",
    "start_line",
    "end_line",
    "title",
    "symbols",
    "lang",
    "mime",
    "file_lines",
    "kind",
    "links_in",
    "links_out",
    "chunks",
];

/// A retrieval request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// The question text.
    pub question: String,
    /// Path prefix filter; empty means no filter. `*` is stripped and
    /// leading `/` and `.` are trimmed.
    pub path_prefix: String,
    /// Number of results to return (clamped to `1..=60`).
    pub top_n: usize,
    /// Optional symbol names boosting lexical retrieval.
    pub symbols: Vec<String>,
    /// Whether to rerank the shortlist with the cross-encoder.
    pub use_reranker: bool,
}

/// One projected retrieval result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Full chunk document id (`{path}#{i}/{total}`); the distinctness key.
    pub chunk_id: String,
    /// Exact chunk text.
    pub text: String,
    /// Owning file path.
    pub path: String,
    /// First line of the chunk.
    pub start_line: u32,
    /// Last line of the chunk.
    pub end_line: u32,
    /// Block title.
    pub title: String,
    /// Block symbols.
    pub symbols: Vec<String>,
    /// File language.
    pub lang: String,
    /// File mime type.
    pub mime: String,
    /// Owning file line count.
    pub file_lines: u32,
    /// Block kind.
    pub kind: String,
    /// Incoming Q/A links.
    pub links_in: Vec<ChunkLink>,
    /// Outgoing Q/A links.
    pub links_out: Vec<ChunkLink>,
    /// Total chunks in the owning file.
    pub chunks: u32,
}

/// `_source` shape for projection, tolerant of missing fields.
#[derive(Debug, Default, Deserialize)]
struct SourceDoc {
    #[serde(default)]
    text: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    start_line: u32,
    #[serde(default)]
    end_line: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    symbols: Vec<String>,
    #[serde(default)]
    lang: String,
    #[serde(default)]
    mime: String,
    #[serde(default)]
    file_lines: u32,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    links_in: Vec<ChunkLink>,
    #[serde(default)]
    links_out: Vec<ChunkLink>,
    #[serde(default)]
    chunks: u32,
}

/// Normalizes a path prefix: strips `*` and trims leading `/` and `.`.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    prefix
        .trim()
        .replace('*', "")
        .trim_start_matches(['/', '.'])
        .to_string()
}

/// Shortlist size for a request: `max(6·top_n, 32)` when reranking, else
/// `top_n`.
#[must_use]
pub fn shortlist_size(top_n: usize, use_reranker: bool) -> usize {
    if use_reranker {
        (RERANK_SHORTLIST_FACTOR * top_n).max(MIN_RERANK_SHORTLIST)
    } else {
        top_n
    }
}

/// Builds the BM25 search body.
#[must_use]
pub fn bm25_body(question: &str, prefix: &str, symbols: &[String], size: usize) -> Value {
    let mut bool_query = json!({
        "must": [{
            "multi_match": {
                "query": question,
                "fields": ["text^1.0", "text.ru^1.3", "text.en^1.2"],
            }
        }],
    });
    if !prefix.is_empty() {
        bool_query["filter"] = json!([{"prefix": {"path": prefix}}]);
    }
    if !symbols.is_empty() {
        let lowered: Vec<String> = symbols.iter().map(|s| s.to_lowercase()).collect();
        bool_query["should"] = json!([{"terms": {"symbols": lowered}}]);
    }
    json!({
        "size": size,
        "_source": SOURCE_FIELDS,
        "query": {"bool": bool_query},
    })
}

/// Builds the kNN search body.
#[must_use]
pub fn knn_body(embedding: &[f32], prefix: &str, size: usize) -> Value {
    let mut knn = json!({
        "field": "embedding",
        "query_vector": embedding,
        "k": size,
        "num_candidates": KNN_CANDIDATE_FACTOR * size,
    });
    if !prefix.is_empty() {
        knn["filter"] = json!({"bool": {"filter": [{"prefix": {"path": prefix}}]}});
    }
    json!({
        "size": size,
        "_source": SOURCE_FIELDS,
        "knn": knn,
    })
}

/// Extracts `(id, _source)` pairs from a search response.
fn parse_hits(response: &Value) -> Vec<(String, Value)> {
    response
        .get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| {
                    let id = hit.get("_id")?.as_str()?.to_string();
                    let source = hit.get("_source").cloned().unwrap_or(Value::Null);
                    Some((id, source))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Projects one fused id and its `_source` into a result hit.
fn project_hit(id: &str, source: &Value) -> SearchHit {
    let doc: SourceDoc = serde_json::from_value(source.clone()).unwrap_or_default();
    SearchHit {
        chunk_id: id.to_string(),
        text: doc.text,
        path: doc.path,
        start_line: doc.start_line,
        end_line: doc.end_line,
        title: doc.title,
        symbols: doc.symbols,
        lang: doc.lang,
        mime: doc.mime,
        file_lines: doc.file_lines,
        kind: doc.kind,
        links_in: doc.links_in,
        links_out: doc.links_out,
        chunks: doc.chunks,
    }
}

/// The hybrid retriever with its remote clients.
#[derive(Debug)]
pub struct HybridRetriever {
    store: Arc<EsClient>,
    embedder: Arc<HttpEmbedder>,
    reranker: HttpReranker,
    chunk_index: String,
}

impl HybridRetriever {
    /// Creates a retriever over `chunk_index`.
    #[must_use]
    pub fn new(
        store: Arc<EsClient>,
        embedder: Arc<HttpEmbedder>,
        reranker: HttpReranker,
        chunk_index: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            reranker,
            chunk_index: chunk_index.into(),
        }
    }

    /// Runs one hybrid retrieval.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] on store, embedding, or reranker
    /// failures.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, RetrievalError> {
        let top_n = request.top_n.clamp(1, MAX_TOP_N);
        let prefix = normalize_prefix(&request.path_prefix);
        let shortlist = shortlist_size(top_n, request.use_reranker);

        let bm25 = bm25_body(&request.question, &prefix, &request.symbols, shortlist);
        let lexical = self.store.search(&self.chunk_index, &bm25);
        let dense = async {
            let embedding = self.embedder.embed(&request.question).await?;
            let body = knn_body(&embedding, &prefix, shortlist);
            Ok::<_, RetrievalError>(self.store.search(&self.chunk_index, &body).await?)
        };
        let (lexical, dense) = tokio::try_join!(
            async { Ok::<_, RetrievalError>(lexical.await?) },
            dense
        )?;

        let bm25_hits = parse_hits(&lexical);
        let knn_hits = parse_hits(&dense);
        debug!(
            bm25 = bm25_hits.len(),
            knn = knn_hits.len(),
            shortlist,
            "retrievals complete"
        );

        let bm25_ids: Vec<String> = bm25_hits.iter().map(|(id, _)| id.clone()).collect();
        let knn_ids: Vec<String> = knn_hits.iter().map(|(id, _)| id.clone()).collect();
        let fused = rrf_fuse(&[&bm25_ids, &knn_ids], shortlist);

        let mut sources: HashMap<String, Value> = HashMap::new();
        for (id, source) in bm25_hits.into_iter().chain(knn_hits) {
            sources.entry(id).or_insert(source);
        }

        let hits: Vec<SearchHit> = fused
            .iter()
            .filter_map(|id| sources.get(id).map(|source| project_hit(id, source)))
            .collect();
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        if request.use_reranker {
            let texts: Vec<String> = hits.iter().map(|h| h.text.clone()).collect();
            let order = self
                .reranker
                .rerank(&request.question, &texts, top_n)
                .await?;
            Ok(order.into_iter().filter_map(|i| hits.get(i).cloned()).collect())
        } else {
            let mut hits = hits;
            hits.truncate(top_n);
            Ok(hits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("", ""; "empty stays empty")]
    #[test_case("*", ""; "lone star stripped")]
    #[test_case("src/*", "src/"; "trailing star stripped")]
    #[test_case("/src", "src"; "leading slash trimmed")]
    #[test_case("./src", "src"; "leading dot slash trimmed")]
    #[test_case("src/indexer", "src/indexer"; "plain prefix unchanged")]
    fn test_normalize_prefix(input: &str, expected: &str) {
        assert_eq!(normalize_prefix(input), expected);
    }

    #[test_case(1, false, 1)]
    #[test_case(60, false, 60)]
    #[test_case(1, true, 32; "rerank floor")]
    #[test_case(5, true, 32; "six times five below floor")]
    #[test_case(10, true, 60; "six times ten")]
    fn test_shortlist_size(top_n: usize, rerank: bool, expected: usize) {
        assert_eq!(shortlist_size(top_n, rerank), expected);
    }

    #[test]
    fn test_bm25_body_weights() {
        let body = bm25_body("eviction policy", "", &[], 10);
        assert_eq!(body["size"], 10);
        let fields = &body["query"]["bool"]["must"][0]["multi_match"]["fields"];
        assert_eq!(
            fields,
            &json!(["text^1.0", "text.ru^1.3", "text.en^1.2"])
        );
        assert!(body["query"]["bool"].get("filter").is_none());
        assert!(body["query"]["bool"].get("should").is_none());
    }

    #[test]
    fn test_bm25_body_symbols_lowercased() {
        let body = bm25_body("q", "", &["LruCache".to_string(), "GET".to_string()], 5);
        let terms = &body["query"]["bool"]["should"][0]["terms"]["symbols"];
        assert_eq!(terms, &json!(["lrucache", "get"]));
    }

    #[test]
    fn test_bm25_body_prefix_filter() {
        let body = bm25_body("q", "src/", &[], 5);
        assert_eq!(
            body["query"]["bool"]["filter"][0]["prefix"]["path"],
            "src/"
        );
    }

    #[test]
    fn test_knn_body_candidates() {
        let body = knn_body(&[0.1, 0.2], "", 32);
        assert_eq!(body["knn"]["k"], 32);
        assert_eq!(body["knn"]["num_candidates"], 128);
        assert_eq!(body["knn"]["field"], "embedding");
        assert!(body["knn"].get("filter").is_none());
    }

    #[test]
    fn test_knn_body_filter() {
        let body = knn_body(&[0.1], "lib/", 8);
        assert_eq!(
            body["knn"]["filter"]["bool"]["filter"][0]["prefix"]["path"],
            "lib/"
        );
    }

    #[test]
    fn test_source_fields_match_projection_whitelist() {
        // Every projected field except the id-derived chunk_id is fetched.
        for field in [
            "text", "path", "start_line", "end_line", "title", "symbols", "lang", "mime",
            "file_lines", "kind", "links_in", "links_out", "chunks",
        ] {
            assert!(SOURCE_FIELDS.contains(&field), "missing {field}");
        }
        assert!(!SOURCE_FIELDS.contains(&"embedding"));
        assert!(!SOURCE_FIELDS.contains(&"hash"));
    }

    #[test]
    fn test_parse_hits() {
        let response = json!({
            "hits": {"hits": [
                {"_id": "a#1/2", "_score": 3.2, "_source": {"text": "alpha"}},
                {"_id": "a#2/2", "_score": 1.1, "_source": {"text": "beta"}},
            ]}
        });
        let hits = parse_hits(&response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, "a#1/2");
        assert_eq!(hits[1].1["text"], "beta");
    }

    #[test]
    fn test_parse_hits_empty_response() {
        assert!(parse_hits(&json!({})).is_empty());
        assert!(parse_hits(&json!({"hits": {"hits": []}})).is_empty());
    }

    #[test]
    fn test_project_hit_full_source() {
        let source = json!({
            "text": "fn evict()",
            "path": "cache/lru.rs",
            "start_line": 10,
            "end_line": 20,
            "title": "eviction",
            "symbols": ["evict"],
            "lang": "rust",
            "mime": "text/x-rust",
            "file_lines": 100,
            "kind": "function",
            "links_in": [],
            "links_out": [{"target": "b#1/1", "similarity": 0.8, "answer": "a", "question": "q"}],
            "chunks": 4,
        });
        let hit = project_hit("cache/lru.rs#2/4", &source);
        assert_eq!(hit.chunk_id, "cache/lru.rs#2/4");
        assert_eq!(hit.path, "cache/lru.rs");
        assert_eq!(hit.start_line, 10);
        assert_eq!(hit.links_out.len(), 1);
        assert_eq!(hit.chunks, 4);
    }

    #[test]
    fn test_project_hit_tolerates_missing_fields() {
        let hit = project_hit("x#1/1", &json!({"text": "t"}));
        assert_eq!(hit.text, "t");
        assert_eq!(hit.path, "");
        assert!(hit.links_in.is_empty());
    }

    #[test]
    fn test_projection_excludes_embedding() {
        let hit = project_hit("x#1/1", &json!({"text": "t", "embedding": [0.1, 0.2]}));
        let value = serde_json::to_value(&hit).unwrap_or_else(|_| unreachable!());
        assert!(value.get("embedding").is_none());
        assert!(value.get("chunk_id").is_some());
    }
}
