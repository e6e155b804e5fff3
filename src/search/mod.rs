//! Hybrid retrieval engine: rank fusion and the query-time retriever.

pub mod fusion;
pub mod retriever;

pub use fusion::{RRF_K, rrf_fuse};
pub use retriever::{
    HybridRetriever, MAX_TOP_N, SearchHit, SearchRequest, bm25_body, knn_body, normalize_prefix,
    shortlist_size,
};
