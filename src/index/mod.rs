//! Chunk indexing: document assembly and the incremental pipeline.

pub mod document;
pub mod pipeline;

pub use document::{FileRecord, block_text, build_documents};
pub use pipeline::{BuildSummary, IndexAction, Pipeline, decide_action};
