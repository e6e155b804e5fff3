//! Chunk document schema and identifiers.
//!
//! A chunk is the persisted form of one normalized block: the exact joined
//! source lines, their dense embedding, the file-level echo fields, the
//! splitter metadata, and (after the graph pass) the Q/A link lists. Chunks
//! are never mutated in place; a changed file replaces all of its chunks.

use serde::{Deserialize, Serialize};

/// Dimension of the dense embedding vector the chunk index is mapped for.
pub const EMBEDDING_DIM: usize = 1024;

/// A directed Q/A link between two chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkLink {
    /// Document id of the linked chunk.
    pub target: String,
    /// Cosine similarity between the answer and question embeddings.
    pub similarity: f32,
    /// The answer phrase on the source side.
    pub answer: String,
    /// The question phrase on the target side.
    pub question: String,
}

/// A persisted chunk document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkDocument {
    /// Repo-relative POSIX path of the owning file.
    pub path: String,
    /// Git blob fingerprint of the owning file at index time.
    pub hash: String,
    /// 1-based ordinal of this chunk within the file.
    pub chunk_id: u32,
    /// Total number of chunks the file produced.
    pub chunks: u32,

    /// Exact joined source lines of the block.
    pub text: String,
    /// Unit-normalized dense vector of `text`.
    pub embedding: Vec<f32>,
    /// Byte length of `text`.
    pub size: u64,
    /// First line of the block (1-based, inclusive).
    pub start_line: u32,
    /// Last line of the block (1-based, inclusive).
    pub end_line: u32,

    /// Owning file size in bytes.
    pub file_size: u64,
    /// Owning file line count.
    pub file_lines: u32,
    /// Lowercase extension without the dot.
    pub extension: String,
    /// File name component of `path`.
    pub filename: String,
    /// Mime type derived from the extension.
    pub mime: String,
    /// Language derived from the extension.
    pub lang: String,
    /// UTC ISO-8601 creation timestamp.
    pub created_at: String,
    /// UTC ISO-8601 update timestamp.
    pub updated_at: String,
    /// LLM model identifier that produced the block partition.
    pub llm_version: String,

    /// Block title from the splitter.
    pub title: String,
    /// Block kind from the splitter.
    pub kind: String,
    /// Symbols the splitter attributed to the block.
    pub symbols: Vec<String>,
    /// Questions this block answers elsewhere in the graph.
    pub graph_questions: Vec<String>,
    /// Answers this block offers to questions elsewhere in the graph.
    pub graph_answers: Vec<String>,

    /// Outgoing Q/A links (this chunk's answers → other chunks' questions).
    #[serde(default)]
    pub links_out: Vec<ChunkLink>,
    /// Incoming Q/A links (other chunks' answers → this chunk's questions).
    #[serde(default)]
    pub links_in: Vec<ChunkLink>,
}

/// Formats the document id for chunk `ordinal` of `total` in `path`.
#[must_use]
pub fn chunk_doc_id(path: &str, ordinal: u32, total: u32) -> String {
    format!("{path}#{ordinal}/{total}")
}

/// Splits a chunk document id back into `(path, ordinal, total)`.
///
/// Returns `None` for ids that do not follow the `{path}#{i}/{total}`
/// format.
#[must_use]
pub fn parse_chunk_id(id: &str) -> Option<(&str, u32, u32)> {
    let (path, rest) = id.rsplit_once('#')?;
    let (ordinal, total) = rest.split_once('/')?;
    Some((path, ordinal.parse().ok()?, total.parse().ok()?))
}
