//! Block types: raw LLM output and the normalized form.

use serde::{Deserialize, Serialize};

/// Title used for synthetic fallback blocks.
pub const FALLBACK_TITLE: &str = "logic";
/// Kind used for synthetic fallback blocks.
pub const FALLBACK_KIND: &str = "logic_block";

/// A block exactly as proposed by the LLM, before normalization.
///
/// Line numbers are deserialized as wide signed integers: the model is
/// instructed to stay within `[1..N]` but frequently does not, and the
/// normalizer owns the repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBlock {
    /// Proposed first line (1-based, may be out of range).
    pub start_line: i64,
    /// Proposed last line (1-based, inclusive, may be out of range).
    pub end_line: i64,
    /// Short block title.
    pub title: String,
    /// Block kind from the open vocabulary.
    pub kind: String,
    /// Symbols defined or referenced in the block.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Questions other code might ask that this block answers.
    #[serde(default)]
    pub graph_questions: Vec<String>,
    /// Answers this block offers to questions elsewhere.
    #[serde(default)]
    pub graph_answers: Vec<String>,
}

impl RawBlock {
    /// Synthetic block covering the whole file, used when the model
    /// returns an empty partition.
    #[must_use]
    pub fn fallback(total_lines: u32) -> Self {
        Self {
            start_line: 1,
            end_line: i64::from(total_lines),
            title: FALLBACK_TITLE.to_string(),
            kind: FALLBACK_KIND.to_string(),
            symbols: Vec::new(),
            graph_questions: Vec::new(),
            graph_answers: Vec::new(),
        }
    }
}

/// Splitter metadata carried from a block into its chunk document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockMetadata {
    /// Short block title.
    pub title: String,
    /// Block kind.
    pub kind: String,
    /// Symbols defined or referenced in the block.
    pub symbols: Vec<String>,
    /// Graph questions.
    pub graph_questions: Vec<String>,
    /// Graph answers.
    pub graph_answers: Vec<String>,
}

impl BlockMetadata {
    /// Extracts the metadata of a raw block.
    #[must_use]
    pub fn from_raw(raw: &RawBlock) -> Self {
        Self {
            title: raw.title.clone(),
            kind: raw.kind.clone(),
            symbols: raw.symbols.clone(),
            graph_questions: raw.graph_questions.clone(),
            graph_answers: raw.graph_answers.clone(),
        }
    }

    /// Metadata of a synthetic fallback block.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            kind: FALLBACK_KIND.to_string(),
            ..Self::default()
        }
    }
}

/// A normalized block: in range, ordered, disjoint, contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// First line (1-based, inclusive).
    pub start_line: u32,
    /// Last line (1-based, inclusive).
    pub end_line: u32,
    /// Splitter metadata.
    pub meta: BlockMetadata,
}

impl Block {
    /// Number of lines the block spans.
    #[must_use]
    pub const fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }

    /// Synthetic block covering `[1..total_lines]`.
    #[must_use]
    pub fn fallback(total_lines: u32) -> Self {
        Self {
            start_line: 1,
            end_line: total_lines.max(1),
            meta: BlockMetadata::fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_fallback_spans_file() {
        let raw = RawBlock::fallback(42);
        assert_eq!(raw.start_line, 1);
        assert_eq!(raw.end_line, 42);
        assert_eq!(raw.title, "logic");
        assert_eq!(raw.kind, "logic_block");
        assert!(raw.symbols.is_empty());
    }

    #[test]
    fn test_block_line_count() {
        let block = Block {
            start_line: 11,
            end_line: 25,
            meta: BlockMetadata::default(),
        };
        assert_eq!(block.line_count(), 15);
    }

    #[test]
    fn test_raw_block_deserializes_with_missing_lists() {
        let raw: RawBlock = serde_json::from_value(serde_json::json!({
            "start_line": 1,
            "end_line": 3,
            "title": "t",
            "kind": "code"
        }))
        .unwrap_or_else(|_| unreachable!());
        assert!(raw.symbols.is_empty());
        assert!(raw.graph_questions.is_empty());
    }

    #[test]
    fn test_raw_block_accepts_out_of_range_lines() {
        let raw: RawBlock = serde_json::from_value(serde_json::json!({
            "start_line": -3,
            "end_line": 9000,
            "title": "t",
            "kind": "code"
        }))
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(raw.start_line, -3);
        assert_eq!(raw.end_line, 9000);
    }
}
