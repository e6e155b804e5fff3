//! Block metadata → chunk document transformation.
//!
//! Every field of a chunk document is assembled here, in one place, from
//! the scanned file, the normalized block, and the block's embedding.
//! Nothing else writes chunk fields, so schema drift between the splitter
//! payload and the persisted documents cannot happen silently.

use crate::scanner::{language_for_extension, mime_for_extension};
use crate::splitter::{Block, count_lines};
use crate::store::ChunkDocument;

/// A file read for indexing, with its derived attributes.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Repo-relative POSIX path.
    pub rel_path: String,
    /// Git blob fingerprint of the content.
    pub hash: String,
    /// Full decoded text.
    pub text: String,
    /// Size in bytes.
    pub size: u64,
    /// Line count (`\n`-separated).
    pub lines: u32,
    /// Lowercase extension without the dot ("" when absent).
    pub extension: String,
    /// File name component of the path.
    pub filename: String,
    /// Mime type derived from the extension.
    pub mime: String,
    /// Language derived from the extension.
    pub lang: String,
}

impl FileRecord {
    /// Builds a record from a scanned file's path, fingerprint and text.
    #[must_use]
    pub fn new(rel_path: impl Into<String>, hash: impl Into<String>, text: String, size: u64) -> Self {
        let rel_path = rel_path.into();
        let filename = rel_path
            .rsplit('/')
            .next()
            .unwrap_or(rel_path.as_str())
            .to_string();
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let lines = count_lines(&text);
        Self {
            hash: hash.into(),
            mime: mime_for_extension(&extension).to_string(),
            lang: language_for_extension(&extension).to_string(),
            rel_path,
            text,
            size,
            lines,
            extension,
            filename,
        }
    }
}

/// Extracts the exact text of a block: lines `[start..=end]` (1-based)
/// joined with `\n`.
#[must_use]
pub fn block_text(lines: &[&str], start_line: u32, end_line: u32) -> String {
    let start = (start_line.max(1) as usize) - 1;
    let end = (end_line as usize).min(lines.len());
    if start >= end {
        return String::new();
    }
    lines[start..end].join("\n")
}

/// Assembles the chunk documents for a file from its normalized blocks and
/// their embeddings.
///
/// `embeddings` must be parallel to `blocks`; both come from the same
/// per-file pass. Timestamps are the caller's single "now" so every chunk
/// of a file carries identical times.
#[must_use]
pub fn build_documents(
    file: &FileRecord,
    blocks: &[Block],
    embeddings: Vec<Vec<f32>>,
    llm_version: &str,
    now: &str,
) -> Vec<ChunkDocument> {
    let lines: Vec<&str> = file.text.split('\n').collect();
    let total = u32::try_from(blocks.len()).unwrap_or(u32::MAX);

    blocks
        .iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (block, embedding))| {
            let text = block_text(&lines, block.start_line, block.end_line);
            let size = text.len() as u64;
            ChunkDocument {
                path: file.rel_path.clone(),
                hash: file.hash.clone(),
                chunk_id: u32::try_from(i + 1).unwrap_or(u32::MAX),
                chunks: total,
                text,
                embedding,
                size,
                start_line: block.start_line,
                end_line: block.end_line,
                file_size: file.size,
                file_lines: file.lines,
                extension: file.extension.clone(),
                filename: file.filename.clone(),
                mime: file.mime.clone(),
                lang: file.lang.clone(),
                created_at: now.to_string(),
                updated_at: now.to_string(),
                llm_version: llm_version.to_string(),
                title: block.meta.title.clone(),
                kind: block.meta.kind.clone(),
                symbols: block.meta.symbols.clone(),
                graph_questions: block.meta.graph_questions.clone(),
                graph_answers: block.meta.graph_answers.clone(),
                links_out: Vec::new(),
                links_in: Vec::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::BlockMetadata;

    fn file_record() -> FileRecord {
        let text = (1..=42)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let size = text.len() as u64;
        FileRecord::new("demo/main.py", "abc123", text, size)
    }

    fn block(start: u32, end: u32) -> Block {
        Block {
            start_line: start,
            end_line: end,
            meta: BlockMetadata {
                title: "functions".to_string(),
                kind: "function".to_string(),
                symbols: vec!["main".to_string()],
                graph_questions: vec!["what runs first?".to_string(), "who calls main?".to_string()],
                graph_answers: vec!["main runs first".to_string(), "the interpreter".to_string()],
            },
        }
    }

    #[test]
    fn test_file_record_derived_fields() {
        let record = file_record();
        assert_eq!(record.filename, "main.py");
        assert_eq!(record.extension, "py");
        assert_eq!(record.lang, "python");
        assert_eq!(record.mime, "text/x-python");
        assert_eq!(record.lines, 42);
    }

    #[test]
    fn test_file_record_no_extension() {
        let record = FileRecord::new("Makefile", "h", "all:\n\ttrue".to_string(), 10);
        assert_eq!(record.extension, "");
        assert_eq!(record.lang, "text");
        assert_eq!(record.filename, "Makefile");
    }

    #[test]
    fn test_block_text_exact_lines() {
        let lines = vec!["a", "b", "c", "d"];
        assert_eq!(block_text(&lines, 2, 3), "b\nc");
        assert_eq!(block_text(&lines, 1, 4), "a\nb\nc\nd");
        assert_eq!(block_text(&lines, 4, 4), "d");
    }

    #[test]
    fn test_block_text_clamps_past_end() {
        let lines = vec!["a", "b"];
        assert_eq!(block_text(&lines, 1, 10), "a\nb");
        assert_eq!(block_text(&lines, 5, 10), "");
    }

    #[test]
    fn test_build_documents_ids_and_lines() {
        let file = file_record();
        let blocks = vec![block(1, 10), block(11, 25), block(26, 42)];
        let embeddings = vec![vec![0.0f32; 4]; 3];
        let docs = build_documents(&file, &blocks, embeddings, "claude-3-haiku-20240307", "2026-01-01T00:00:00Z");

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].chunk_id, 1);
        assert_eq!(docs[2].chunk_id, 3);
        assert!(docs.iter().all(|d| d.chunks == 3));
        assert_eq!(docs[1].start_line, 11);
        assert_eq!(docs[1].end_line, 25);
        assert!(docs[1].text.starts_with("line 11"));
        assert!(docs[1].text.ends_with("line 25"));
        assert_eq!(docs[1].text.split('\n').count(), 15);
    }

    #[test]
    fn test_build_documents_echoes_file_fields() {
        let file = file_record();
        let docs = build_documents(
            &file,
            &[block(1, 42)],
            vec![vec![0.1f32; 4]],
            "claude-3-haiku-20240307",
            "2026-01-01T00:00:00Z",
        );
        let doc = &docs[0];
        assert_eq!(doc.path, "demo/main.py");
        assert_eq!(doc.hash, "abc123");
        assert_eq!(doc.file_lines, 42);
        assert_eq!(doc.file_size, file.size);
        assert_eq!(doc.lang, "python");
        assert_eq!(doc.llm_version, "claude-3-haiku-20240307");
        assert_eq!(doc.created_at, doc.updated_at);
        assert_eq!(doc.size, doc.text.len() as u64);
        assert!(doc.links_out.is_empty());
    }

    #[test]
    fn test_build_documents_carries_block_metadata() {
        let file = file_record();
        let docs = build_documents(
            &file,
            &[block(1, 42)],
            vec![vec![0.1f32; 4]],
            "m",
            "2026-01-01T00:00:00Z",
        );
        assert_eq!(docs[0].title, "functions");
        assert_eq!(docs[0].kind, "function");
        assert_eq!(docs[0].symbols, vec!["main".to_string()]);
        assert_eq!(docs[0].graph_questions.len(), 2);
        assert_eq!(docs[0].graph_answers.len(), 2);
    }
}
