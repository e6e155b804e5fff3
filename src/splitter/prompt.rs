//! System prompt and user-message builder for the block splitter.

/// System prompt instructing the model to partition a file via the
/// `split_blocks` tool. Declared cacheable by the client so repeated runs
/// over the same tree only pay for it once.
pub const SPLIT_SYSTEM_PROMPT: &str = r"You partition source files into logical blocks (functions, classes, config sections, logical groups of statements, document sections).

Rules:
- Blocks must cover every line from 1 to the last line of the file, in order, with no gaps and no overlaps.
- A block ends where the next one starts or at end of file.
- Prefer at least 10 lines per block; merge trivial neighbors instead of emitting fragments.
- kind is one of: function, class, section, paragraph, list, list_item, table, code, config. Use logic_block when nothing fits.
- title is a short human label for the block (at most 120 characters).
- symbols lists the identifiers the block defines or centrally uses (at most 20).
- graph_questions are 2 to 5 short questions a reader of OTHER code might ask that THIS block answers.
- graph_answers are 2 to 5 short statements of what this block provides or guarantees.
- Respond only by calling the split_blocks tool. Never answer in prose.";

/// Builds the user message for one file.
#[must_use]
pub fn build_split_message(text: &str, lang: &str, rel_path: &str, total_lines: u32) -> String {
    format!(
        "Split this file into logical blocks.\n\nPath: {rel_path}\nLanguage: {lang}\nTotal lines: {total_lines}\n\n```{lang}\n{text}\n```"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_split_message_carries_context() {
        let msg = build_split_message("x = 1", "python", "demo/main.py", 1);
        assert!(msg.contains("Path: demo/main.py"));
        assert!(msg.contains("Language: python"));
        assert!(msg.contains("Total lines: 1"));
        assert!(msg.contains("```python\nx = 1\n```"));
    }

    #[test]
    fn test_system_prompt_names_the_tool() {
        assert!(SPLIT_SYSTEM_PROMPT.contains("split_blocks"));
    }
}
