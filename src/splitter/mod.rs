//! LLM-driven file partitioning.
//!
//! [`BlockSplitter`] asks the model to partition a file into logical blocks
//! through the `split_blocks` tool; [`normalize::normalize_blocks`] repairs
//! the partition into a covering, disjoint, ordered sequence.

pub mod block;
pub mod normalize;
pub mod prompt;

pub use block::{Block, BlockMetadata, RawBlock};
pub use normalize::{NormalizeReport, normalize_blocks};

use tracing::warn;

use crate::error::SplitError;
use crate::llm::{
    AnthropicClient, Message, MessagesRequest, SystemBlock, ToolChoice, ToolParseError,
    ToolRequest, split_blocks_tool,
};

/// Maximum tokens the split response may spend.
const SPLIT_MAX_TOKENS: u32 = 4096;

/// Counts the lines of a file the way the indexer slices them: `\n`
/// separated, so an empty file is one (empty) line and a trailing newline
/// produces a final empty line.
#[must_use]
pub fn count_lines(text: &str) -> u32 {
    u32::try_from(text.split('\n').count()).unwrap_or(u32::MAX)
}

/// Partitions files into raw blocks via the LLM.
#[derive(Debug, Clone)]
pub struct BlockSplitter {
    client: AnthropicClient,
    model: String,
}

impl BlockSplitter {
    /// Creates a splitter using `model` through `client`.
    #[must_use]
    pub fn new(client: AnthropicClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Splits one file into raw blocks.
    ///
    /// An empty partition from the model is replaced by a single synthetic
    /// block covering the whole file (logged as a warning). There is no
    /// retry: a failed file keeps its manifest row untouched and is
    /// reattempted on the next run.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::NotToolUse`] when the model answers in prose,
    /// [`SplitError::BadPayload`] when the tool arguments are malformed,
    /// and [`SplitError::Api`] for transport failures.
    pub async fn split(
        &self,
        text: &str,
        lang: &str,
        rel_path: &str,
    ) -> Result<Vec<RawBlock>, SplitError> {
        let total_lines = count_lines(text);
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: SPLIT_MAX_TOKENS,
            temperature: Some(0.0),
            system: vec![SystemBlock::cached(prompt::SPLIT_SYSTEM_PROMPT)],
            messages: vec![Message::cached_user_text(prompt::build_split_message(
                text,
                lang,
                rel_path,
                total_lines,
            ))],
            tools: vec![split_blocks_tool()],
            tool_choice: Some(ToolChoice::Tool {
                name: "split_blocks".to_string(),
            }),
        };

        let response = self.client.messages(&request).await?;
        let Some((name, input)) = response.first_tool_use() else {
            return Err(SplitError::NotToolUse {
                path: rel_path.to_string(),
            });
        };

        let parsed = ToolRequest::parse(name, input).map_err(|err| match err {
            ToolParseError::UnknownTool { name } => SplitError::BadPayload {
                path: rel_path.to_string(),
                message: format!("unexpected tool {name}"),
            },
            ToolParseError::InvalidArguments { source } => SplitError::BadPayload {
                path: rel_path.to_string(),
                message: source.to_string(),
            },
        })?;

        let ToolRequest::SplitBlocks(args) = parsed;
        if args.blocks.is_empty() {
            warn!(path = %rel_path, "model returned an empty partition, using fallback block");
            return Ok(vec![RawBlock::fallback(total_lines)]);
        }
        Ok(args.blocks)
    }
}
