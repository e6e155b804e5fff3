//! Tool contract between the pipeline and the LLM.
//!
//! The splitter offers exactly one tool, `split_blocks`, and forces the
//! model to call it. Incoming calls are parsed into the [`ToolRequest`]
//! variant so every use site handles the full set of tools exhaustively;
//! an unknown tool name is a parse error, not a dispatch branch.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::splitter::block::RawBlock;

/// A tool definition sent to the Messages API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's input.
    pub input_schema: Value,
}

/// Arguments of a `split_blocks` call.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitBlocksArgs {
    /// Ordered raw blocks proposed by the model.
    pub blocks: Vec<RawBlock>,
}

/// A parsed tool request from the model.
#[derive(Debug, Clone)]
pub enum ToolRequest {
    /// The model partitioned a file into blocks.
    SplitBlocks(SplitBlocksArgs),
}

/// Why a tool call could not be parsed.
#[derive(Debug, Error)]
pub enum ToolParseError {
    /// The model invoked a tool that was never offered.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// The offending tool name.
        name: String,
    },

    /// The arguments did not match the tool's schema.
    #[error("invalid tool arguments: {source}")]
    InvalidArguments {
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl ToolRequest {
    /// Parses a tool call by name and input payload.
    ///
    /// # Errors
    ///
    /// Returns [`ToolParseError::UnknownTool`] for names outside the
    /// offered set and [`ToolParseError::InvalidArguments`] when the input
    /// does not deserialize against the tool schema.
    pub fn parse(name: &str, input: &Value) -> Result<Self, ToolParseError> {
        match name {
            "split_blocks" => {
                let args = serde_json::from_value(input.clone())
                    .map_err(|source| ToolParseError::InvalidArguments { source })?;
                Ok(Self::SplitBlocks(args))
            }
            other => Err(ToolParseError::UnknownTool {
                name: other.to_string(),
            }),
        }
    }
}

/// Defines the `split_blocks` tool.
#[must_use]
pub fn split_blocks_tool() -> ToolDefinition {
    ToolDefinition {
        name: "split_blocks".to_string(),
        description: "Report the logical blocks of the file as an ordered array covering \
                       every line from 1 to the last line, without gaps or overlaps."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "blocks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "start_line": { "type": "integer", "minimum": 1 },
                            "end_line": { "type": "integer", "minimum": 1 },
                            "title": { "type": "string", "minLength": 1, "maxLength": 120 },
                            "kind": { "type": "string", "minLength": 1, "maxLength": 32 },
                            "symbols": {
                                "type": "array",
                                "items": { "type": "string" },
                                "maxItems": 20
                            },
                            "graph_questions": {
                                "type": "array",
                                "items": { "type": "string" },
                                "minItems": 2,
                                "maxItems": 5
                            },
                            "graph_answers": {
                                "type": "array",
                                "items": { "type": "string" },
                                "minItems": 2,
                                "maxItems": 5
                            }
                        },
                        "required": [
                            "start_line", "end_line", "title", "kind",
                            "symbols", "graph_questions", "graph_answers"
                        ],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["blocks"],
            "additionalProperties": false
        }),
    }
}
