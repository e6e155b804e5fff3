//! LLM integration: Messages API wire types, the tool contract, and the
//! HTTP client.
//!
//! The pipeline talks to exactly one remote LLM and offers it exactly one
//! tool. Everything here is transport and typing; splitting semantics live
//! in [`crate::splitter`].

pub mod client;
pub mod message;
pub mod tool;

pub use client::AnthropicClient;
pub use message::{
    CacheControl, ContentBlock, Message, MessagesRequest, MessagesResponse, Role, SystemBlock,
    ToolChoice, Usage,
};
pub use tool::{SplitBlocksArgs, ToolDefinition, ToolParseError, ToolRequest, split_blocks_tool};
