//! Wire types for the Anthropic Messages API.
//!
//! Only the subset the splitter needs: system blocks and user content with
//! prompt caching markers, tool definitions with a forced tool choice, and
//! response content blocks carrying `tool_use`. Streaming is deliberately
//! absent; the splitter consumes complete responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tool::ToolDefinition;

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// Prompt-cache marker attached to a content block.
///
/// Caching is an optimization only: removing the markers changes costs,
/// never observable outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheControl {
    /// Ephemeral cache entry (the only kind the API currently accepts).
    Ephemeral,
}

/// One content block in a message or response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text, optionally marked cacheable.
    Text {
        /// The text payload.
        text: String,
        /// Cache marker; requests only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    /// A tool invocation requested by the model.
    ToolUse {
        /// Provider-assigned call id.
        id: String,
        /// Tool name.
        name: String,
        /// Tool arguments as parsed JSON.
        input: Value,
    },
}

/// A system-prompt block, optionally marked cacheable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemBlock {
    /// Always `"text"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The system prompt text.
    pub text: String,
    /// Cache marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

impl SystemBlock {
    /// Creates a cacheable system block.
    #[must_use]
    pub fn cached(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
            cache_control: Some(CacheControl::Ephemeral),
        }
    }
}

/// A single conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Sender role.
    pub role: Role,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Creates a user message with one cacheable text block.
    #[must_use]
    pub fn cached_user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text {
                text: text.into(),
                cache_control: Some(CacheControl::Ephemeral),
            }],
        }
    }
}

/// Forces or scopes the model's tool selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides whether to call a tool.
    Auto,
    /// The model must call some tool.
    Any,
    /// The model must call the named tool.
    Tool {
        /// Required tool name.
        name: String,
    },
}

/// A complete Messages API request.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    /// Model identifier.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// System prompt blocks.
    pub system: Vec<SystemBlock>,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Tools available to the model.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Tool selection constraint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    #[serde(default)]
    pub input_tokens: u64,
    /// Tokens generated in the response.
    #[serde(default)]
    pub output_tokens: u64,
    /// Prompt tokens served from cache.
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    /// Prompt tokens written to cache.
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
}

/// A complete Messages API response.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    /// Response content blocks.
    pub content: Vec<ContentBlock>,
    /// Why generation stopped (`"end_turn"`, `"tool_use"`, …).
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token accounting.
    #[serde(default)]
    pub usage: Usage,
}

impl MessagesResponse {
    /// Returns the first `tool_use` block, if any.
    #[must_use]
    pub fn first_tool_use(&self) -> Option<(&str, &Value)> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input, .. } => Some((name.as_str(), input)),
            ContentBlock::Text { .. } => None,
        })
    }
}
