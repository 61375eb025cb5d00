//! ChatModel trait — the abstraction over the language model backend.
//!
//! A `ChatModel` takes a transcript plus a tool catalog and returns either a
//! final assistant message or one carrying tool calls. The agent loop calls
//! `chat()` without knowing which backend is behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::ToolDescriptor;

/// One chat request: the full transcript, the tool schema, and the fixed
/// sampling configuration for this process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "qwen2.5:32b-instruct-q4_K_M")
    pub model: String,

    /// The transcript messages, in order
    pub messages: Vec<Message>,

    /// Tools the model may call, in the function envelope it expects
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,

    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Context window size, when the backend supports setting it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
}

/// A tool in the function-schema envelope the model expects:
/// `{"type": "function", "function": {name, description, parameters}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSchema,
}

/// The function half of a [`ToolSchema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    /// Re-key a descriptor into the function envelope. The input schema is
    /// passed through verbatim — no coercion, no validation.
    pub fn from_descriptor(descriptor: &ToolDescriptor) -> Self {
        Self {
            kind: "function".into(),
            function: FunctionSchema {
                name: descriptor.name.clone(),
                description: descriptor.description.clone(),
                parameters: descriptor.input_schema.clone(),
            },
        }
    }
}

/// A complete response from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated assistant message (content + any tool calls)
    pub message: Message,

    /// Which model actually responded
    pub model: String,

    /// Token usage, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// The model capability the agent loop consumes.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// A human-readable name for this backend (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send the transcript and tool schema; await the complete reply.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}
