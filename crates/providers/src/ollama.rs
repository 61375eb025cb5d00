//! Ollama provider — speaks the native `/api/chat` endpoint.
//!
//! Unlike OpenAI-compatible endpoints, Ollama's native chat API carries
//! tool-call arguments as JSON objects (not encoded strings), and sampling
//! options (temperature, context window) travel in a nested `options` map.

use async_trait::async_trait;
use questkeeper_core::error::ProviderError;
use questkeeper_core::message::Message;
use questkeeper_core::model::{ChatModel, ChatRequest, ChatResponse, ToolSchema, Usage};
use questkeeper_core::tool::ToolCall;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A chat client for a local (or remote) Ollama server.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client for the given endpoint (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Check that the server is reachable.
    pub async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(response.status().is_success())
    }

    /// Convert transcript messages to Ollama's wire format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role().to_string(),
                content: m.content().to_string(),
                tool_calls: match m.tool_calls() {
                    [] => None,
                    calls => Some(
                        calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                function: ApiFunctionCall {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    ),
                },
            })
            .collect()
    }

    /// Convert tool schemas to Ollama's wire format.
    fn to_api_tools(tools: &[ToolSchema]) -> Vec<ApiTool> {
        tools
            .iter()
            .map(|t| ApiTool {
                kind: t.kind.clone(),
                function: ApiFunctionDef {
                    name: t.function.name.clone(),
                    description: t.function.description.clone(),
                    parameters: t.function.parameters.clone(),
                },
            })
            .collect()
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let body = ApiRequest {
            model: request.model.clone(),
            messages: Self::to_api_messages(&request.messages),
            stream: false,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(Self::to_api_tools(&request.tools))
            },
            options: ApiOptions {
                temperature: request.temperature,
                num_ctx: request.num_ctx,
            },
        };

        debug!(model = %request.model, messages = request.messages.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&error_body)
                .map(|e| e.error)
                .unwrap_or(error_body);
            warn!(status, %message, "Ollama returned error");
            return Err(ProviderError::Api {
                status_code: status,
                message,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse response: {e}"))
            })?;

        let reply = api_response
            .message
            .ok_or_else(|| ProviderError::InvalidResponse("No message in response".into()))?;

        let tool_calls: Vec<ToolCall> = reply
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let usage = match (api_response.prompt_eval_count, api_response.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(Usage {
                prompt_tokens: prompt.unwrap_or(0),
                completion_tokens: completion.unwrap_or(0),
            }),
        };

        Ok(ChatResponse {
            message: Message::assistant_with_calls(reply.content.unwrap_or_default(), tool_calls),
            model: api_response.model.unwrap_or(request.model),
            usage,
        })
    }
}

// --- Ollama wire types (internal) ---

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    kind: String,
    function: ApiFunctionDef,
}

#[derive(Debug, Serialize)]
struct ApiFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ApiToolCall {
    function: ApiFunctionCall,
}

#[derive(Debug, Serialize)]
struct ApiFunctionCall {
    name: String,
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: Option<String>,
    message: Option<ApiResponseMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseToolCall {
    function: ApiResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ApiResponseFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}
