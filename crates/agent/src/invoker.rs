//! Tool invoker — dispatch one call and absorb provider failures.

use questkeeper_core::tool::{ToolCall, ToolProvider, ToolResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// What came back from one dispatch.
#[derive(Debug)]
pub enum InvokeOutcome {
    /// The provider executed the tool. This includes results flagged
    /// `is_error` — the handler ran and produced a payload.
    Completed(ToolResult),

    /// The provider itself failed (unknown tool, handler panic/IO error).
    /// The description is fed back to the model; the run continues.
    Failed(String),
}

/// Executes a single named tool call against the provider and normalizes
/// success and error into a uniform outcome. This absorption is what makes
/// per-call failures non-fatal to the conversation loop.
pub struct ToolInvoker {
    provider: Arc<dyn ToolProvider>,
}

impl ToolInvoker {
    pub fn new(provider: Arc<dyn ToolProvider>) -> Self {
        Self { provider }
    }

    /// Dispatch one call. Never returns an error.
    pub async fn invoke(&self, call: &ToolCall) -> InvokeOutcome {
        debug!(tool = %call.name, arguments = %call.arguments, "Dispatching tool call");

        match self
            .provider
            .call_tool(&call.name, call.arguments.clone())
            .await
        {
            Ok(result) => InvokeOutcome::Completed(result),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                InvokeOutcome::Failed(format!("Tool execution failed: {e}"))
            }
        }
    }
}
