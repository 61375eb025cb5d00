//! Error types for the Questkeeper domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context has
//! its own error enum; the top-level `Error` wraps them.
//!
//! Propagation policy: catalog and model-call failures are fatal to a run and
//! propagate to the caller. Per-tool-call failures are absorbed by the agent's
//! invoker and fed back to the model as transcript content.

use thiserror::Error;

/// The top-level error type for all Questkeeper operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures from the model backend. Always fatal to the run — there is no
/// retry at this layer.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Malformed response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures from the tool provider or a tool handler.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Failures from the SQLite persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
