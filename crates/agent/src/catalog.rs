//! Tool catalog — fetch descriptors and translate them for the model.

use questkeeper_core::error::ToolError;
use questkeeper_core::model::ToolSchema;
use questkeeper_core::tool::{ToolDescriptor, ToolProvider};
use std::sync::Arc;
use tracing::debug;

/// Fetches tool descriptors from the provider and re-keys them into the
/// function-schema envelope the model expects.
pub struct ToolCatalog {
    provider: Arc<dyn ToolProvider>,
}

impl ToolCatalog {
    pub fn new(provider: Arc<dyn ToolProvider>) -> Self {
        Self { provider }
    }

    /// List the current tool descriptors.
    ///
    /// The loop cannot proceed without a catalog, so a failure here is fatal
    /// to the run and surfaces as `CatalogUnavailable`.
    pub async fn fetch(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let descriptors = self
            .provider
            .list_tools()
            .await
            .map_err(|e| ToolError::CatalogUnavailable(e.to_string()))?;
        debug!(count = descriptors.len(), "Fetched tool catalog");
        Ok(descriptors)
    }

    /// Translate descriptors into the model's function envelope. Schema
    /// content passes through verbatim.
    pub fn to_model_schema(descriptors: &[ToolDescriptor]) -> Vec<ToolSchema> {
        descriptors.iter().map(ToolSchema::from_descriptor).collect()
    }
}
