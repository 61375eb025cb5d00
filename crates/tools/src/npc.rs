//! NPC tools — create, fetch, list, and update characters.

use async_trait::async_trait;
use questkeeper_core::error::ToolError;
use questkeeper_core::tool::{Tool, ToolResult};
use questkeeper_store::{NewNpc, NpcFilter, NpcUpdate, QuestStore};
use serde_json::json;

use crate::args::{optional_i64, optional_str, required_str};

pub struct CreateNpcTool {
    store: QuestStore,
}

impl CreateNpcTool {
    pub fn new(store: QuestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateNpcTool {
    fn name(&self) -> &str {
        "create_npc"
    }

    fn description(&self) -> &str {
        "Create a new NPC in the world"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Name of the NPC"
                },
                "description": {
                    "type": "string",
                    "description": "Physical description and personality traits"
                },
                "location": {
                    "type": "string",
                    "description": "Current location of the NPC"
                },
                "metadata": {
                    "type": "object",
                    "description": "Additional custom fields (optional)",
                    "default": {}
                }
            },
            "required": ["name", "description", "location"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let name = required_str(&arguments, "name")?;
        let description = required_str(&arguments, "description")?;
        let location = required_str(&arguments, "location")?;
        let metadata = arguments.get("metadata").cloned().unwrap_or(json!({}));

        let npc_id = self
            .store
            .create_npc(NewNpc {
                name: name.clone(),
                description,
                location: location.clone(),
                metadata,
            })
            .await?;

        Ok(ToolResult::json(&json!({
            "success": true,
            "npc_id": npc_id,
            "message": format!("Created NPC: {name} at {location}")
        })))
    }
}

pub struct GetNpcTool {
    store: QuestStore,
}

impl GetNpcTool {
    pub fn new(store: QuestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetNpcTool {
    fn name(&self) -> &str {
        "get_npc"
    }

    fn description(&self) -> &str {
        "Get details of a specific NPC by ID including disposition and notes"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "npc_id": {
                    "type": "number",
                    "description": "ID of the NPC"
                }
            },
            "required": ["npc_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let npc_id = optional_i64(&arguments, "npc_id")?
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'npc_id' argument".into()))?;

        match self.store.get_npc(npc_id).await? {
            Some(npc) => Ok(ToolResult::json(&serde_json::to_value(&npc).map_err(
                |e| ToolError::ExecutionFailed {
                    tool_name: "get_npc".into(),
                    reason: e.to_string(),
                },
            )?)),
            None => Ok(ToolResult::json(&json!({ "error": "NPC not found" }))),
        }
    }
}

pub struct ListNpcsTool {
    store: QuestStore,
}

impl ListNpcsTool {
    pub fn new(store: QuestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListNpcsTool {
    fn name(&self) -> &str {
        "list_npcs"
    }

    fn description(&self) -> &str {
        "List NPCs with optional filters for location and name search"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "Filter by location (optional)"
                },
                "name_search": {
                    "type": "string",
                    "description": "Search in NPC names (optional, case-insensitive)"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let filter = NpcFilter {
            location: optional_str(&arguments, "location")?,
            name_search: optional_str(&arguments, "name_search")?,
        };

        let npcs = self.store.list_npcs(&filter).await?;

        Ok(ToolResult::json(&json!({
            "count": npcs.len(),
            "npcs": npcs
        })))
    }
}

pub struct UpdateNpcTool {
    store: QuestStore,
}

impl UpdateNpcTool {
    pub fn new(store: QuestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateNpcTool {
    fn name(&self) -> &str {
        "update_npc"
    }

    fn description(&self) -> &str {
        "Update NPC properties including disposition and notes. Notes are append-only with timestamps."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "npc_id": {
                    "type": "number",
                    "description": "ID of the NPC to update"
                },
                "player_disposition": {
                    "type": "number",
                    "description": "New disposition value towards player (-100=hostile, 0=neutral, +100=friendly). Replaces current value.",
                    "minimum": -100,
                    "maximum": 100
                },
                "notes": {
                    "type": "string",
                    "description": "Important information or events to remember. Gets appended with timestamp."
                },
                "location": {
                    "type": "string",
                    "description": "New location of the NPC"
                }
            },
            "required": ["npc_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let npc_id = optional_i64(&arguments, "npc_id")?
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'npc_id' argument".into()))?;

        let update = NpcUpdate {
            player_disposition: optional_i64(&arguments, "player_disposition")?,
            notes: optional_str(&arguments, "notes")?.filter(|n| !n.trim().is_empty()),
            location: optional_str(&arguments, "location")?,
        };

        if update.is_empty() {
            return Ok(ToolResult::json(&json!({
                "error": "No updates provided. Specify at least one of: player_disposition, notes, location"
            })));
        }

        match self.store.update_npc(npc_id, update).await? {
            Some(npc) => Ok(ToolResult::json(&json!({
                "success": true,
                "npc": npc
            }))),
            None => Ok(ToolResult::json(&json!({ "error": "NPC not found" }))),
        }
    }
}
