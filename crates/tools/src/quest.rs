//! Quest tools — create, fetch, list, and advance quests.

use async_trait::async_trait;
use questkeeper_core::error::ToolError;
use questkeeper_core::tool::{Tool, ToolResult};
use questkeeper_store::{NewQuest, QuestStatus, QuestStore};
use serde_json::json;

use crate::args::{optional_i64, optional_str, required_str};

fn parse_status(raw: &str) -> Result<QuestStatus, ToolError> {
    raw.parse()
        .map_err(|e: String| ToolError::InvalidArguments(e))
}

pub struct CreateQuestTool {
    store: QuestStore,
}

impl CreateQuestTool {
    pub fn new(store: QuestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateQuestTool {
    fn name(&self) -> &str {
        "create_quest"
    }

    fn description(&self) -> &str {
        "Create a new quest in the world"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Quest title"
                },
                "description": {
                    "type": "string",
                    "description": "Quest description and objectives"
                },
                "status": {
                    "type": "string",
                    "enum": ["available", "active", "completed"],
                    "description": "Quest status",
                    "default": "available"
                },
                "metadata": {
                    "type": "object",
                    "description": "Additional quest data (optional)",
                    "default": {}
                }
            },
            "required": ["title", "description"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let title = required_str(&arguments, "title")?;
        let description = required_str(&arguments, "description")?;
        let status = match optional_str(&arguments, "status")? {
            Some(raw) => parse_status(&raw)?,
            None => QuestStatus::Available,
        };
        let metadata = arguments.get("metadata").cloned().unwrap_or(json!({}));

        let quest_id = self
            .store
            .create_quest(NewQuest {
                title: title.clone(),
                description,
                status,
                metadata,
            })
            .await?;

        Ok(ToolResult::json(&json!({
            "success": true,
            "quest_id": quest_id,
            "message": format!("Created quest: {title}")
        })))
    }
}

pub struct GetQuestTool {
    store: QuestStore,
}

impl GetQuestTool {
    pub fn new(store: QuestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetQuestTool {
    fn name(&self) -> &str {
        "get_quest"
    }

    fn description(&self) -> &str {
        "Get details of a specific quest by ID"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "quest_id": {
                    "type": "number",
                    "description": "ID of the quest"
                }
            },
            "required": ["quest_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let quest_id = optional_i64(&arguments, "quest_id")?
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'quest_id' argument".into()))?;

        match self.store.get_quest(quest_id).await? {
            Some(quest) => Ok(ToolResult::json(&serde_json::to_value(&quest).map_err(
                |e| ToolError::ExecutionFailed {
                    tool_name: "get_quest".into(),
                    reason: e.to_string(),
                },
            )?)),
            None => Ok(ToolResult::json(&json!({ "error": "Quest not found" }))),
        }
    }
}

pub struct ListQuestsTool {
    store: QuestStore,
}

impl ListQuestsTool {
    pub fn new(store: QuestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListQuestsTool {
    fn name(&self) -> &str {
        "list_quests"
    }

    fn description(&self) -> &str {
        "List quests with optional status filter"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["available", "active", "completed"],
                    "description": "Filter by quest status (optional)"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let status = match optional_str(&arguments, "status")? {
            Some(raw) => Some(parse_status(&raw)?),
            None => None,
        };

        let quests = self.store.list_quests(status).await?;

        Ok(ToolResult::json(&json!({
            "count": quests.len(),
            "quests": quests
        })))
    }
}

pub struct UpdateQuestStatusTool {
    store: QuestStore,
}

impl UpdateQuestStatusTool {
    pub fn new(store: QuestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateQuestStatusTool {
    fn name(&self) -> &str {
        "update_quest_status"
    }

    fn description(&self) -> &str {
        "Update the status of a quest"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "quest_id": {
                    "type": "number",
                    "description": "ID of the quest"
                },
                "status": {
                    "type": "string",
                    "enum": ["available", "active", "completed"],
                    "description": "New status for the quest"
                }
            },
            "required": ["quest_id", "status"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let quest_id = optional_i64(&arguments, "quest_id")?
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'quest_id' argument".into()))?;
        let status = parse_status(&required_str(&arguments, "status")?)?;

        match self.store.set_quest_status(quest_id, status).await? {
            Some(quest) => Ok(ToolResult::json(&json!({
                "success": true,
                "quest": quest
            }))),
            None => Ok(ToolResult::json(&json!({ "error": "Quest not found" }))),
        }
    }
}
