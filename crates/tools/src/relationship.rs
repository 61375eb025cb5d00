//! Relationship tools — typed edges between campaign entities.

use async_trait::async_trait;
use questkeeper_core::error::ToolError;
use questkeeper_core::tool::{Tool, ToolResult};
use questkeeper_store::{NewRelationship, QuestStore};
use serde_json::json;

use crate::args::{optional_i64, optional_str, required_str};

pub struct CreateRelationshipTool {
    store: QuestStore,
}

impl CreateRelationshipTool {
    pub fn new(store: QuestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateRelationshipTool {
    fn name(&self) -> &str {
        "create_relationship"
    }

    fn description(&self) -> &str {
        "Create a relationship between two entities (NPC-Quest, NPC-NPC, Quest-Location, etc.)"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "entity_type_a": {
                    "type": "string",
                    "description": "Type of first entity",
                    "enum": ["npc", "quest", "location"]
                },
                "entity_id_a": {
                    "type": "number",
                    "description": "ID of first entity"
                },
                "relationship_type": {
                    "type": "string",
                    "description": "Type of relationship (e.g., gives_quest, enemy_of, ally_of, located_in, knows_about)"
                },
                "entity_type_b": {
                    "type": "string",
                    "description": "Type of second entity",
                    "enum": ["npc", "quest", "location"]
                },
                "entity_id_b": {
                    "type": "number",
                    "description": "ID of second entity"
                },
                "strength": {
                    "type": "number",
                    "description": "Strength of relationship (-100 to 100, optional). Use for intensity, closeness, or importance.",
                    "minimum": -100,
                    "maximum": 100,
                    "default": 0
                },
                "metadata": {
                    "type": "object",
                    "description": "Additional relationship data (optional)",
                    "default": {}
                }
            },
            "required": ["entity_type_a", "entity_id_a", "relationship_type", "entity_type_b", "entity_id_b"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let entity_type_a = required_str(&arguments, "entity_type_a")?;
        let entity_id_a = optional_i64(&arguments, "entity_id_a")?
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'entity_id_a' argument".into()))?;
        let relationship_type = required_str(&arguments, "relationship_type")?;
        let entity_type_b = required_str(&arguments, "entity_type_b")?;
        let entity_id_b = optional_i64(&arguments, "entity_id_b")?
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'entity_id_b' argument".into()))?;
        let strength = optional_i64(&arguments, "strength")?.unwrap_or(0);
        let metadata = arguments.get("metadata").cloned().unwrap_or(json!({}));

        let relationship_id = self
            .store
            .create_relationship(NewRelationship {
                entity_type_a: entity_type_a.clone(),
                entity_id_a,
                relationship_type: relationship_type.clone(),
                entity_type_b: entity_type_b.clone(),
                entity_id_b,
                strength,
                metadata,
            })
            .await?;

        Ok(ToolResult::json(&json!({
            "success": true,
            "relationship_id": relationship_id,
            "message": format!(
                "Created relationship: {entity_type_a}#{entity_id_a} --[{relationship_type}]--> {entity_type_b}#{entity_id_b}"
            )
        })))
    }
}

pub struct QueryRelationshipsTool {
    store: QuestStore,
}

impl QueryRelationshipsTool {
    pub fn new(store: QuestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for QueryRelationshipsTool {
    fn name(&self) -> &str {
        "query_relationships"
    }

    fn description(&self) -> &str {
        "Query relationships for an entity. Returns all relationships where the entity appears (bidirectional search)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "entity_type": {
                    "type": "string",
                    "description": "Type of entity to query",
                    "enum": ["npc", "quest", "location"]
                },
                "entity_id": {
                    "type": "number",
                    "description": "ID of entity to query"
                },
                "relationship_type": {
                    "type": "string",
                    "description": "Filter by specific relationship type (optional)"
                }
            },
            "required": ["entity_type", "entity_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let entity_type = required_str(&arguments, "entity_type")?;
        let entity_id = optional_i64(&arguments, "entity_id")?
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'entity_id' argument".into()))?;
        let relationship_type = optional_str(&arguments, "relationship_type")?;

        let relationships = self
            .store
            .relationships_for(&entity_type, entity_id, relationship_type.as_deref())
            .await?;

        Ok(ToolResult::json(&json!({
            "count": relationships.len(),
            "relationships": relationships
        })))
    }
}
