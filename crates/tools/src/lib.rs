//! Storage-backed campaign tools for Questkeeper.
//!
//! Each tool is a thin handler over the shared [`QuestStore`]: NPC CRUD,
//! quest lifecycle, and relationship edges. The registry produced here is the
//! agent's tool provider — it advertises descriptors and executes calls.

pub mod npc;
pub mod quest;
pub mod relationship;

mod args;

use questkeeper_core::tool::ToolRegistry;
use questkeeper_store::QuestStore;

/// Create the default tool registry with all campaign tools, sharing one
/// store handle.
pub fn default_registry(store: QuestStore) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(npc::CreateNpcTool::new(store.clone())));
    registry.register(Box::new(npc::GetNpcTool::new(store.clone())));
    registry.register(Box::new(npc::ListNpcsTool::new(store.clone())));
    registry.register(Box::new(npc::UpdateNpcTool::new(store.clone())));
    registry.register(Box::new(quest::CreateQuestTool::new(store.clone())));
    registry.register(Box::new(quest::GetQuestTool::new(store.clone())));
    registry.register(Box::new(quest::ListQuestsTool::new(store.clone())));
    registry.register(Box::new(quest::UpdateQuestStatusTool::new(store.clone())));
    registry.register(Box::new(relationship::CreateRelationshipTool::new(
        store.clone(),
    )));
    registry.register(Box::new(relationship::QueryRelationshipsTool::new(store)));
    tracing::debug!(count = registry.len(), "Registered campaign tools");
    registry
}
