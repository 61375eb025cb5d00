//! Typed records for the campaign tables.

use serde::{Deserialize, Serialize};

/// A non-player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Npc {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub location: String,
    /// Disposition towards the player: -100 = hostile, 0 = neutral, +100 = friendly
    pub player_disposition: i64,
    /// Append-only log of timestamped entries
    pub notes: String,
    pub metadata: serde_json::Value,
}

/// A quest and its current status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: QuestStatus,
    pub metadata: serde_json::Value,
}

/// The quest lifecycle: available → active → completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    Available,
    Active,
    Completed,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::Available => "available",
            QuestStatus::Active => "active",
            QuestStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(QuestStatus::Available),
            "active" => Ok(QuestStatus::Active),
            "completed" => Ok(QuestStatus::Completed),
            other => Err(format!("invalid quest status: {other}")),
        }
    }
}

/// A typed edge between two entities (NPC-quest, NPC-NPC, quest-location, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub entity_type_a: String,
    pub entity_id_a: i64,
    /// e.g. gives_quest, enemy_of, ally_of, located_in, knows_about
    pub relationship_type: String,
    pub entity_type_b: String,
    pub entity_id_b: i64,
    /// Intensity / closeness / importance, -100 to 100
    pub strength: i64,
    pub metadata: serde_json::Value,
}
