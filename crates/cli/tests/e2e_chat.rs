//! End-to-end tests for the Questkeeper pipeline.
//!
//! A scripted model drives the real agent loop against the real tool
//! registry and an in-memory store — everything but the Ollama server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use questkeeper_agent::{QuestAgent, STUCK_MESSAGE, ToolCallHistory};
use questkeeper_core::error::ProviderError;
use questkeeper_core::message::Message;
use questkeeper_core::model::{ChatModel, ChatRequest, ChatResponse};
use questkeeper_core::tool::ToolCall;
use questkeeper_store::QuestStore;
use questkeeper_tools::default_registry;
use serde_json::json;

// ── Scripted model ───────────────────────────────────────────────────────

struct ScriptedModel {
    responses: Mutex<Vec<ChatResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("ScriptedModel exhausted");
        }
        Ok(responses.remove(0))
    }
}

fn text_reply(text: &str) -> ChatResponse {
    ChatResponse {
        message: Message::assistant(text),
        model: "mock".into(),
        usage: None,
    }
}

fn tool_reply(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        message: Message::assistant_with_calls("", calls),
        model: "mock".into(),
        usage: None,
    }
}

fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        name: name.into(),
        arguments,
    }
}

async fn world() -> (QuestStore, Arc<questkeeper_core::tool::ToolRegistry>) {
    let store = QuestStore::new("sqlite::memory:").await.unwrap();
    let registry = Arc::new(default_registry(store.clone()));
    (store, registry)
}

fn agent(model: Arc<ScriptedModel>, registry: Arc<questkeeper_core::tool::ToolRegistry>) -> QuestAgent {
    QuestAgent::new(model, registry, "mock-model", "You manage quests.")
        .with_num_ctx(8192)
        .with_max_iterations(10)
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_create_npc_at_the_tavern() {
    // "create an NPC named Bob at the tavern": one tool call, then an answer.
    let model = Arc::new(ScriptedModel::new(vec![
        tool_reply(vec![call(
            "create_npc",
            json!({
                "name": "Bob",
                "description": "Friendly bartender",
                "location": "tavern"
            }),
        )]),
        text_reply("Created Bob at the tavern (id 1)"),
    ]));
    let (store, registry) = world().await;
    let mut history = ToolCallHistory::new();

    let reply = agent(model.clone(), registry)
        .run("create an NPC named Bob at the tavern", &mut history)
        .await
        .unwrap();

    assert_eq!(reply, "Created Bob at the tavern (id 1)");
    assert_eq!(history.len(), 1);
    assert_eq!(history.calls()[0].name, "create_npc");

    // The second model call saw the real tool payload with the new id
    let seen = model.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].messages.len(), 4);
    let tool_payload: serde_json::Value =
        serde_json::from_str(seen[1].messages[3].content()).unwrap();
    assert_eq!(tool_payload["success"], true);
    assert_eq!(tool_payload["npc_id"], 1);

    // And the NPC really exists
    let npc = store.get_npc(1).await.unwrap().unwrap();
    assert_eq!(npc.name, "Bob");
    assert_eq!(npc.location, "tavern");
}

#[tokio::test]
async fn e2e_multi_step_world_building() {
    // Three sequential iterations: NPC, quest, then the edge between them.
    let model = Arc::new(ScriptedModel::new(vec![
        tool_reply(vec![call(
            "create_npc",
            json!({"name": "Han the Hunter", "description": "Tracker", "location": "forest"}),
        )]),
        tool_reply(vec![call(
            "create_quest",
            json!({"title": "Track the white stag", "description": "Follow the trail north"}),
        )]),
        tool_reply(vec![call(
            "create_relationship",
            json!({
                "entity_type_a": "npc",
                "entity_id_a": 1,
                "relationship_type": "gives_quest",
                "entity_type_b": "quest",
                "entity_id_b": 1
            }),
        )]),
        text_reply("Han now offers the stag hunt."),
    ]));
    let (store, registry) = world().await;
    let mut history = ToolCallHistory::new();

    let reply = agent(model, registry)
        .run("give Han a hunting quest", &mut history)
        .await
        .unwrap();

    assert_eq!(reply, "Han now offers the stag hunt.");
    assert_eq!(history.len(), 3);

    let edges = store.relationships_for("npc", 1, None).await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].relationship_type, "gives_quest");
    assert_eq!(edges[0].entity_id_b, 1);
}

#[tokio::test]
async fn e2e_unknown_tool_is_survivable() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_reply(vec![call("cast_fireball", json!({"target": "rats"}))]),
        text_reply("I can only manage the campaign, not cast spells."),
    ]));
    let (_store, registry) = world().await;
    let mut history = ToolCallHistory::new();

    let reply = agent(model.clone(), registry)
        .run("burn the rats", &mut history)
        .await
        .unwrap();

    assert_eq!(reply, "I can only manage the campaign, not cast spells.");
    assert!(history.is_empty());

    // The model saw a structured error, not a crash
    let messages = model.seen()[1].messages.clone();
    let payload: serde_json::Value = serde_json::from_str(messages[3].content()).unwrap();
    assert!(payload["error"].as_str().unwrap().contains("cast_fireball"));
}

#[tokio::test]
async fn e2e_repeated_searches_get_cut_off() {
    let search = || tool_reply(vec![call("list_npcs", json!({"name_search": "ghost"}))]);
    let model = Arc::new(ScriptedModel::new(vec![search(), search(), search()]));
    let (_store, registry) = world().await;
    let mut history = ToolCallHistory::new();

    let reply = agent(model, registry)
        .run("find the ghost", &mut history)
        .await
        .unwrap();

    assert_eq!(reply, STUCK_MESSAGE);
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn e2e_history_survives_across_requests_until_reset() {
    // Two identical searches in request one, a third in request two: the
    // streak spans requests because the history outlives the transcript.
    let (_store, registry) = world().await;
    let mut history = ToolCallHistory::new();

    let model = Arc::new(ScriptedModel::new(vec![
        tool_reply(vec![call("list_npcs", json!({"name_search": "bob"}))]),
        tool_reply(vec![call("list_npcs", json!({"name_search": "bob"}))]),
        text_reply("No Bob yet."),
    ]));
    let reply = agent(model, registry.clone())
        .run("find bob", &mut history)
        .await
        .unwrap();
    assert_eq!(reply, "No Bob yet.");
    assert_eq!(history.len(), 2);

    let model = Arc::new(ScriptedModel::new(vec![tool_reply(vec![call(
        "list_npcs",
        json!({"name_search": "bob"}),
    )])]));
    let reply = agent(model, registry.clone())
        .run("try again", &mut history)
        .await
        .unwrap();
    assert_eq!(reply, STUCK_MESSAGE);

    // After reset, the same request shape completes normally
    history.reset();
    let model = Arc::new(ScriptedModel::new(vec![
        tool_reply(vec![call("list_npcs", json!({"name_search": "bob"}))]),
        text_reply("Still no Bob."),
    ]));
    let reply = agent(model, registry)
        .run("one more time", &mut history)
        .await
        .unwrap();
    assert_eq!(reply, "Still no Bob.");
}
