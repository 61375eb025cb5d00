//! The conversation loop: model calls, tool dispatch, termination.

use questkeeper_core::error::Error;
use questkeeper_core::message::{Message, Transcript};
use questkeeper_core::model::{ChatModel, ChatRequest};
use questkeeper_core::tool::ToolProvider;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::ToolCatalog;
use crate::history::ToolCallHistory;
use crate::invoker::{InvokeOutcome, ToolInvoker};

/// The reply returned when the stuck heuristic fires.
pub const STUCK_MESSAGE: &str =
    "I seem to be stuck in a loop. Could you rephrase your request or be more specific?";

/// The reply returned when the iteration ceiling is hit.
pub fn exhausted_message(max_iterations: u32) -> String {
    format!(
        "Reached maximum iterations ({max_iterations}). The task may be too complex. \
         Try breaking it into smaller requests."
    )
}

/// The conversation controller.
///
/// Each call to [`run`](QuestAgent::run) seeds a fresh transcript, fetches
/// the tool catalog, and alternates model calls with sequential tool dispatch
/// until the model answers, the stuck heuristic fires, or the iteration
/// ceiling is hit. The cross-request tool-call history is owned by the
/// caller and passed in by reference — it outlives every transcript.
pub struct QuestAgent {
    model: Arc<dyn ChatModel>,
    model_name: String,
    system_prompt: String,
    temperature: f32,
    num_ctx: Option<u32>,
    max_iterations: u32,
    catalog: ToolCatalog,
    invoker: ToolInvoker,
}

impl QuestAgent {
    /// Create a new agent over a model and a tool provider.
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolProvider>,
        model_name: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            system_prompt: system_prompt.into(),
            temperature: 0.0,
            num_ctx: None,
            max_iterations: 10,
            catalog: ToolCatalog::new(tools.clone()),
            invoker: ToolInvoker::new(tools),
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the model context window.
    pub fn with_num_ctx(mut self, num_ctx: u32) -> Self {
        self.num_ctx = Some(num_ctx);
        self
    }

    /// Set the iteration ceiling.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Process one user request and return the final reply.
    ///
    /// Catalog and model failures are fatal and propagate; individual tool
    /// failures are absorbed into the transcript so the model can adapt.
    pub async fn run(
        &self,
        request: &str,
        history: &mut ToolCallHistory,
    ) -> Result<String, Error> {
        info!(model = %self.model_name, "Processing request");

        let mut transcript = Transcript::seeded(&self.system_prompt, request);

        // Fetched once per request, never cached across requests
        let descriptors = self.catalog.fetch().await?;
        let tools = ToolCatalog::to_model_schema(&descriptors);

        for iteration in 1..=self.max_iterations {
            debug!(iteration, max = self.max_iterations, "Loop iteration");

            let response = self
                .model
                .chat(ChatRequest {
                    model: self.model_name.clone(),
                    messages: transcript.messages.clone(),
                    tools: tools.clone(),
                    temperature: self.temperature,
                    num_ctx: self.num_ctx,
                })
                .await?;

            let reply = response.message;
            let calls = reply.tool_calls().to_vec();
            let content = reply.content().to_string();
            transcript.push(reply);

            if calls.is_empty() {
                info!(iteration, "Final answer");
                return Ok(content);
            }

            debug!(count = calls.len(), "Executing tool calls");

            // One call at a time, in the order the model issued them; each
            // result lands in the transcript before the next dispatch starts.
            // One call per iteration is the expected case — the multi-call
            // path exists for models that ignore the instruction.
            for call in &calls {
                match self.invoker.invoke(call).await {
                    InvokeOutcome::Completed(result) => {
                        let text = result.first_text().unwrap_or_default().to_string();
                        transcript.push(Message::tool(text));
                        history.record(call.clone());
                    }
                    InvokeOutcome::Failed(description) => {
                        let payload = serde_json::json!({ "error": description });
                        transcript.push(Message::tool(payload.to_string()));
                    }
                }
            }

            if history.is_stuck() {
                warn!(iteration, "Stuck loop detected, asking for clarification");
                return Ok(STUCK_MESSAGE.into());
            }
        }

        warn!(max = self.max_iterations, "Iteration ceiling reached");
        Ok(exhausted_message(self.max_iterations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use questkeeper_core::error::{ProviderError, ToolError};
    use questkeeper_core::message::Role;
    use questkeeper_core::model::ChatResponse;
    use questkeeper_core::tool::{ToolCall, ToolDescriptor, ToolResult};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ── Scripted model ───────────────────────────────────────────────────

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
            "scripted"
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

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            Err(ProviderError::Network("connection refused".into()))
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

    // ── Mock tool provider ───────────────────────────────────────────────

    #[derive(Clone)]
    enum Handler {
        Succeed(String),
        Fail(String),
    }

    struct MockTools {
        handlers: HashMap<String, Handler>,
        invocations: Mutex<Vec<ToolCall>>,
        listings: Mutex<usize>,
        fail_listing: bool,
    }

    impl MockTools {
        fn new(handlers: Vec<(&str, Handler)>) -> Self {
            Self {
                handlers: handlers
                    .into_iter()
                    .map(|(name, handler)| (name.to_string(), handler))
                    .collect(),
                invocations: Mutex::new(Vec::new()),
                listings: Mutex::new(0),
                fail_listing: false,
            }
        }

        fn unreachable_catalog() -> Self {
            Self {
                handlers: HashMap::new(),
                invocations: Mutex::new(Vec::new()),
                listings: Mutex::new(0),
                fail_listing: true,
            }
        }

        fn invoked(&self) -> Vec<ToolCall> {
            self.invocations.lock().unwrap().clone()
        }

        fn listings(&self) -> usize {
            *self.listings.lock().unwrap()
        }
    }

    #[async_trait]
    impl ToolProvider for MockTools {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
            *self.listings.lock().unwrap() += 1;
            if self.fail_listing {
                return Err(ToolError::ExecutionFailed {
                    tool_name: "list_tools".into(),
                    reason: "provider unreachable".into(),
                });
            }
            Ok(self
                .handlers
                .keys()
                .map(|name| ToolDescriptor {
                    name: name.clone(),
                    description: format!("mock tool {name}"),
                    input_schema: json!({"type": "object"}),
                })
                .collect())
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: serde_json::Value,
        ) -> Result<ToolResult, ToolError> {
            self.invocations.lock().unwrap().push(ToolCall {
                name: name.into(),
                arguments,
            });
            match self.handlers.get(name) {
                Some(Handler::Succeed(payload)) => Ok(ToolResult::text(payload.clone())),
                Some(Handler::Fail(reason)) => Err(ToolError::ExecutionFailed {
                    tool_name: name.into(),
                    reason: reason.clone(),
                }),
                None => Err(ToolError::NotFound(name.into())),
            }
        }
    }

    fn agent(model: Arc<dyn ChatModel>, tools: Arc<dyn ToolProvider>) -> QuestAgent {
        QuestAgent::new(model, tools, "mock-model", "You manage quests.")
            .with_num_ctx(8192)
    }

    // ── Tests ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn direct_answer_skips_tool_dispatch() {
        let model = Arc::new(ScriptedModel::new(vec![text_reply("Hello, adventurer!")]));
        let tools = Arc::new(MockTools::new(vec![]));
        let mut history = ToolCallHistory::new();

        let reply = agent(model.clone(), tools.clone())
            .run("Hi", &mut history)
            .await
            .unwrap();

        assert_eq!(reply, "Hello, adventurer!");
        assert!(tools.invoked().is_empty());
        assert!(history.is_empty());

        // The single model call saw exactly the seeded transcript
        let seen = model.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].messages[0].role(), Role::System);
        assert_eq!(seen[0].messages[1].role(), Role::User);
    }

    #[tokio::test]
    async fn single_tool_call_transcript_shape() {
        // Create an NPC, then answer on the following turn.
        let model = Arc::new(ScriptedModel::new(vec![
            tool_reply(vec![call(
                "create_npc",
                json!({"name": "Bob", "description": "Bartender", "location": "tavern"}),
            )]),
            text_reply("Created Bob at the tavern (id 1)"),
        ]));
        let tools = Arc::new(MockTools::new(vec![(
            "create_npc",
            Handler::Succeed(r#"{"success": true, "npc_id": 1}"#.into()),
        )]));
        let mut history = ToolCallHistory::new();

        let reply = agent(model.clone(), tools.clone())
            .run("create an NPC named Bob at the tavern", &mut history)
            .await
            .unwrap();

        assert_eq!(reply, "Created Bob at the tavern (id 1)");
        assert_eq!(history.len(), 1);
        assert_eq!(history.calls()[0].name, "create_npc");

        // The second model call saw: system, user, assistant(with call), tool
        let seen = model.seen();
        assert_eq!(seen.len(), 2);
        let messages = &seen[1].messages;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role(), Role::System);
        assert_eq!(messages[1].role(), Role::User);
        assert_eq!(messages[2].role(), Role::Assistant);
        assert_eq!(messages[2].tool_calls().len(), 1);
        assert_eq!(messages[3].role(), Role::Tool);
        assert_eq!(messages[3].content(), r#"{"success": true, "npc_id": 1}"#);
    }

    #[tokio::test]
    async fn multiple_calls_dispatch_in_received_order() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_reply(vec![
                call("create_npc", json!({"name": "Bob"})),
                call("create_quest", json!({"title": "Cellar"})),
                call("create_relationship", json!({"entity_id_a": 1})),
            ]),
            text_reply("All set."),
        ]));
        let tools = Arc::new(MockTools::new(vec![
            ("create_npc", Handler::Succeed("{\"npc_id\": 1}".into())),
            ("create_quest", Handler::Succeed("{\"quest_id\": 1}".into())),
            (
                "create_relationship",
                Handler::Succeed("{\"relationship_id\": 1}".into()),
            ),
        ]));
        let mut history = ToolCallHistory::new();

        agent(model.clone(), tools.clone())
            .run("set up the cellar quest", &mut history)
            .await
            .unwrap();

        let order: Vec<String> = tools.invoked().into_iter().map(|c| c.name).collect();
        assert_eq!(order, ["create_npc", "create_quest", "create_relationship"]);
        assert_eq!(history.len(), 3);

        // One tool message per call, directly after the assistant message
        let messages = model.seen()[1].messages.clone();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[2].role(), Role::Assistant);
        assert_eq!(messages[3].content(), "{\"npc_id\": 1}");
        assert_eq!(messages[4].content(), "{\"quest_id\": 1}");
        assert_eq!(messages[5].content(), "{\"relationship_id\": 1}");
    }

    #[tokio::test]
    async fn tool_failure_is_absorbed_and_run_continues() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_reply(vec![call("get_npc", json!({"npc_id": 7}))]),
            text_reply("That NPC does not exist."),
        ]));
        let tools = Arc::new(MockTools::new(vec![(
            "get_npc",
            Handler::Fail("database locked".into()),
        )]));
        let mut history = ToolCallHistory::new();

        let reply = agent(model.clone(), tools)
            .run("who is NPC 7?", &mut history)
            .await
            .unwrap();

        assert_eq!(reply, "That NPC does not exist.");
        // Failed calls are never recorded into stuck-detection history
        assert!(history.is_empty());

        // The tool message fed back to the model is an {"error": ...} payload
        let messages = model.seen()[1].messages.clone();
        assert_eq!(messages[3].role(), Role::Tool);
        let payload: serde_json::Value = serde_json::from_str(messages[3].content()).unwrap();
        assert!(payload["error"]
            .as_str()
            .unwrap()
            .contains("database locked"));
    }

    #[tokio::test]
    async fn three_identical_calls_trigger_stuck() {
        let list = || tool_reply(vec![call("list_npcs", json!({"name_search": "bob"}))]);
        let model = Arc::new(ScriptedModel::new(vec![list(), list(), list()]));
        let tools = Arc::new(MockTools::new(vec![(
            "list_npcs",
            Handler::Succeed("{\"count\": 0, \"npcs\": []}".into()),
        )]));
        let mut history = ToolCallHistory::new();

        let reply = agent(model.clone(), tools)
            .run("find bob", &mut history)
            .await
            .unwrap();

        assert_eq!(reply, STUCK_MESSAGE);
        // Terminated right after the third call, without another model turn
        assert_eq!(model.seen().len(), 3);
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn prior_streak_triggers_stuck_when_nothing_new_is_recorded() {
        // A streak left over from an earlier request, then an iteration whose
        // only call fails: nothing is recorded, the streak stands, stuck fires.
        let mut history = ToolCallHistory::new();
        for _ in 0..3 {
            history.record(call("create_npc", json!({"name": "Bob"})));
        }

        let model = Arc::new(ScriptedModel::new(vec![tool_reply(vec![call(
            "get_quest",
            json!({"quest_id": 1}),
        )])]));
        let tools = Arc::new(MockTools::new(vec![(
            "get_quest",
            Handler::Fail("timeout".into()),
        )]));

        let reply = agent(model, tools)
            .run("what about quest 1?", &mut history)
            .await
            .unwrap();

        assert_eq!(reply, STUCK_MESSAGE);
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn reset_requires_a_fresh_streak() {
        let mut history = ToolCallHistory::new();
        for _ in 0..3 {
            history.record(call("list_npcs", json!({})));
        }
        history.reset();

        let model = Arc::new(ScriptedModel::new(vec![
            tool_reply(vec![call("list_npcs", json!({}))]),
            text_reply("Nobody around."),
        ]));
        let tools = Arc::new(MockTools::new(vec![(
            "list_npcs",
            Handler::Succeed("{\"count\": 0, \"npcs\": []}".into()),
        )]));

        let reply = agent(model, tools)
            .run("anyone here?", &mut history)
            .await
            .unwrap();

        // One post-reset call is far from a streak; the run completes normally
        assert_eq!(reply, "Nobody around.");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn exhaustion_names_the_configured_ceiling() {
        // Alternating tool names never trip the stuck heuristic
        let model = Arc::new(ScriptedModel::new(vec![
            tool_reply(vec![call("list_npcs", json!({}))]),
            tool_reply(vec![call("list_quests", json!({}))]),
        ]));
        let tools = Arc::new(MockTools::new(vec![
            ("list_npcs", Handler::Succeed("{\"count\": 0}".into())),
            ("list_quests", Handler::Succeed("{\"count\": 0}".into())),
        ]));
        let mut history = ToolCallHistory::new();

        let reply = agent(model.clone(), tools)
            .with_max_iterations(2)
            .run("audit the world", &mut history)
            .await
            .unwrap();

        assert!(reply.contains("Reached maximum iterations (2)"));
        assert_eq!(model.seen().len(), 2);
    }

    #[tokio::test]
    async fn catalog_failure_is_fatal() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let tools = Arc::new(MockTools::unreachable_catalog());
        let mut history = ToolCallHistory::new();

        let err = agent(model.clone(), tools)
            .run("hello", &mut history)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Tool(ToolError::CatalogUnavailable(_))
        ));
        // The model is never consulted without a catalog
        assert!(model.seen().is_empty());
    }

    #[tokio::test]
    async fn model_failure_is_fatal() {
        let tools = Arc::new(MockTools::new(vec![]));
        let mut history = ToolCallHistory::new();

        let err = agent(Arc::new(FailingModel), tools)
            .run("hello", &mut history)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Provider(ProviderError::Network(_))));
    }

    #[tokio::test]
    async fn catalog_is_fetched_every_request() {
        let model = Arc::new(ScriptedModel::new(vec![
            text_reply("one"),
            text_reply("two"),
        ]));
        let tools = Arc::new(MockTools::new(vec![]));
        let mut history = ToolCallHistory::new();

        let agent = agent(model, tools.clone());
        agent.run("first", &mut history).await.unwrap();
        agent.run("second", &mut history).await.unwrap();

        assert_eq!(tools.listings(), 2);
    }

    #[tokio::test]
    async fn sampling_configuration_reaches_the_model() {
        let model = Arc::new(ScriptedModel::new(vec![text_reply("ok")]));
        let tools = Arc::new(MockTools::new(vec![]));
        let mut history = ToolCallHistory::new();

        QuestAgent::new(model.clone(), tools, "qwen2.5:32b-instruct-q4_K_M", "sys")
            .with_temperature(0.0)
            .with_num_ctx(8192)
            .run("hello", &mut history)
            .await
            .unwrap();

        let seen = model.seen();
        assert_eq!(seen[0].model, "qwen2.5:32b-instruct-q4_K_M");
        assert!((seen[0].temperature - 0.0).abs() < f32::EPSILON);
        assert_eq!(seen[0].num_ctx, Some(8192));
    }
}
