//! The agent loop: ground, ask the model, run its tool calls, repeat.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use sitewright_core::error::{Error, ToolError};
use sitewright_core::event::{DomainEvent, EventBus};
use sitewright_core::message::Conversation;
use sitewright_core::provider::{Provider, ProviderRequest};
use sitewright_core::retrieval::Retriever;
use sitewright_core::tool::{ToolCall, ToolRegistry};
use tracing::{debug, info, warn};

use crate::grounding::{GroundingInjector, GroundingSettings};
use crate::normalizer::{self, CallSource};

/// What the caller gets when the loop guard trips.
pub const STALLED_MESSAGE: &str = "Stopped after max iterations.";

/// Per-session agent settings. Adapters fill these from configuration.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Loop guard: model round trips allowed per request
    pub max_iterations: usize,
    /// Fan-out for general component chunks
    pub retrieval_k: usize,
    pub grounding: GroundingSettings,
    /// Log every full model reply at debug level
    pub log_responses: bool,
}

impl AgentSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            max_iterations: 12,
            retrieval_k: 20,
            grounding: GroundingSettings::default(),
            log_responses: false,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    pub fn with_response_logging(mut self, enabled: bool) -> Self {
        self.log_responses = enabled;
        self
    }
}

/// How one request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// The model answered in plain text
    Final(String),
    /// The loop guard stopped the request after this many round trips
    Stalled { iterations: usize },
}

impl AskOutcome {
    pub fn is_stalled(&self) -> bool {
        matches!(self, Self::Stalled { .. })
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Final(text) => text,
            Self::Stalled { .. } => STALLED_MESSAGE.to_string(),
        }
    }
}

/// One website-building session. Owns its conversation exclusively.
pub struct BuilderAgent {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    grounding: GroundingInjector,
    settings: AgentSettings,
    conversation: Conversation,
    event_bus: Option<Arc<EventBus>>,
}

impl BuilderAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        retriever: Arc<dyn Retriever>,
        system_prompt: impl Into<String>,
        settings: AgentSettings,
    ) -> Self {
        let grounding = GroundingInjector::new(retriever, settings.grounding.clone());
        Self {
            provider,
            tools,
            grounding,
            settings,
            conversation: Conversation::initialize(system_prompt),
            event_bus: None,
        }
    }

    /// Publish loop progress to `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Run one request to completion and return the text for the caller.
    /// A tripped loop guard comes back as [`STALLED_MESSAGE`].
    pub async fn ask(&mut self, request: &str) -> Result<String, Error> {
        self.run(request).await.map(AskOutcome::into_text)
    }

    /// Run one request to completion.
    ///
    /// Grounding is refreshed once, right after the request is appended.
    /// Tool failures are fed back to the model as results; only a failed
    /// model call ends the request with an error.
    pub async fn run(&mut self, request: &str) -> Result<AskOutcome, Error> {
        let conversation_id = self.conversation.id().to_string();
        info!(
            conversation_id = %conversation_id,
            messages = self.conversation.len(),
            "Processing request"
        );

        self.conversation.append_user(request);

        if let Some(snippet) = self
            .grounding
            .inject(&mut self.conversation, request, self.settings.retrieval_k)
            .await
        {
            self.publish(DomainEvent::GroundingInjected {
                conversation_id: conversation_id.clone(),
                sections: snippet.sections,
                chars: snippet.text.len(),
                timestamp: Utc::now(),
            });
        }

        let tool_definitions = self.tools.definitions();

        for iteration in 1..=self.settings.max_iterations {
            debug!(conversation_id = %conversation_id, iteration, "Agent loop iteration");

            let request = ProviderRequest {
                model: self.settings.model.clone(),
                messages: self.conversation.messages().to_vec(),
                temperature: self.settings.temperature,
                max_tokens: self.settings.max_tokens,
                tools: tool_definitions.clone(),
                stream: false,
            };

            let response = self.provider.complete(request).await.inspect_err(|e| {
                warn!(
                    conversation_id = %conversation_id,
                    iteration,
                    error = %e,
                    "Model call failed"
                );
            })?;

            if self.settings.log_responses {
                info!(iteration, response = %response.raw, "Model response");
            }

            let turn = normalizer::normalize(&response.raw);

            if !turn.found() {
                self.conversation.append_assistant(turn.content.clone(), Vec::new());
                info!(conversation_id = %conversation_id, iterations = iteration, "Final answer");
                self.publish(DomainEvent::ResponseGenerated {
                    conversation_id,
                    model: response.model,
                    iterations: iteration,
                    timestamp: Utc::now(),
                });
                return Ok(AskOutcome::Final(turn.content));
            }

            debug!(
                iteration,
                tool_count = turn.calls.len(),
                embedded = turn.source == Some(CallSource::Embedded),
                "Executing tool calls"
            );

            self.conversation
                .append_assistant(turn.content.clone(), turn.calls.clone());

            for call in &turn.calls {
                self.execute_call(&conversation_id, call).await;
            }
        }

        warn!(
            conversation_id = %conversation_id,
            iterations = self.settings.max_iterations,
            "Max iterations reached without a final answer"
        );
        self.publish(DomainEvent::LoopStalled {
            conversation_id,
            iterations: self.settings.max_iterations,
            timestamp: Utc::now(),
        });
        Ok(AskOutcome::Stalled {
            iterations: self.settings.max_iterations,
        })
    }

    /// Execute one call and append exactly one tool message for it.
    async fn execute_call(&mut self, conversation_id: &str, call: &ToolCall) {
        let start = Instant::now();
        let outcome = self.tools.execute(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, result) = match outcome {
            Ok(result) => (result.success, result.to_value()),
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool execution failed");
                (false, Value::String(render_tool_error(&call.name, &e)))
            }
        };

        debug!(tool = %call.name, call_id = %call.id, success, duration_ms, "Tool executed");
        self.conversation
            .append_tool_result(call.id.clone(), call.name.clone(), result);

        self.publish(DomainEvent::ToolExecuted {
            conversation_id: conversation_id.to_string(),
            tool_name: call.name.clone(),
            call_id: call.id.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

/// The text a failed call shows the model.
fn render_tool_error(name: &str, error: &ToolError) -> String {
    match error {
        ToolError::NotFound(_) => format!("Unknown tool: {name}"),
        ToolError::InvalidArguments(reason) => format!("ERROR: {reason}"),
        other => format!("ERROR: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        FailingProvider, FailingRetriever, ScriptedProvider, text_reply, tool_reply,
    };
    use serde_json::json;
    use sitewright_core::message::Role;
    use sitewright_core::tool::{Tool, ToolResult};

    struct Echo;

    #[async_trait::async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo arguments back"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult {
                call_id: String::new(),
                success: true,
                output: arguments.to_string(),
                data: None,
            })
        }
    }

    fn agent(provider: Arc<dyn Provider>) -> BuilderAgent {
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(Echo));
        BuilderAgent::new(
            provider,
            Arc::new(tools),
            Arc::new(FailingRetriever),
            "You build websites.",
            AgentSettings::new("test-model").with_max_iterations(4),
        )
    }

    #[tokio::test]
    async fn plain_text_is_the_final_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("All done.")]));
        let mut agent = agent(provider.clone());

        let outcome = agent.run("hello").await.unwrap();
        assert_eq!(outcome, AskOutcome::Final("All done.".into()));
        assert_eq!(provider.call_count(), 1);

        let roles: Vec<Role> = agent.conversation().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn tool_results_are_correlated_and_ordered() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![
                json!({"id": "a", "function": {"name": "echo", "arguments": {"n": 1}}}),
                json!({"id": "b", "function": {"name": "echo", "arguments": {"n": 2}}}),
            ]),
            text_reply("ok"),
        ]));
        let mut agent = agent(provider.clone());
        agent.ask("go").await.unwrap();

        let messages = agent.conversation().messages();
        let tool_ids: Vec<_> = messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.tool_call_id.clone().unwrap_or_default())
            .collect();
        assert_eq!(tool_ids, vec!["a", "b"]);

        let assistant = messages.iter().find(|m| !m.tool_calls.is_empty()).unwrap();
        assert_eq!(assistant.tool_calls.len(), 2);

        let second_request = provider.requests().pop().unwrap();
        assert_eq!(second_request.messages.len(), messages.len() - 1);
        assert_eq!(second_request.tools.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_the_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![json!({"id": "x", "name": "delete_everything", "arguments": {}})]),
            text_reply("sorry"),
        ]));
        let mut agent = agent(provider);
        agent.ask("go").await.unwrap();

        let tool_msg = agent
            .conversation()
            .messages()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        let content: Value = serde_json::from_str(&tool_msg.content).unwrap();
        assert_eq!(content, json!({"result": "Unknown tool: delete_everything"}));
    }

    #[tokio::test]
    async fn model_failure_surfaces_to_the_caller() {
        let mut agent = agent(Arc::new(FailingProvider));
        let err = agent.ask("go").await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[tokio::test]
    async fn stalled_outcome_text() {
        assert_eq!(AskOutcome::Stalled { iterations: 3 }.into_text(), STALLED_MESSAGE);
        assert!(AskOutcome::Stalled { iterations: 3 }.is_stalled());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn logs_at_info(log_responses: bool) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("All done.")]));
        let mut agent = agent(provider);
        agent.settings = agent.settings.clone().with_response_logging(log_responses);
        agent.run("hello").await.unwrap();

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn response_logging_shows_under_info_filter() {
        let logs = logs_at_info(true).await;
        assert!(logs.contains("Model response"), "{logs}");
        assert!(logs.contains("All done."), "{logs}");

        let logs = logs_at_info(false).await;
        assert!(!logs.contains("Model response"), "{logs}");
    }

    #[test]
    fn tool_error_rendering() {
        assert_eq!(
            render_tool_error("write_file", &ToolError::InvalidArguments("missing path".into())),
            "ERROR: missing path"
        );
        assert!(
            render_tool_error("write_file", &ToolError::SandboxViolation("../x".into()))
                .starts_with("ERROR: Sandbox violation")
        );
    }
}
