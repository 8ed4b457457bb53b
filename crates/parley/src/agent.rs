use anyhow::Result;
use futures::future;
use serde_json::json;
use tracing::debug;

use crate::errors::AgentResult;
use crate::models::message::{Message, ToolRequest};
use crate::providers::base::Provider;
use crate::registry::ToolRegistry;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful customer support assistant. Use the supplied tools to assist the user.";

/// Ceiling on completion round-trips within a single respond() call.
const DEFAULT_MAX_TOOL_TURNS: usize = 10;

#[derive(Debug, thiserror::Error)]
#[error("No final answer after {0} completion round-trips")]
pub struct ToolLoopLimitError(pub usize);

#[derive(Debug, thiserror::Error)]
#[error("Assistant message carried neither text nor tool calls")]
pub struct MalformedResponseError;

/// Agent drives the tool-augmented conversation loop against a provider.
///
/// It owns the conversation history exclusively: history is append-only,
/// mutated only inside respond(), and never persisted.
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: ToolRegistry,
    system_prompt: String,
    messages: Vec<Message>,
    max_tool_turns: usize,
}

impl Agent {
    /// Create a new Agent with the specified provider and tool registry
    pub fn new(provider: Box<dyn Provider>, registry: ToolRegistry) -> Self {
        Self {
            provider,
            registry,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            messages: Vec::new(),
            max_tool_turns: DEFAULT_MAX_TOOL_TURNS,
        }
    }

    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tool_turns(mut self, max_tool_turns: usize) -> Self {
        self.max_tool_turns = max_tool_turns;
        self
    }

    /// The conversation history so far
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Run one user turn to completion and return the final assistant text.
    ///
    /// Tool-class failures (unknown tool, bad arguments, handler error) are
    /// answered into history as error-content tool messages so the model can
    /// recover; only service-class failures abort the turn, and they do so
    /// before anything half-written lands in history.
    pub async fn respond(&mut self, prompt: &str) -> Result<String> {
        self.messages.push(Message::user().with_text(prompt));

        for _ in 0..self.max_tool_turns {
            let (response, usage) = self
                .provider
                .complete(&self.system_prompt, &self.messages, self.registry.tools())
                .await?;
            debug!(
                input_tokens = ?usage.input_tokens,
                output_tokens = ?usage.output_tokens,
                "completion received"
            );

            if response.content.is_empty() {
                return Err(MalformedResponseError.into());
            }

            // Appended verbatim, tool requests included, so the next
            // round-trip can pair every call id with its response.
            self.messages.push(response.clone());

            let tool_requests: Vec<ToolRequest> = response
                .content
                .iter()
                .filter_map(|content| content.as_tool_request())
                .cloned()
                .collect();

            // An empty tool_calls sequence means a final answer
            if tool_requests.is_empty() {
                return Ok(response.text());
            }

            let futures: Vec<_> = tool_requests
                .iter()
                .map(|request| self.dispatch_tool_call(request))
                .collect();

            // Dispatched concurrently; zipping the outputs back keeps the
            // responses in the order the calls were received.
            let outputs = future::join_all(futures).await;

            let mut tool_message = Message::user();
            for (request, output) in tool_requests.iter().zip(outputs.into_iter()) {
                tool_message = tool_message.with_tool_response(request.id.clone(), output);
            }
            self.messages.push(tool_message);
        }

        Err(ToolLoopLimitError(self.max_tool_turns).into())
    }

    /// Dispatch a single tool call and encode its result for the model.
    async fn dispatch_tool_call(&self, request: &ToolRequest) -> AgentResult<String> {
        let call = request.tool_call.clone()?;
        let output = self
            .registry
            .dispatch(&call.name, call.arguments.clone())
            .await?;

        Ok(json!({
            "arguments": call.arguments,
            "function_output": output,
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgentError;
    use crate::models::role::Role;
    use crate::models::tool::ToolCall;
    use crate::orders::order_registry;
    use crate::providers::mock::MockProvider;
    use serde_json::json;

    fn order_agent(responses: Vec<Message>) -> Agent {
        Agent::new(
            Box::new(MockProvider::new(responses)),
            order_registry().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_simple_response() -> Result<()> {
        let mut agent = order_agent(vec![Message::assistant().with_text("Hello!")]);

        let answer = agent.respond("Hi").await?;

        assert_eq!(answer, "Hello!");
        // One round-trip: history grows by exactly user + assistant
        assert_eq!(agent.messages().len(), 2);
        assert_eq!(agent.messages()[0].role, Role::User);
        assert_eq!(agent.messages()[1].role, Role::Assistant);
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_call_turn() -> Result<()> {
        let mut agent = order_agent(vec![
            Message::assistant().with_tool_request(
                "call_1",
                Ok(ToolCall::new(
                    "get_delivery_date",
                    json!({"order_id": "306-3621584-1622342"}),
                )),
            ),
            Message::assistant().with_text("It will arrive in two days."),
        ]);

        let answer = agent
            .respond("Where is my package, order 306-3621584-1622342?")
            .await?;

        assert_eq!(answer, "It will arrive in two days.");
        // user, assistant w/ tool request, tool responses, final assistant
        assert_eq!(agent.messages().len(), 4);

        let response = agent.messages()[2].content[0]
            .as_tool_response()
            .expect("expected tool response");
        assert_eq!(response.id, "call_1");
        let payload = response.tool_result.as_ref().unwrap();
        assert!(payload.contains("Will arrive on"));
        assert!(payload.contains("306-3621584-1622342"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool_continues_turn() -> Result<()> {
        let mut agent = order_agent(vec![
            Message::assistant()
                .with_tool_request("call_1", Ok(ToolCall::new("get_refund", json!({})))),
            Message::assistant().with_text("Sorry, I cannot do that."),
        ]);

        let answer = agent.respond("Refund my order").await?;

        assert_eq!(answer, "Sorry, I cannot do that.");
        let response = agent.messages()[2].content[0]
            .as_tool_response()
            .expect("expected tool response");
        assert!(matches!(
            response.tool_result,
            Err(AgentError::ToolNotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_arguments_continue_turn() -> Result<()> {
        let mut agent = order_agent(vec![
            Message::assistant().with_tool_request(
                "call_1",
                Ok(ToolCall::new("get_order_status", json!({"order": "123"}))),
            ),
            Message::assistant().with_text("Could you share your order ID?"),
        ]);

        let answer = agent.respond("What's up with my order?").await?;

        assert_eq!(answer, "Could you share your order ID?");
        let response = agent.messages()[2].content[0]
            .as_tool_response()
            .expect("expected tool response");
        assert!(matches!(
            response.tool_result,
            Err(AgentError::InvalidParameters(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_tool_calls_keep_order() -> Result<()> {
        let mut agent = order_agent(vec![
            Message::assistant()
                .with_tool_request(
                    "call_1",
                    Ok(ToolCall::new(
                        "get_order_status",
                        json!({"order_id": "123"}),
                    )),
                )
                .with_tool_request(
                    "call_2",
                    Ok(ToolCall::new(
                        "get_delivery_date",
                        json!({"order_id": "123"}),
                    )),
                ),
            Message::assistant().with_text("Dispatched, arriving in two days."),
        ]);

        let answer = agent.respond("Status and delivery date for order 123?").await?;

        assert_eq!(answer, "Dispatched, arriving in two days.");
        let tool_message = &agent.messages()[2];
        let ids: Vec<&str> = tool_message
            .content
            .iter()
            .filter_map(|c| c.as_tool_response())
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["call_1", "call_2"]);

        let first = tool_message.content[0].as_tool_response().unwrap();
        assert!(first.tool_result.as_ref().unwrap().contains("Dispatched"));
        Ok(())
    }

    #[tokio::test]
    async fn test_decode_error_is_answered() -> Result<()> {
        // A request that failed to decode at the provider boundary still gets
        // a paired error response
        let mut agent = order_agent(vec![
            Message::assistant().with_tool_request(
                "call_1",
                Err(AgentError::InvalidParameters(
                    "Could not interpret tool use parameters for id call_1".to_string(),
                )),
            ),
            Message::assistant().with_text("Let me try that again."),
        ]);

        let answer = agent.respond("Where is my package?").await?;

        assert_eq!(answer, "Let me try that again.");
        let response = agent.messages()[2].content[0]
            .as_tool_response()
            .expect("expected tool response");
        assert_eq!(response.id, "call_1");
        assert!(matches!(
            response.tool_result,
            Err(AgentError::InvalidParameters(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_loop_limit() {
        let looping_request = || {
            Message::assistant().with_tool_request(
                "call_1",
                Ok(ToolCall::new(
                    "get_order_status",
                    json!({"order_id": "123"}),
                )),
            )
        };
        let mut agent = order_agent(vec![
            looping_request(),
            looping_request(),
            looping_request(),
        ])
        .with_max_tool_turns(2);

        let err = agent.respond("Keep checking").await.unwrap_err();
        assert!(err.downcast_ref::<ToolLoopLimitError>().is_some());
    }

    #[tokio::test]
    async fn test_malformed_response_aborts_before_append() {
        let mut agent = order_agent(vec![Message {
            role: Role::Assistant,
            created: 0,
            content: Vec::new(),
        }]);

        let err = agent.respond("Hello?").await.unwrap_err();
        assert!(err.downcast_ref::<MalformedResponseError>().is_some());
        // Only the user message landed; no dangling assistant entry
        assert_eq!(agent.messages().len(), 1);
        assert_eq!(agent.messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_text_only_content_counts_as_final() -> Result<()> {
        // Empty tool_calls and absent tool_calls are the same case once
        // normalized: a message whose content is text only
        let mut agent = order_agent(vec![Message::assistant().with_text("All good.")]);

        let answer = agent.respond("Everything ok?").await?;
        assert_eq!(answer, "All good.");
        assert_eq!(agent.messages().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_history_accumulates_across_turns() -> Result<()> {
        let mut agent = order_agent(vec![
            Message::assistant().with_text("Hello!"),
            Message::assistant().with_text("Goodbye!"),
        ]);

        agent.respond("Hi").await?;
        agent.respond("Bye").await?;

        // Two single round-trip turns: 2 messages each
        assert_eq!(agent.messages().len(), 4);
        Ok(())
    }
}
