//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;
use crate::message::{ToolCall, Usage};
use crate::provider::{CompletionRequest, CompletionResponse, FinishReason, Generation, Provider};
use crate::tool::{PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

/// A mock provider that returns pre-configured responses.
pub struct MockProvider {
    responses: Mutex<Vec<Result<CompletionResponse, Error>>>,
    /// Captured requests (for assertion).
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
    pub name: String,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            captured_requests: Mutex::new(Vec::new()),
            name: "mock".to_string(),
        }
    }

    fn response(generation: Generation, finish_reason: FinishReason) -> CompletionResponse {
        CompletionResponse {
            generation,
            usage: Usage::new(0, 0),
            model: "mock-model".to_string(),
            finish_reason,
        }
    }

    /// Queue a text response. Responses are returned in FIFO order.
    pub fn queue_response(&self, content: &str) {
        self.queue_result(Ok(Self::response(
            Generation::text(content),
            FinishReason::Stop,
        )));
    }

    /// Queue a response that requests tool calls.
    pub fn queue_tool_calls(&self, content: &str, tool_calls: Vec<ToolCall>) {
        self.queue_result(Ok(Self::response(
            Generation::Content {
                text: content.to_string(),
                tool_calls,
            },
            FinishReason::ToolCalls,
        )));
    }

    /// Queue a response without any usable content.
    pub fn queue_missing(&self, reason: &str) {
        self.queue_result(Ok(Self::response(
            Generation::missing(reason),
            FinishReason::Stop,
        )));
    }

    pub fn queue_error(&self, error: Error) {
        self.queue_result(Err(error));
    }

    pub fn queue_result(&self, result: Result<CompletionResponse, Error>) {
        self.responses.lock().unwrap().insert(0, result);
    }

    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        self.captured_requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(Error::Unknown("No mock response queued".to_string())))
    }
}

/// A mock tool that records its arguments and replays queued outputs.
///
/// With nothing queued it echoes the `query` argument back.
pub struct MockTool {
    name: String,
    outputs: Mutex<Vec<Result<ToolOutput, Error>>>,
    pub calls: Mutex<Vec<Value>>,
}

impl MockTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outputs: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue an output for the next execute() call (FIFO).
    pub fn queue_output(&self, output: Result<ToolOutput, Error>) {
        self.outputs.lock().unwrap().insert(0, output);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|args| args.get("query").and_then(Value::as_str).map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock search tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property("query", PropertySchema::string("Query"), true),
        )
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
        let echo = arguments
            .get("query")
            .and_then(Value::as_str)
            .map(|q| format!("results for: {}", q))
            .unwrap_or_default();
        self.calls.lock().unwrap().push(arguments);
        self.outputs
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(ToolOutput::success(echo)))
    }
}
