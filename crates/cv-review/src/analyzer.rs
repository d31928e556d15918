use std::sync::Arc;

use tracing::{debug, warn};

use cv_core::{ChatMessage, CompletionRequest, Generation, Provider, Result, ToolDefinition};

use crate::prompt::ReviewPrompt;
use crate::router::ReviewMode;
use crate::state::{Generated, Message, ReviewState};

/// Substituted for any response the model gave without usable content.
pub const NO_RESPONSE_PLACEHOLDER: &str = "No valid response received.";

const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Sends the article and the transcript so far to the text-generation service.
pub struct Analyzer {
    provider: Arc<dyn Provider>,
    mode: ReviewMode,
    prompt: ReviewPrompt,
    model: Option<String>,
    max_tokens: u32,
    tools: Vec<ToolDefinition>,
}

impl Analyzer {
    pub fn new(provider: Arc<dyn Provider>, mode: ReviewMode) -> Self {
        Self {
            provider,
            mode,
            prompt: ReviewPrompt::default(),
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            tools: Vec::new(),
        }
    }

    pub fn with_prompt(mut self, prompt: ReviewPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Tool schemas offered to the model. Ignored in heuristic mode.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn mode(&self) -> ReviewMode {
        self.mode
    }

    pub async fn analyze(&self, state: &ReviewState) -> Result<Generated> {
        let mut request =
            CompletionRequest::new(self.build_messages(state)).with_max_tokens(self.max_tokens);
        if let Some(model) = &self.model {
            request = request.with_model(model.as_str());
        }
        if self.mode.advertises_tools() {
            request = request.with_tools(self.tools.clone());
        }

        debug!(
            provider = self.provider.name(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Analyzing article"
        );

        match self.provider.complete(request).await {
            Ok(response) => match response.generation {
                Generation::Content { text, tool_calls } => {
                    debug!(
                        text_len = text.len(),
                        tool_calls = tool_calls.len(),
                        finish_reason = ?response.finish_reason,
                        "Analyzer response"
                    );
                    Ok(Generated::new(text).with_tool_calls(tool_calls))
                }
                Generation::Missing { reason } => {
                    warn!(%reason, "Generation had no usable content, substituting placeholder");
                    Ok(Generated::placeholder(NO_RESPONSE_PLACEHOLDER))
                }
            },
            Err(e) if e.is_malformed_response() => {
                warn!(error = %e, "Generation response was malformed, substituting placeholder");
                Ok(Generated::placeholder(NO_RESPONSE_PLACEHOLDER))
            }
            Err(e) => Err(e),
        }
    }

    fn build_messages(&self, state: &ReviewState) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.prompt.system())];

        for msg in state.messages() {
            match msg {
                Message::Human { text } => {
                    messages.push(ChatMessage::user(self.prompt.review_request(text, self.mode)));
                }
                Message::Generated(generated) => {
                    messages.push(ChatMessage::assistant_with_tool_calls(
                        generated.text.as_str(),
                        generated.tool_calls.clone(),
                    ));
                }
                Message::ToolResult { evidence } => {
                    // Structured results answer a call id; keyword-mode results
                    // go back as a plain user turn.
                    let mut loose = Vec::new();
                    for entry in evidence {
                        match &entry.tool_call_id {
                            Some(id) if entry.is_error => {
                                messages.push(ChatMessage::tool_error(id, entry.content.as_str()))
                            }
                            Some(id) => {
                                messages.push(ChatMessage::tool_result(id, entry.content.as_str()))
                            }
                            None => loose.push(entry.content.as_str()),
                        }
                    }
                    if !loose.is_empty() {
                        messages.push(ChatMessage::user(
                            self.prompt.evidence_turn(&loose.join("\n\n")),
                        ));
                    }
                }
            }
        }

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Evidence;
    use cv_core::testing::MockProvider;
    use cv_core::{Error, Role, ToolCall};

    fn analyzer(provider: &Arc<MockProvider>, mode: ReviewMode) -> Analyzer {
        Analyzer::new(provider.clone(), mode)
            .with_model("claude-3-5-sonnet-20240620")
            .with_max_tokens(4096)
            .with_tools(vec![ToolDefinition::new("web_search", "Search the web")])
    }

    #[tokio::test]
    async fn test_request_shape() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("Everything checks out.");
        let state = ReviewState::new("The OCBC 365 card gives 6% cashback on dining.");

        let generated = analyzer(&provider, ReviewMode::ToolCalls)
            .analyze(&state)
            .await
            .unwrap();
        assert_eq!(generated.text, "Everything checks out.");
        assert!(!generated.placeholder);

        let request = provider.last_request().unwrap();
        assert_eq!(request.max_tokens, Some(4096));
        assert_eq!(request.model.as_deref(), Some("claude-3-5-sonnet-20240620"));
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[1].role, Role::User);
        assert!(request.messages[1]
            .content
            .contains("The OCBC 365 card gives 6% cashback on dining."));
    }

    #[tokio::test]
    async fn test_heuristic_mode_sends_no_tools() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("Fine.");
        analyzer(&provider, ReviewMode::Heuristic)
            .analyze(&ReviewState::new("article"))
            .await
            .unwrap();
        assert!(provider.last_request().unwrap().tools.is_empty());
    }

    #[tokio::test]
    async fn test_missing_generation_uses_placeholder() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_missing("no text block");

        let generated = analyzer(&provider, ReviewMode::Heuristic)
            .analyze(&ReviewState::new("article"))
            .await
            .unwrap();
        assert_eq!(generated.text, NO_RESPONSE_PLACEHOLDER);
        assert!(generated.placeholder);
    }

    #[tokio::test]
    async fn test_malformed_response_uses_placeholder() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_error(Error::serialization("missing field `content`"));

        let generated = analyzer(&provider, ReviewMode::ToolCalls)
            .analyze(&ReviewState::new("article"))
            .await
            .unwrap();
        assert_eq!(generated.text, NO_RESPONSE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_transport_errors_propagate() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_error(Error::auth("invalid x-api-key"));

        let err = analyzer(&provider, ReviewMode::ToolCalls)
            .analyze(&ReviewState::new("article"))
            .await
            .unwrap_err();
        assert!(err.is_auth_error());
    }

    #[test]
    fn test_history_conversion() {
        let provider = Arc::new(MockProvider::new());
        let analyzer = analyzer(&provider, ReviewMode::ToolCalls);

        let mut state = ReviewState::new("article");
        state.push_generated(Generated::new("Checking").with_tool_calls(vec![ToolCall::new(
            "tc_1",
            "web_search",
            serde_json::json!({"query": "rate"}),
        )]));
        state.push_evidence(vec![Evidence::success("web_search", "{\"results\":[]}").for_call("tc_1")]);
        state.push_generated(Generated::new("I will search again"));
        state.push_evidence(vec![Evidence::success("web_search", "keyword results")]);

        let messages = analyzer.build_messages(&state);
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant, Role::User]
        );
        assert_eq!(messages[2].tool_calls.len(), 1);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("tc_1"));
        assert!(!messages[3].is_error);
        assert!(messages[5].content.contains("keyword results"));
    }

    #[test]
    fn test_failed_evidence_sent_as_tool_error() {
        let provider = Arc::new(MockProvider::new());
        let analyzer = analyzer(&provider, ReviewMode::ToolCalls);

        let mut state = ReviewState::new("article");
        state.push_generated(Generated::new("").with_tool_calls(vec![
            ToolCall::new("tc_1", "web_search", serde_json::json!({"query": "a"})),
            ToolCall::new("tc_2", "web_search", serde_json::json!({"query": "b"})),
        ]));
        state.push_evidence(vec![
            Evidence::success("web_search", "found").for_call("tc_1"),
            Evidence::failure("web_search", "Search failed: timeout").for_call("tc_2"),
        ]);

        let messages = analyzer.build_messages(&state);
        assert_eq!(messages.len(), 5);
        assert!(!messages[3].is_error);
        assert_eq!(messages[4].tool_call_id.as_deref(), Some("tc_2"));
        assert!(messages[4].is_error);
    }
}
