use serde_json::json;
use tracing::{debug, warn};

use cv_core::{Error, ToolCall, ToolRegistry};

use crate::state::Evidence;

/// Runs web searches on behalf of the loop.
///
/// Failures never escape: they come back as error-flagged evidence so the
/// model can carry on with what it already has.
pub struct EvidenceFetcher {
    tools: ToolRegistry,
    default_tool: String,
}

impl EvidenceFetcher {
    /// `default_tool` answers keyword-mode queries.
    pub fn new(tools: ToolRegistry, default_tool: impl Into<String>) -> Self {
        Self {
            tools,
            default_tool: default_tool.into(),
        }
    }

    /// Search using the literal text of the latest generated message.
    pub async fn fetch(&self, query: &str) -> Evidence {
        debug!(tool = %self.default_tool, query_len = query.len(), "Fetching evidence");
        self.run(&self.default_tool, json!({ "query": query })).await
    }

    /// Run each requested tool call in order.
    pub async fn fetch_batch(&self, tool_calls: &[ToolCall]) -> Vec<Evidence> {
        let mut evidence = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            debug!(tool = %call.name, id = %call.id, arguments = %call.arguments, "Executing tool call");
            let entry = self.run(&call.name, call.arguments.clone()).await;
            evidence.push(entry.for_call(call.id.as_str()));
        }
        evidence
    }

    async fn run(&self, tool_name: &str, arguments: serde_json::Value) -> Evidence {
        let result = match self.tools.get(tool_name) {
            Some(tool) => tool.execute(arguments).await,
            None => Err(Error::tool(tool_name, "Unknown tool")),
        };

        match result {
            Ok(output) if output.is_error => {
                warn!(tool = %tool_name, "Tool reported an error");
                Evidence::failure(tool_name, failure_note(&output.content))
            }
            Ok(output) => {
                debug!(tool = %tool_name, result_len = output.content.len(), "Tool result");
                Evidence::success(tool_name, output.content)
            }
            Err(e) => {
                warn!(tool = %tool_name, error = %e, "Search failed");
                Evidence::failure(tool_name, failure_note(&e.to_string()))
            }
        }
    }
}

fn failure_note(detail: &str) -> String {
    format!(
        "Search failed: {}. Continue the review with the information already available.",
        detail
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cv_core::testing::MockTool;
    use cv_core::ToolOutput;

    fn fetcher(tool: &Arc<MockTool>) -> EvidenceFetcher {
        let mut registry = ToolRegistry::new();
        registry.register(tool.clone());
        EvidenceFetcher::new(registry, "web_search")
    }

    #[tokio::test]
    async fn test_fetch_uses_text_as_query() {
        let tool = Arc::new(MockTool::new("web_search"));
        tool.queue_output(Ok(ToolOutput::success("{\"results\": []}")));

        let evidence = fetcher(&tool).fetch("I need to search for current rates").await;
        assert_eq!(evidence.source, "web_search");
        assert_eq!(evidence.content, "{\"results\": []}");
        assert!(!evidence.is_error);
        assert!(evidence.tool_call_id.is_none());
        assert_eq!(tool.queries(), vec!["I need to search for current rates"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_becomes_evidence() {
        let tool = Arc::new(MockTool::new("web_search"));
        tool.queue_output(Err(Error::tool("web_search", "Search API error 503")));

        let evidence = fetcher(&tool).fetch("search rates").await;
        assert!(evidence.is_error);
        assert!(evidence.content.starts_with("Search failed:"));
        assert!(evidence.content.contains("503"));
    }

    #[tokio::test]
    async fn test_error_output_becomes_failure() {
        let tool = Arc::new(MockTool::new("web_search"));
        tool.queue_output(Ok(ToolOutput::error("Search API error 401: invalid key")));

        let evidence = fetcher(&tool).fetch("search rates").await;
        assert!(evidence.is_error);
        assert!(evidence.content.contains("401"));
        assert!(evidence.content.ends_with("information already available."));
    }

    #[tokio::test]
    async fn test_fetch_batch_keeps_call_ids_and_order() {
        let tool = Arc::new(MockTool::new("web_search"));
        let calls = vec![
            ToolCall::new("tc_1", "web_search", json!({"query": "card A"})),
            ToolCall::new("tc_2", "image_search", json!({"query": "card B"})),
            ToolCall::new("tc_3", "web_search", json!({"query": "card C"})),
        ];

        let evidence = fetcher(&tool).fetch_batch(&calls).await;
        assert_eq!(evidence.len(), 3);
        assert_eq!(evidence[0].tool_call_id.as_deref(), Some("tc_1"));
        assert_eq!(evidence[0].content, "results for: card A");
        assert!(evidence[1].is_error);
        assert_eq!(evidence[1].source, "image_search");
        assert_eq!(evidence[2].tool_call_id.as_deref(), Some("tc_3"));
        assert_eq!(tool.call_count(), 2);
    }
}
