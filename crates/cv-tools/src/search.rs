//! Web search through the Tavily search API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use cv_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

pub const WEB_SEARCH_TOOL: &str = "web_search";

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    #[default]
    Advanced,
}

impl std::fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchDepth::Basic => write!(f, "basic"),
            SearchDepth::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_results: u32,
    pub search_depth: SearchDepth,
    pub include_answer: bool,
    pub include_raw_content: bool,
    pub include_images: bool,
}

impl SearchConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: 5,
            search_depth: SearchDepth::Advanced,
            include_answer: true,
            include_raw_content: true,
            include_images: true,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

// =============================================================================
// Web Search Tool
// =============================================================================

pub struct WebSearchTool {
    client: Client,
    config: SearchConfig,
}

impl WebSearchTool {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("content-validator/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    fn build_request<'a>(&self, query: &'a str) -> SearchRequest<'a> {
        SearchRequest {
            query,
            max_results: self.config.max_results,
            search_depth: self.config.search_depth,
            include_answer: self.config.include_answer,
            include_raw_content: self.config.include_raw_content,
            include_images: self.config.include_images,
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: SearchDepth,
    include_answer: bool,
    include_raw_content: bool,
    include_images: bool,
}

// Decoded only to log the payload's shape; the raw body is what the model
// sees, whatever its shape.
#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchResult>,
    #[serde(default)]
    images: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct WebSearchArgs {
    query: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns up-to-date result snippets with their URLs. \
         Use it to verify product names, rates, fees, rewards and availability."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new()
                .add_property("query", PropertySchema::string("The search query"), true),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: WebSearchArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool(WEB_SEARCH_TOOL, format!("Invalid arguments: {}", e)))?;

        let query = args.query.trim();
        if query.is_empty() {
            return Err(Error::tool(WEB_SEARCH_TOOL, "Search query is empty"));
        }

        debug!(
            query_len = query.len(),
            max_results = self.config.max_results,
            depth = %self.config.search_depth,
            "Web search request"
        );

        let url = format!("{}/search", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.build_request(query))
            .send()
            .await
            .map_err(|e| Error::tool(WEB_SEARCH_TOOL, format!("Search request failed: {}", e)))?;

        // The service answered but refused the search
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Ok(ToolOutput::error(format!("Search API error {}: {}", status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::tool(WEB_SEARCH_TOOL, format!("Failed to read response: {}", e)))?;
        trace!(body = %body, "Web search response payload");

        match serde_json::from_str::<SearchResponse>(&body) {
            Ok(parsed) => debug!(
                results = parsed.results.len(),
                images = parsed.images.len(),
                has_answer = parsed.answer.is_some(),
                urls = ?parsed.results.iter().filter_map(|r| r.url.as_deref()).collect::<Vec<_>>(),
                "Web search response"
            ),
            Err(e) => debug!(error = %e, body_len = body.len(), "Web search response in unexpected shape"),
        }

        Ok(ToolOutput::success(body))
    }
}

// =============================================================================
// Factory functions
// =============================================================================

pub fn create_search_tools(config: SearchConfig) -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(WebSearchTool::new(config))]
}
