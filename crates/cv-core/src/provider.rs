use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::message::{ChatMessage, ToolCall, Usage};
use crate::tool::ToolDefinition;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tools: Vec<ToolDefinition>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            max_tokens: None,
            tools: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// What the model produced for one request.
///
/// A response that decodes but carries neither text nor tool calls is
/// reported as `Missing` instead of an empty `Content`, so callers never have
/// to probe for fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Generation {
    Content {
        text: String,
        #[serde(default)]
        tool_calls: Vec<ToolCall>,
    },
    Missing {
        reason: String,
    },
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Generation::Content {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn missing(reason: impl Into<String>) -> Self {
        Generation::Missing {
            reason: reason.into(),
        }
    }

    /// Build from extracted parts; empty text with no tool calls is `Missing`.
    pub fn from_parts(text: String, tool_calls: Vec<ToolCall>) -> Self {
        if text.trim().is_empty() && tool_calls.is_empty() {
            Generation::missing("response contained no text or tool calls")
        } else {
            Generation::Content { text, tool_calls }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub generation: Generation,
    pub usage: Usage,
    pub model: String,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
}

/// A remote text-generation service.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error>;
}
