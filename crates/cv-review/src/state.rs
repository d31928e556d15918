//! The transcript of one review run.

use serde::Serialize;

use cv_core::ToolCall;

/// Output of one Analyzer call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generated {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set when `text` is the placeholder for an unusable response.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

impl Generated {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
            placeholder: false,
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub(crate) fn placeholder(text: &str) -> Self {
        Self {
            placeholder: true,
            ..Self::new(text)
        }
    }
}

/// One search result as handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    /// Name of the tool that produced this result.
    pub source: String,
    /// Present when answering a structured tool call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub content: String,
    pub is_error: bool,
}

impl Evidence {
    pub fn success(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            tool_call_id: None,
            content: content.into(),
            is_error: false,
        }
    }

    pub fn failure(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::success(source, content)
        }
    }

    pub fn for_call(mut self, tool_call_id: impl Into<String>) -> Self {
        self.tool_call_id = Some(tool_call_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Human { text: String },
    Generated(Generated),
    /// Everything fetched in one round, in request order.
    ToolResult { evidence: Vec<Evidence> },
}

impl Message {
    pub fn label(&self) -> &'static str {
        match self {
            Message::Human { .. } => "human",
            Message::Generated(_) => "generated",
            Message::ToolResult { .. } => "tool_result",
        }
    }
}

/// Per-run state: the article under review and the growing transcript.
#[derive(Debug, Clone)]
pub struct ReviewState {
    article: String,
    messages: Vec<Message>,
}

impl ReviewState {
    pub fn new(article: impl Into<String>) -> Self {
        let article = article.into();
        Self {
            messages: vec![Message::Human {
                text: article.clone(),
            }],
            article,
        }
    }

    pub fn article(&self) -> &str {
        &self.article
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push_generated(&mut self, generated: Generated) {
        self.messages.push(Message::Generated(generated));
    }

    /// Append a fetch round. Only valid directly after a `Generated` message.
    pub fn push_evidence(&mut self, evidence: Vec<Evidence>) {
        debug_assert!(matches!(self.messages.last(), Some(Message::Generated(_))));
        self.messages.push(Message::ToolResult { evidence });
    }

    pub fn latest_generated(&self) -> Option<&Generated> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Generated(g) => Some(g),
            _ => None,
        })
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// A transcript never opens with a tool result, and every tool result
/// directly follows the generated message that asked for it.
pub fn is_well_formed(messages: &[Message]) -> bool {
    messages.iter().enumerate().all(|(i, msg)| match msg {
        Message::ToolResult { .. } => {
            i > 0 && matches!(messages[i - 1], Message::Generated(_))
        }
        _ => true,
    })
}
