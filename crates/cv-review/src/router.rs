//! Deciding whether the loop fetches more evidence or stops.

use serde::{Deserialize, Serialize};

use crate::state::Generated;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop,
}

/// Inspects the latest generated message and picks the next step.
pub trait Router: Send + Sync {
    fn name(&self) -> &str;

    fn decide(&self, latest: &Generated) -> Decision;
}

/// Continues whenever the text mentions "search", in any case.
///
/// Crude on purpose: any unrelated use of the word triggers a search round,
/// and a model asking to "look up" something does not.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordRouter;

const SEARCH_KEYWORD: &str = "search";

impl Router for KeywordRouter {
    fn name(&self) -> &str {
        "keyword"
    }

    fn decide(&self, latest: &Generated) -> Decision {
        if latest.text.to_lowercase().contains(SEARCH_KEYWORD) {
            Decision::Continue
        } else {
            Decision::Stop
        }
    }
}

/// Continues when the model made structured tool calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolCallRouter;

impl Router for ToolCallRouter {
    fn name(&self) -> &str {
        "tool_calls"
    }

    fn decide(&self, latest: &Generated) -> Decision {
        if latest.tool_calls.is_empty() {
            Decision::Stop
        } else {
            Decision::Continue
        }
    }
}

/// How the model asks for evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    /// Search tools are advertised and the model calls them explicitly.
    #[default]
    ToolCalls,
    /// No tools are advertised; the model's text is scanned for "search".
    Heuristic,
}

impl ReviewMode {
    pub fn router(&self) -> Box<dyn Router> {
        match self {
            ReviewMode::ToolCalls => Box::new(ToolCallRouter),
            ReviewMode::Heuristic => Box::new(KeywordRouter),
        }
    }

    pub fn advertises_tools(&self) -> bool {
        matches!(self, ReviewMode::ToolCalls)
    }
}

impl std::fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewMode::ToolCalls => write!(f, "tool_calls"),
            ReviewMode::Heuristic => write!(f, "heuristic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::ToolCall;

    fn decide(text: &str) -> Decision {
        KeywordRouter.decide(&Generated::new(text))
    }

    #[test]
    fn test_keyword_router_continues_on_search() {
        assert_eq!(decide("I need to search for current rates"), Decision::Continue);
        assert_eq!(decide("SEARCH: Citi PremierMiles earn rate"), Decision::Continue);
        assert_eq!(decide("Researching..."), Decision::Continue);
    }

    #[test]
    fn test_keyword_router_stops_otherwise() {
        assert_eq!(decide("The article is accurate."), Decision::Stop);
        assert_eq!(decide("Let me look up the fees."), Decision::Stop);
        assert_eq!(decide(""), Decision::Stop);
    }

    #[test]
    fn test_keyword_router_ignores_tool_calls() {
        let generated = Generated::new("Checking").with_tool_calls(vec![ToolCall::new(
            "tc_1",
            "web_search",
            serde_json::json!({"query": "x"}),
        )]);
        assert_eq!(KeywordRouter.decide(&generated), Decision::Stop);
    }

    #[test]
    fn test_tool_call_router() {
        let plain = Generated::new("I should search for this");
        assert_eq!(ToolCallRouter.decide(&plain), Decision::Stop);

        let with_call = Generated::new("").with_tool_calls(vec![ToolCall::new(
            "tc_1",
            "web_search",
            serde_json::json!({"query": "x"}),
        )]);
        assert_eq!(ToolCallRouter.decide(&with_call), Decision::Continue);
    }

    #[test]
    fn test_mode_selects_router() {
        assert_eq!(ReviewMode::Heuristic.router().name(), "keyword");
        assert_eq!(ReviewMode::ToolCalls.router().name(), "tool_calls");
        assert!(!ReviewMode::Heuristic.advertises_tools());
        assert_eq!(ReviewMode::default(), ReviewMode::ToolCalls);
    }

    #[test]
    fn test_mode_deserialization() {
        let mode: ReviewMode = serde_json::from_str("\"heuristic\"").unwrap();
        assert_eq!(mode, ReviewMode::Heuristic);
        assert_eq!(ReviewMode::ToolCalls.to_string(), "tool_calls");
    }
}
