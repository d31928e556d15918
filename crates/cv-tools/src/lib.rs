//! cv-tools: Evidence tools for content-validator
//!
//! Tools the review loop can call to gather evidence:
//! - Web search: Tavily search API, raw JSON results

pub mod search;

pub use search::{create_search_tools, SearchConfig, SearchDepth, WebSearchTool, WEB_SEARCH_TOOL};
