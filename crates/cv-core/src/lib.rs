//! cv-core: Core types and traits for content-validator
//!
//! This crate provides the wire-level chat types, the `Provider` trait for
//! text-generation services and the `Tool` trait for evidence sources that
//! the review loop is built on.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::Error;
pub use message::{ChatMessage, Role, ToolCall, Usage};
pub use provider::{CompletionRequest, CompletionResponse, FinishReason, Generation, Provider};
pub use tool::{PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters, ToolRegistry};

pub type Result<T> = std::result::Result<T, Error>;
