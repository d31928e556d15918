//! cv-providers: Text-generation provider implementations for content-validator
//!
//! This crate provides implementations of the Provider trait for LLM APIs.

pub mod anthropic;

pub use anthropic::AnthropicProvider;
