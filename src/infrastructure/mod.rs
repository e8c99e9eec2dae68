//! Infrastructure layer
//!
//! Adapters for external dependencies:
//! - Anthropic Messages API client implementing the `LlmPort`
//! - Hierarchical configuration loading (figment)
//! - Tracing subscriber initialization

pub mod anthropic;
pub mod config;
pub mod logging;
