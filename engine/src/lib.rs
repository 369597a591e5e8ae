//! Scout Engine Library
//!
//! This library provides the core functionality of the Scout lead-research
//! engine. It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Database persistence module
pub mod db;

/// Research context store
pub mod store;

/// LLM provider abstraction layer
pub mod llm;

/// External research data sources
pub mod connectors;

/// Research conductor: planning, execution, qualification and copy
pub mod conductor;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
