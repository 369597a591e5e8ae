//! Scout SDK
//!
//! Shared contracts between the research engine and its connectors:
//! the error taxonomy, the `Connector` trait, and the schema/outcome types
//! a connector declares and returns.

/// Connector trait
pub mod connector;

/// Error types and handling
pub mod errors;

/// Connector schema and outcome types
pub mod types;

// Re-export commonly used types
pub use connector::Connector;
pub use errors::{EngineError, ScoutErrorExt};
pub use types::{
    ConnectorArgs, ConnectorFailure, ConnectorOutput, ConnectorSchema, EntityScope, FailureKind,
    ParamSpec, ParamType, SchemaError,
};
