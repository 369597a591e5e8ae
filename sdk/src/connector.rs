//! Connector trait
//!
//! A connector is a named, schema-typed external data operation. Expected
//! failure modes (missing credential, not found, rate limited) come back as
//! a `ConnectorOutput::Failure`, never as a panic or an `Err`.

use crate::types::{ConnectorOutput, ConnectorSchema, EntityScope};
use async_trait::async_trait;
use serde_json::Value;

/// Trait that all research connectors must implement
#[async_trait]
pub trait Connector: Send + Sync {
    /// Declared name, scope and argument schema
    fn schema(&self) -> &ConnectorSchema;

    /// Returns the name of the connector
    fn name(&self) -> &str {
        &self.schema().name
    }

    /// Returns the task scope this connector serves
    fn scope(&self) -> EntityScope {
        self.schema().scope
    }

    /// Run the operation with arguments already validated against `schema()`
    async fn invoke(&self, args: &Value) -> ConnectorOutput;
}
