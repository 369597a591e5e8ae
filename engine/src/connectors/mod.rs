//! Research connectors
//!
//! Concrete data sources plus the registry the resolver and executor work
//! against. The registry owns the per-call timeout so a slow backend is
//! reported as a typed failure like any other.

pub mod http;
pub mod linkedin;
pub mod news;

pub use linkedin::{
    CompanyPostsConnector, LinkedInActivityConnector, LinkedInCompanyConnector,
    LinkedInProfileConnector, RapidApiClient,
};
pub use news::CompanyNewsConnector;

use crate::config::ConnectorsConfig;
use crate::secrets::SecretCache;
use sdk::connector::Connector;
use sdk::types::{ConnectorOutput, ConnectorSchema, EntityScope, FailureKind};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Name-indexed set of available connectors
///
/// Ordered by name so prompts listing connectors are stable across runs.
#[derive(Default, Clone)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector, replacing any connector with the same name
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        let name = connector.name().to_string();
        if self.connectors.insert(name.clone(), connector).is_some() {
            warn!("Connector '{}' registered twice, keeping the latest", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Connector>> {
        self.connectors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connectors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.connectors.keys().map(String::as_str).collect()
    }

    /// Every declared schema, in name order
    pub fn schemas(&self) -> Vec<&ConnectorSchema> {
        self.connectors.values().map(|c| c.schema()).collect()
    }

    /// Schemas serving one task scope
    pub fn schemas_for(&self, scope: EntityScope) -> Vec<&ConnectorSchema> {
        self.connectors
            .values()
            .filter(|c| c.scope() == scope)
            .map(|c| c.schema())
            .collect()
    }

    /// One line per connector of `scope`, for inclusion in a model prompt
    pub fn describe_for_prompt(&self, scope: EntityScope) -> String {
        self.schemas_for(scope)
            .iter()
            .map(|s| format!("- {}: {}", s.signature(), s.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Invoke a connector with a deadline
    ///
    /// Never fails: an unknown name or an expired deadline comes back as a
    /// typed failure outcome.
    pub async fn invoke(&self, name: &str, args: &Value, timeout: Duration) -> ConnectorOutput {
        let Some(connector) = self.connectors.get(name) else {
            return ConnectorOutput::fail(
                FailureKind::Unavailable,
                format!("Connector '{}' is not registered", name),
            );
        };

        debug!("Invoking connector '{}' with args: {}", name, args);

        match tokio::time::timeout(timeout, connector.invoke(args)).await {
            Ok(outcome) => outcome,
            Err(_) => ConnectorOutput::fail(
                FailureKind::Timeout,
                format!("{} did not respond within {}s", name, timeout.as_secs()),
            ),
        }
    }
}

/// Registry with every built-in connector
pub fn default_registry(config: &ConnectorsConfig, secrets: Arc<SecretCache>) -> ConnectorRegistry {
    let client = http::build_client();

    let profile_api = RapidApiClient::new(
        client.clone(),
        config.rapidapi_base_url.clone(),
        config.rapidapi_profile_host.clone(),
        Arc::clone(&secrets),
    );
    let company_api = RapidApiClient::new(
        client.clone(),
        config.rapidapi_base_url.clone(),
        config.rapidapi_company_host.clone(),
        Arc::clone(&secrets),
    );

    let mut registry = ConnectorRegistry::new();
    registry.register(Arc::new(LinkedInProfileConnector::new(profile_api.clone())));
    registry.register(Arc::new(LinkedInActivityConnector::new(profile_api)));
    registry.register(Arc::new(LinkedInCompanyConnector::new(company_api.clone())));
    registry.register(Arc::new(CompanyPostsConnector::new(company_api)));
    registry.register(Arc::new(CompanyNewsConnector::new(
        client,
        config.newsapi_base_url.clone(),
        secrets,
    )));
    registry
}
