//! Shared fixtures for integration tests
//!
//! A scripted model that answers by pipeline stage, and stub connectors
//! that mirror the built-in connector schemas without touching the network.

#![allow(dead_code)]

use async_trait::async_trait;
use scout_engine::conductor::prompts::{
    COPY_SYSTEM, PLANNING_SYSTEM, QUALIFICATION_SYSTEM, RESOLUTION_SYSTEM,
};
use scout_engine::conductor::Lead;
use scout_engine::connectors::ConnectorRegistry;
use scout_engine::llm::{GenerationOptions, LLMError, LLMProvider, LLMRouter, Message};
use sdk::connector::Connector;
use sdk::types::{ConnectorOutput, ConnectorSchema, EntityScope, FailureKind, ParamType};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pipeline stage a model request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Planning,
    Resolution,
    Qualification,
    Copy,
}

impl Stage {
    fn of(system: &str) -> Option<Self> {
        if system == PLANNING_SYSTEM {
            Some(Self::Planning)
        } else if system == RESOLUTION_SYSTEM {
            Some(Self::Resolution)
        } else if system.starts_with(QUALIFICATION_SYSTEM) {
            Some(Self::Qualification)
        } else if system.starts_with(COPY_SYSTEM) {
            Some(Self::Copy)
        } else {
            None
        }
    }
}

type Script = dyn Fn(Stage, &str) -> Result<String, LLMError> + Send + Sync;

/// Model backend answering from a closure over (stage, user prompt)
pub struct ScriptedModel {
    script: Box<Script>,
    calls: Arc<Mutex<HashMap<Stage, usize>>>,
}

impl ScriptedModel {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(Stage, &str) -> Result<String, LLMError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Shared call counter, readable after the model moved into a router
    pub fn counter(&self) -> Arc<Mutex<HashMap<Stage, usize>>> {
        Arc::clone(&self.calls)
    }

    pub fn into_router(self) -> Arc<LLMRouter> {
        Arc::new(LLMRouter::with_timeout(
            vec![Box::new(self) as Box<dyn LLMProvider>],
            Duration::from_secs(5),
        ))
    }
}

#[async_trait]
impl LLMProvider for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        messages: &[Message],
        _options: &GenerationOptions,
    ) -> Result<String, LLMError> {
        let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        let user = messages.get(1).map(|m| m.content.as_str()).unwrap_or("");
        let stage = Stage::of(system)
            .ok_or_else(|| LLMError::InvalidRequest("unrecognized system prompt".into()))?;

        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(stage).or_insert(0) += 1;
        }
        (self.script)(stage, user)
    }
}

/// Model backend that never answers within a test's patience
pub struct StalledModel {
    pub delay: Duration,
}

#[async_trait]
impl LLMProvider for StalledModel {
    fn name(&self) -> &str {
        "stalled"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        _messages: &[Message],
        _options: &GenerationOptions,
    ) -> Result<String, LLMError> {
        tokio::time::sleep(self.delay).await;
        Err(LLMError::Timeout)
    }
}

/// Value of `Name:` in a qualification or copy prompt
pub fn lead_name(user_prompt: &str) -> &str {
    user_prompt
        .lines()
        .find_map(|l| l.strip_prefix("Name: "))
        .unwrap_or("")
}

/// Planning answer that the keyword resolver maps onto every connector
pub fn planning_reply(user_prompt: &str) -> String {
    if user_prompt.contains("Company research") {
        json!({"subtasks": [
            "Get LinkedIn company page",
            "Get recent company posts",
            "Get company news"
        ]})
        .to_string()
    } else {
        json!({"subtasks": ["Get LinkedIn profile", "Get recent activity"]}).to_string()
    }
}

pub fn qualification_reply(score: i64, hooks: &[&str]) -> String {
    json!({
        "score": score,
        "reasons": ["Senior technical buyer"],
        "concerns": [],
        "hooks": hooks,
    })
    .to_string()
}

pub fn copy_reply(subject: &str) -> String {
    json!({
        "subject_line": subject,
        "email_body": "Hi there,\n\nSaw your post about pipelines.\n\nBest",
        "linkedin_message": "Loved your post on pipelines, happy to compare notes.",
        "talking_points": ["Pipeline reliability"],
    })
    .to_string()
}

/// Connector returning canned outcomes keyed by its main argument
pub struct StubConnector {
    schema: ConnectorSchema,
    outcomes: HashMap<String, ConnectorOutput>,
    fallback: ConnectorOutput,
    delay: Duration,
    calls: Arc<Mutex<Vec<Value>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl StubConnector {
    pub fn new(name: &str, scope: EntityScope, payload: Value) -> Self {
        let key = match scope {
            EntityScope::Company => "company_name",
            EntityScope::Profile => "linkedin_url",
        };
        Self {
            schema: ConnectorSchema::new(name, format!("Stub for {}", name), scope).required(
                key,
                ParamType::String,
                "lookup key",
            ),
            outcomes: HashMap::new(),
            fallback: ConnectorOutput::ok(payload),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer `outcome` when the main argument equals `key`
    pub fn with_outcome(mut self, key: &str, outcome: ConnectorOutput) -> Self {
        self.outcomes.insert(key.to_string(), outcome);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.calls)
    }

    /// Highest number of simultaneous invocations observed
    pub fn peak(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak)
    }
}

#[async_trait]
impl Connector for StubConnector {
    fn schema(&self) -> &ConnectorSchema {
        &self.schema
    }

    async fn invoke(&self, args: &Value) -> ConnectorOutput {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(args.clone());
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let key = self.schema.params[0].name.as_str();
        args.get(key)
            .and_then(Value::as_str)
            .and_then(|k| self.outcomes.get(k))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Call logs of the stub registry, by connector name
pub type CallLogs = HashMap<&'static str, Arc<Mutex<Vec<Value>>>>;

/// Registry of stubs named like the built-in connectors
///
/// Carol's profile is missing (`not_found`); everything else succeeds.
pub fn stub_registry(delay: Duration) -> (Arc<ConnectorRegistry>, CallLogs) {
    let stubs: Vec<(&'static str, StubConnector)> = vec![
        (
            "get_linkedin_profile",
            StubConnector::new(
                "get_linkedin_profile",
                EntityScope::Profile,
                json!({"data": {"headline": "Engineering leader", "experience": [{"title": "CTO", "company": "TechCorp"}]}}),
            )
            .with_outcome(
                "https://linkedin.com/in/carol",
                ConnectorOutput::fail(FailureKind::NotFound, "profile not found"),
            ),
        ),
        (
            "get_linkedin_activity",
            StubConnector::new(
                "get_linkedin_activity",
                EntityScope::Profile,
                json!({"posts": [{"text": "Our pipelines broke again this week", "date": "2024-01-20"}]}),
            ),
        ),
        (
            "get_linkedin_company",
            StubConnector::new(
                "get_linkedin_company",
                EntityScope::Company,
                json!({"industry": "Software", "company_size": "201-500"}),
            ),
        ),
        (
            "get_company_posts",
            StubConnector::new(
                "get_company_posts",
                EntityScope::Company,
                json!({"posts": [{"text": "We're hiring data engineers"}]}),
            ),
        ),
        (
            "get_company_news",
            StubConnector::new(
                "get_company_news",
                EntityScope::Company,
                json!({"articles": [{"title": "Company raises Series B", "date": "2024-01-18"}]}),
            ),
        ),
    ];

    let mut registry = ConnectorRegistry::new();
    let mut logs = CallLogs::new();
    for (name, stub) in stubs {
        let stub = stub.with_delay(delay);
        logs.insert(name, stub.calls());
        registry.register(Arc::new(stub));
    }
    (Arc::new(registry), logs)
}

pub fn call_count(logs: &CallLogs, connector: &str) -> usize {
    logs.get(connector)
        .and_then(|l| l.lock().ok().map(|calls| calls.len()))
        .unwrap_or(0)
}

/// Alice and Bob at TechCorp, Carol at OtherCo
pub fn sample_leads() -> Vec<Lead> {
    vec![
        Lead::new(
            "alice",
            "Alice Smith",
            "CTO",
            "TechCorp",
            "https://linkedin.com/in/alice",
        ),
        Lead::new(
            "bob",
            "Bob Jones",
            "VP Engineering",
            "TechCorp Inc.",
            "https://linkedin.com/in/bob",
        ),
        Lead::new(
            "carol",
            "Carol White",
            "Head of Data",
            "OtherCo",
            "https://linkedin.com/in/carol",
        ),
    ]
}
