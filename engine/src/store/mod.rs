//! Context store
//!
//! Durable, namespaced persistence of connector outcomes. Each record is
//! addressed by `(owning entity, connector name, normalized-argument hash)`;
//! writing the same address twice replaces the earlier record.
//!
//! Two backends implement [`ContextStore`]:
//! - [`SqliteContextStore`]: the default, one row per record in a WAL-mode database
//! - [`MemoryContextStore`]: an entity-indexed map for tests and ephemeral runs

use crate::conductor::types::{CompanyKey, LeadId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use sdk::types::{ConnectorFailure, ConnectorOutput};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryContextStore;
pub use sqlite::SqliteContextStore;

/// Length of the hex argument hash embedded in record keys
pub const ARGS_HASH_LEN: usize = 16;

/// Entity that owns a context record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Lead(LeadId),
    Company(CompanyKey),
}

impl EntityRef {
    /// Storage discriminator: "lead" or "company"
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lead(_) => "lead",
            Self::Company(_) => "company",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Lead(id) => id.as_str(),
            Self::Company(key) => key.as_str(),
        }
    }

    /// Rebuild from stored columns
    pub fn from_parts(kind: &str, id: &str) -> Option<Self> {
        match kind {
            "lead" => Some(Self::Lead(LeadId::new(id))),
            "company" => Some(Self::Company(CompanyKey::from_normalized(id))),
            _ => None,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Address of one context record within a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub entity: EntityRef,
    pub connector: String,
    pub args_hash: String,
}

impl RecordKey {
    /// Derive the key for a call; `args` need not be pre-normalized
    pub fn derive(entity: &EntityRef, connector: &str, args: &Value) -> Self {
        Self {
            entity: entity.clone(),
            connector: connector.to_string(),
            args_hash: args_hash(args),
        }
    }

    /// Flat storage key, e.g. `company:acme/get_company_news/3f2a9c0d1e4b5a67`
    pub fn storage_key(&self) -> String {
        format!("{}/{}/{}", self.entity, self.connector, self.args_hash)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// One persisted connector outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub key: RecordKey,
    /// Normalized arguments the connector was called with
    pub args: Value,
    /// Result payload or typed failure, never both
    pub outcome: ConnectorOutput,
    pub created_at: DateTime<Utc>,
}

/// Normalize connector arguments into their canonical form
///
/// Object keys are sorted, `null` members are dropped (an absent optional
/// and an explicit null mean the same call) and strings are trimmed.
pub fn normalize_args(args: &Value) -> Value {
    match args {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, normalize_args(v)))
                .collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_args).collect()),
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    }
}

/// Canonical JSON text, with object keys emitted in sorted order
fn canonical_json(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(*key) {
                    canonical_json(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                canonical_json(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Stable hash of normalized arguments (hex SHA-256, truncated)
pub fn args_hash(args: &Value) -> String {
    let mut text = String::new();
    canonical_json(&normalize_args(args), &mut text);
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(ARGS_HASH_LEN);
    hex
}

/// Latest outcome of one connector, as seen by a lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEntry {
    pub source: EntityRef,
    pub outcome: ConnectorOutput,
    pub created_at: DateTime<Utc>,
}

/// Read-only, per-lead view: connector name to its latest outcome
///
/// Merges the lead's own records with its company's records. A success
/// beats a failure for the same connector; among equals the newest wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedContext {
    entries: BTreeMap<String, AggregatedEntry>,
}

impl AggregatedContext {
    /// Build the view from an arbitrary record set
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ContextRecord>,
    {
        let mut entries: BTreeMap<String, AggregatedEntry> = BTreeMap::new();
        for record in records {
            let candidate = AggregatedEntry {
                source: record.key.entity,
                outcome: record.outcome,
                created_at: record.created_at,
            };
            match entries.get(&record.key.connector) {
                Some(current) if !supersedes(&candidate, current) => {}
                _ => {
                    entries.insert(record.key.connector, candidate);
                }
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, connector: &str) -> bool {
        self.entries.contains_key(connector)
    }

    pub fn entry(&self, connector: &str) -> Option<&AggregatedEntry> {
        self.entries.get(connector)
    }

    /// Successful payload for a connector, if any
    pub fn payload(&self, connector: &str) -> Option<&Value> {
        self.entries
            .get(connector)
            .and_then(|e| e.outcome.payload())
    }

    /// Failure for a connector that never succeeded
    pub fn failure(&self, connector: &str) -> Option<&ConnectorFailure> {
        self.entries
            .get(connector)
            .and_then(|e| e.outcome.failure())
    }

    /// Connectors with a successful payload, in name order
    pub fn succeeded(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, e)| e.outcome.is_success())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Connectors whose only outcome is a failure, in name order
    pub fn failed(&self) -> Vec<(&str, &ConnectorFailure)> {
        self.entries
            .iter()
            .filter_map(|(name, e)| e.outcome.failure().map(|f| (name.as_str(), f)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregatedEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn supersedes(candidate: &AggregatedEntry, current: &AggregatedEntry) -> bool {
    match (candidate.outcome.is_success(), current.outcome.is_success()) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.created_at >= current.created_at,
    }
}

/// Persistence contract for connector outcomes
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Namespace isolating this store's records from other runs
    fn namespace(&self) -> &str;

    /// Write one outcome; replaces any record at the same key
    async fn put(
        &self,
        entity: &EntityRef,
        connector: &str,
        args: &Value,
        outcome: &ConnectorOutput,
    ) -> Result<RecordKey, EngineError>;

    /// Point lookup
    async fn get(&self, key: &RecordKey) -> Result<Option<ContextRecord>, EngineError>;

    /// Every record owned by one entity
    async fn records_for(&self, entity: &EntityRef) -> Result<Vec<ContextRecord>, EngineError>;

    /// Delete every record in this namespace, returning how many were removed
    async fn purge_namespace(&self) -> Result<u64, EngineError>;

    /// Merged view for a lead and, when it has one, its company
    ///
    /// Missing data is simply absent from the result.
    async fn aggregate(
        &self,
        lead: &LeadId,
        company: Option<&CompanyKey>,
    ) -> Result<AggregatedContext, EngineError> {
        let mut records = self.records_for(&EntityRef::Lead(lead.clone())).await?;
        if let Some(company) = company {
            records.extend(
                self.records_for(&EntityRef::Company(company.clone()))
                    .await?,
            );
        }
        Ok(AggregatedContext::from_records(records))
    }
}
