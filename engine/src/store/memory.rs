//! In-memory context store
//!
//! Records are indexed by entity so `records_for` touches only that entity's
//! records. Contents vanish with the process.

use super::{normalize_args, ContextRecord, ContextStore, EntityRef, RecordKey};
use async_trait::async_trait;
use chrono::Utc;
use sdk::errors::EngineError;
use sdk::types::ConnectorOutput;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// (connector, args_hash) -> record
type EntityRecords = HashMap<(String, String), ContextRecord>;

#[derive(Default)]
pub struct MemoryContextStore {
    namespace: String,
    records: RwLock<HashMap<EntityRef, EntityRecords>>,
}

impl MemoryContextStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Total number of records held
    pub async fn len(&self) -> usize {
        self.records.read().await.values().map(|m| m.len()).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ContextStore for MemoryContextStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn put(
        &self,
        entity: &EntityRef,
        connector: &str,
        args: &Value,
        outcome: &ConnectorOutput,
    ) -> Result<RecordKey, EngineError> {
        let args = normalize_args(args);
        let key = RecordKey::derive(entity, connector, &args);
        let record = ContextRecord {
            key: key.clone(),
            args,
            outcome: outcome.clone(),
            created_at: Utc::now(),
        };

        self.records
            .write()
            .await
            .entry(entity.clone())
            .or_default()
            .insert((key.connector.clone(), key.args_hash.clone()), record);

        Ok(key)
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<ContextRecord>, EngineError> {
        let records = self.records.read().await;
        Ok(records
            .get(&key.entity)
            .and_then(|m| m.get(&(key.connector.clone(), key.args_hash.clone())))
            .cloned())
    }

    async fn records_for(&self, entity: &EntityRef) -> Result<Vec<ContextRecord>, EngineError> {
        let records = self.records.read().await;
        Ok(records
            .get(entity)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn purge_namespace(&self) -> Result<u64, EngineError> {
        let mut records = self.records.write().await;
        let removed = records.values().map(|m| m.len() as u64).sum();
        records.clear();
        Ok(removed)
    }
}
