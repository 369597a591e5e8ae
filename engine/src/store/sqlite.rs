//! SQLite-backed context store

use super::{normalize_args, ContextRecord, ContextStore, EntityRef, RecordKey};
use crate::db::{ContextRecordRepository, ContextRow, Database};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sdk::errors::EngineError;
use sdk::types::{ConnectorFailure, ConnectorOutput};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Context store persisting to a WAL-mode SQLite database
pub struct SqliteContextStore {
    db: Arc<Database>,
    namespace: String,
}

fn db_err(err: anyhow::Error) -> EngineError {
    EngineError::Database(format!("{:#}", err))
}

impl SqliteContextStore {
    /// Open the database at `path` and scope this store to `namespace`
    pub async fn open(path: &Path, namespace: impl Into<String>) -> Result<Self, EngineError> {
        let db = Database::new(path).await.map_err(db_err)?;
        Ok(Self::with_database(Arc::new(db), namespace))
    }

    /// Share an already-open database
    pub fn with_database(db: Arc<Database>, namespace: impl Into<String>) -> Self {
        Self {
            db,
            namespace: namespace.into(),
        }
    }

    /// Flush the WAL and close the pool
    pub async fn close(&self) -> Result<(), EngineError> {
        self.db.close().await.map_err(db_err)
    }

    /// Number of records in this namespace
    pub async fn count(&self) -> Result<i64, EngineError> {
        self.repo().count(&self.namespace).await.map_err(db_err)
    }

    fn repo(&self) -> ContextRecordRepository {
        self.db.context_records()
    }

    fn to_row(
        &self,
        key: &RecordKey,
        args: &Value,
        outcome: &ConnectorOutput,
    ) -> Result<ContextRow, EngineError> {
        let (result_json, error_kind, error_json) = match outcome {
            ConnectorOutput::Success(payload) => {
                (Some(serde_json::to_string(payload)?), None, None)
            }
            ConnectorOutput::Failure(failure) => (
                None,
                Some(failure.kind.to_string()),
                Some(serde_json::to_string(failure)?),
            ),
        };

        Ok(ContextRow {
            namespace: self.namespace.clone(),
            entity_kind: key.entity.kind().to_string(),
            entity_id: key.entity.id().to_string(),
            connector: key.connector.clone(),
            args_hash: key.args_hash.clone(),
            args_json: serde_json::to_string(args)?,
            result_json,
            error_kind,
            error_json,
            created_at: Utc::now().timestamp_millis(),
        })
    }

    fn from_row(row: ContextRow) -> Result<ContextRecord, EngineError> {
        let entity = EntityRef::from_parts(&row.entity_kind, &row.entity_id).ok_or_else(|| {
            EngineError::Database(format!("Unknown entity kind '{}'", row.entity_kind))
        })?;

        let outcome = match (row.result_json, row.error_json) {
            (Some(result), None) => ConnectorOutput::Success(serde_json::from_str(&result)?),
            (None, Some(error)) => {
                ConnectorOutput::Failure(serde_json::from_str::<ConnectorFailure>(&error)?)
            }
            _ => {
                return Err(EngineError::Database(format!(
                    "Record {}/{} has no single outcome",
                    row.entity_id, row.connector
                )))
            }
        };

        let created_at = Utc
            .timestamp_millis_opt(row.created_at)
            .single()
            .ok_or_else(|| EngineError::Database("Invalid record timestamp".to_string()))?;

        Ok(ContextRecord {
            key: RecordKey {
                entity,
                connector: row.connector,
                args_hash: row.args_hash,
            },
            args: serde_json::from_str(&row.args_json)?,
            outcome,
            created_at,
        })
    }
}

#[async_trait]
impl ContextStore for SqliteContextStore {
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
        let row = self.to_row(&key, &args, outcome)?;

        self.repo().upsert(&row).await.map_err(db_err)?;
        tracing::debug!("Stored {} in namespace {}", key, self.namespace);

        Ok(key)
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<ContextRecord>, EngineError> {
        self.repo()
            .get(
                &self.namespace,
                key.entity.kind(),
                key.entity.id(),
                &key.connector,
                &key.args_hash,
            )
            .await
            .map_err(db_err)?
            .map(Self::from_row)
            .transpose()
    }

    async fn records_for(&self, entity: &EntityRef) -> Result<Vec<ContextRecord>, EngineError> {
        self.repo()
            .list_for_entity(&self.namespace, entity.kind(), entity.id())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(Self::from_row)
            .collect()
    }

    async fn purge_namespace(&self) -> Result<u64, EngineError> {
        let removed = self
            .repo()
            .delete_namespace(&self.namespace)
            .await
            .map_err(db_err)?;
        tracing::info!("Purged {} records from namespace {}", removed, self.namespace);
        Ok(removed)
    }
}
