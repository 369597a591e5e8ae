/// Context record persistence
///
/// Row-level access to `context_records`. All queries are parameterized.
/// Upserts go through `INSERT .. ON CONFLICT DO UPDATE`, which SQLite applies
/// atomically per key, so concurrent writers never need an outer lock.
use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

/// Raw stored row
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRow {
    pub namespace: String,
    pub entity_kind: String,
    pub entity_id: String,
    pub connector: String,
    pub args_hash: String,
    pub args_json: String,
    pub result_json: Option<String>,
    pub error_kind: Option<String>,
    pub error_json: Option<String>,
    /// Unix epoch milliseconds
    pub created_at: i64,
}

/// Repository for context record rows
pub struct ContextRecordRepository {
    pool: SqlitePool,
}

const SELECT_COLUMNS: &str = "SELECT namespace, entity_kind, entity_id, connector, args_hash, \
     args_json, result_json, error_kind, error_json, created_at FROM context_records";

impl ContextRecordRepository {
    /// Create a new repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the row at this row's key
    pub async fn upsert(&self, row: &ContextRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO context_records
                (namespace, entity_kind, entity_id, connector, args_hash,
                 args_json, result_json, error_kind, error_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (namespace, entity_kind, entity_id, connector, args_hash)
             DO UPDATE SET
                args_json = excluded.args_json,
                result_json = excluded.result_json,
                error_kind = excluded.error_kind,
                error_json = excluded.error_json,
                created_at = excluded.created_at",
        )
        .bind(&row.namespace)
        .bind(&row.entity_kind)
        .bind(&row.entity_id)
        .bind(&row.connector)
        .bind(&row.args_hash)
        .bind(&row.args_json)
        .bind(&row.result_json)
        .bind(&row.error_kind)
        .bind(&row.error_json)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert context record")?;

        Ok(())
    }

    /// Fetch a single row by its full key
    pub async fn get(
        &self,
        namespace: &str,
        entity_kind: &str,
        entity_id: &str,
        connector: &str,
        args_hash: &str,
    ) -> Result<Option<ContextRow>> {
        let sql = format!(
            "{} WHERE namespace = ? AND entity_kind = ? AND entity_id = ? \
             AND connector = ? AND args_hash = ?",
            SELECT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(namespace)
            .bind(entity_kind)
            .bind(entity_id)
            .bind(connector)
            .bind(args_hash)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get context record")?;

        Ok(row.map(|r| Self::from_row(&r)))
    }

    /// All rows owned by one entity (served by the entity index)
    pub async fn list_for_entity(
        &self,
        namespace: &str,
        entity_kind: &str,
        entity_id: &str,
    ) -> Result<Vec<ContextRow>> {
        let sql = format!(
            "{} WHERE namespace = ? AND entity_kind = ? AND entity_id = ? \
             ORDER BY connector, created_at",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(namespace)
            .bind(entity_kind)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list context records")?;

        Ok(rows.iter().map(Self::from_row).collect())
    }

    /// Number of rows in a namespace
    pub async fn count(&self, namespace: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM context_records WHERE namespace = ?")
                .bind(namespace)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count context records")?;
        Ok(count)
    }

    /// Delete every row in a namespace
    pub async fn delete_namespace(&self, namespace: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM context_records WHERE namespace = ?")
            .bind(namespace)
            .execute(&self.pool)
            .await
            .context("Failed to delete namespace")?;

        Ok(result.rows_affected())
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> ContextRow {
        ContextRow {
            namespace: row.get("namespace"),
            entity_kind: row.get("entity_kind"),
            entity_id: row.get("entity_id"),
            connector: row.get("connector"),
            args_hash: row.get("args_hash"),
            args_json: row.get("args_json"),
            result_json: row.get("result_json"),
            error_kind: row.get("error_kind"),
            error_json: row.get("error_json"),
            created_at: row.get("created_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use tempfile::TempDir;

    fn row(ns: &str, connector: &str, result: Option<&str>, error: Option<&str>) -> ContextRow {
        ContextRow {
            namespace: ns.to_string(),
            entity_kind: "company".to_string(),
            entity_id: "acme".to_string(),
            connector: connector.to_string(),
            args_hash: "0123456789abcdef".to_string(),
            args_json: r#"{"company_name":"Acme"}"#.to_string(),
            result_json: result.map(String::from),
            error_kind: error.map(|_| "not_found".to_string()),
            error_json: error.map(String::from),
            created_at: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("test.db")).await.unwrap();
        let repo = db.context_records();

        repo.upsert(&row("ns", "get_company_news", Some("[1]"), None))
            .await
            .unwrap();
        repo.upsert(&row("ns", "get_company_news", None, Some(r#"{"kind":"not_found"}"#)))
            .await
            .unwrap();

        assert_eq!(repo.count("ns").await.unwrap(), 1);
        let stored = repo
            .get("ns", "company", "acme", "get_company_news", "0123456789abcdef")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.result_json.is_none());
        assert_eq!(stored.error_kind.as_deref(), Some("not_found"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_result_and_error_are_exclusive() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("test.db")).await.unwrap();
        let repo = db.context_records();

        let both = row("ns", "get_company_news", Some("[]"), Some("{}"));
        assert!(repo.upsert(&both).await.is_err());

        let neither = row("ns", "get_company_news", None, None);
        assert!(repo.upsert(&neither).await.is_err());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("test.db")).await.unwrap();
        let repo = db.context_records();

        repo.upsert(&row("run-a", "get_company_posts", Some("[]"), None))
            .await
            .unwrap();
        repo.upsert(&row("run-b", "get_company_posts", Some("[]"), None))
            .await
            .unwrap();

        assert_eq!(
            repo.list_for_entity("run-a", "company", "acme")
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(repo.delete_namespace("run-a").await.unwrap(), 1);
        assert_eq!(repo.count("run-a").await.unwrap(), 0);
        assert_eq!(repo.count("run-b").await.unwrap(), 1);

        db.close().await.unwrap();
    }
}
