//! Integration tests for the SQLite layer under the context store

use scout_engine::db::{ContextRow, Database};
use tempfile::TempDir;

fn row(entity_id: &str, args_hash: &str) -> ContextRow {
    ContextRow {
        namespace: "ns".to_string(),
        entity_kind: "lead".to_string(),
        entity_id: entity_id.to_string(),
        connector: "get_linkedin_profile".to_string(),
        args_hash: args_hash.to_string(),
        args_json: r#"{"linkedin_url":"https://linkedin.com/in/alice"}"#.to_string(),
        result_json: Some(r#"{"headline":"CTO"}"#.to_string()),
        error_kind: None,
        error_json: None,
        created_at: 1_705_000_000_000,
    }
}

#[tokio::test]
async fn test_database_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("context.db");

    let db = Database::new(&db_path).await.unwrap();
    assert!(db_path.exists());

    let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(journal_mode.to_lowercase(), "wal");

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_entity_kind_constraint() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("context.db")).await.unwrap();
    let repo = db.context_records();

    assert!(repo.upsert(&row("alice", "h1")).await.is_ok());

    let mut bad = row("alice", "h2");
    bad.entity_kind = "person".to_string();
    assert!(repo.upsert(&bad).await.is_err());

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_exactly_one_of_result_or_error() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("context.db")).await.unwrap();
    let repo = db.context_records();

    let mut neither = row("alice", "h1");
    neither.result_json = None;
    assert!(repo.upsert(&neither).await.is_err());

    let mut both = row("alice", "h2");
    both.error_kind = Some("not_found".to_string());
    both.error_json = Some(r#"{"kind":"not_found","reason":"gone"}"#.to_string());
    assert!(repo.upsert(&both).await.is_err());

    let mut failure = row("alice", "h3");
    failure.result_json = None;
    failure.error_kind = Some("not_found".to_string());
    failure.error_json = Some(r#"{"kind":"not_found","reason":"gone"}"#.to_string());
    assert!(repo.upsert(&failure).await.is_ok());

    assert_eq!(repo.count("ns").await.unwrap(), 1);

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_upsert_replaces_in_place() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("context.db")).await.unwrap();
    let repo = db.context_records();

    repo.upsert(&row("alice", "h1")).await.unwrap();

    let mut newer = row("alice", "h1");
    newer.result_json = None;
    newer.error_kind = Some("rate_limited".to_string());
    newer.error_json = Some(r#"{"kind":"rate_limited","reason":"429"}"#.to_string());
    newer.created_at += 1_000;
    repo.upsert(&newer).await.unwrap();

    let stored = repo
        .get("ns", "lead", "alice", "get_linkedin_profile", "h1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, newer);
    assert_eq!(repo.count("ns").await.unwrap(), 1);

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_list_and_delete_by_namespace() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("context.db")).await.unwrap();
    let repo = db.context_records();

    repo.upsert(&row("alice", "h1")).await.unwrap();
    repo.upsert(&row("alice", "h2")).await.unwrap();
    repo.upsert(&row("bob", "h1")).await.unwrap();

    let mut elsewhere = row("alice", "h1");
    elsewhere.namespace = "other".to_string();
    repo.upsert(&elsewhere).await.unwrap();

    let alice = repo.list_for_entity("ns", "lead", "alice").await.unwrap();
    assert_eq!(alice.len(), 2);
    assert!(alice.iter().all(|r| r.namespace == "ns"));

    assert_eq!(repo.delete_namespace("ns").await.unwrap(), 3);
    assert_eq!(repo.count("ns").await.unwrap(), 0);
    assert_eq!(repo.count("other").await.unwrap(), 1);

    db.close().await.unwrap();
}

#[tokio::test]
async fn test_rows_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("context.db");

    {
        let db = Database::new(&path).await.unwrap();
        db.context_records().upsert(&row("alice", "h1")).await.unwrap();
        db.close().await.unwrap();
    }

    let db = Database::new(&path).await.unwrap();
    let stored = db
        .context_records()
        .get("ns", "lead", "alice", "get_linkedin_profile", "h1")
        .await
        .unwrap();
    assert_eq!(stored, Some(row("alice", "h1")));
    db.close().await.unwrap();
}
