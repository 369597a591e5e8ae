//! Integration tests for the context store backends
//!
//! The same contract checks run against SQLite and the in-memory store.

use scout_engine::conductor::{CompanyKey, LeadId};
use scout_engine::store::{
    ContextStore, EntityRef, MemoryContextStore, RecordKey, SqliteContextStore,
};
use sdk::types::{ConnectorOutput, FailureKind};
use serde_json::json;
use tempfile::TempDir;

fn alice() -> EntityRef {
    EntityRef::Lead(LeadId::new("alice"))
}

fn techcorp() -> EntityRef {
    EntityRef::Company(CompanyKey::from_name("TechCorp").unwrap())
}

async fn check_contract(store: &dyn ContextStore) {
    // Argument order and whitespace do not change the address
    let first = store
        .put(
            &alice(),
            "get_linkedin_activity",
            &json!({"linkedin_url": "https://linkedin.com/in/alice", "limit": 10}),
            &ConnectorOutput::ok(json!({"posts": [{"text": "old"}]})),
        )
        .await
        .unwrap();
    let second = store
        .put(
            &alice(),
            "get_linkedin_activity",
            &json!({"limit": 10, "linkedin_url": " https://linkedin.com/in/alice "}),
            &ConnectorOutput::ok(json!({"posts": [{"text": "new"}]})),
        )
        .await
        .unwrap();
    assert_eq!(first, second);

    let record = store.get(&first).await.unwrap().unwrap();
    assert_eq!(
        record.outcome.payload().unwrap()["posts"][0]["text"],
        "new"
    );
    assert_eq!(store.records_for(&alice()).await.unwrap().len(), 1);

    // Different arguments are a different record
    store
        .put(
            &alice(),
            "get_linkedin_activity",
            &json!({"linkedin_url": "https://linkedin.com/in/alice", "limit": 3}),
            &ConnectorOutput::ok(json!({"posts": []})),
        )
        .await
        .unwrap();
    assert_eq!(store.records_for(&alice()).await.unwrap().len(), 2);

    // Failures round-trip with their kind
    let failed = store
        .put(
            &alice(),
            "get_linkedin_profile",
            &json!({"linkedin_url": "https://linkedin.com/in/alice"}),
            &ConnectorOutput::fail(FailureKind::RateLimited, "429 from upstream"),
        )
        .await
        .unwrap();
    let record = store.get(&failed).await.unwrap().unwrap();
    let failure = record.outcome.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::RateLimited);
    assert_eq!(failure.reason, "429 from upstream");

    store
        .put(
            &techcorp(),
            "get_company_news",
            &json!({"company_name": "TechCorp"}),
            &ConnectorOutput::ok(json!({"articles": []})),
        )
        .await
        .unwrap();

    // Aggregation merges lead and company records
    let company = CompanyKey::from_name("TechCorp Inc").unwrap();
    let ctx = store
        .aggregate(&LeadId::new("alice"), Some(&company))
        .await
        .unwrap();
    assert!(ctx.contains("get_linkedin_activity"));
    assert!(ctx.contains("get_company_news"));
    assert!(ctx.failure("get_linkedin_profile").is_some());
    assert_eq!(ctx.len(), 3);

    // A lead nobody researched aggregates to nothing, not an error
    let empty = store.aggregate(&LeadId::new("nobody"), None).await.unwrap();
    assert!(empty.is_empty());

    let missing = RecordKey::derive(&alice(), "get_company_posts", &json!({}));
    assert!(store.get(&missing).await.unwrap().is_none());

    assert_eq!(store.purge_namespace().await.unwrap(), 4);
    assert!(store.records_for(&alice()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_store_contract() {
    let store = MemoryContextStore::new("contract");
    check_contract(&store).await;
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    let dir = TempDir::new().unwrap();
    let store = SqliteContextStore::open(&dir.path().join("context.db"), "contract")
        .await
        .unwrap();
    check_contract(&store).await;
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_sqlite_records_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("context.db");

    let key = {
        let store = SqliteContextStore::open(&path, "durable").await.unwrap();
        let key = store
            .put(
                &techcorp(),
                "get_linkedin_company",
                &json!({"company_name": "TechCorp"}),
                &ConnectorOutput::ok(json!({"industry": "Software"})),
            )
            .await
            .unwrap();
        store.close().await.unwrap();
        key
    };

    let store = SqliteContextStore::open(&path, "durable").await.unwrap();
    let record = store.get(&key).await.unwrap().unwrap();
    assert_eq!(record.outcome.payload().unwrap()["industry"], "Software");
    assert_eq!(record.args, json!({"company_name": "TechCorp"}));
}

#[tokio::test]
async fn test_purge_leaves_other_namespaces() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("context.db");
    let a = SqliteContextStore::open(&path, "a").await.unwrap();
    let b = SqliteContextStore::open(&path, "b").await.unwrap();

    for store in [&a, &b] {
        store
            .put(
                &alice(),
                "get_linkedin_profile",
                &json!({"linkedin_url": "https://linkedin.com/in/alice"}),
                &ConnectorOutput::ok(json!({})),
            )
            .await
            .unwrap();
    }

    assert_eq!(a.purge_namespace().await.unwrap(), 1);
    assert_eq!(a.count().await.unwrap(), 0);
    assert_eq!(b.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_writers() {
    let store = std::sync::Arc::new(MemoryContextStore::new("concurrent"));
    let writes = (0..20).map(|i| {
        let store = std::sync::Arc::clone(&store);
        tokio::spawn(async move {
            store
                .put(
                    &techcorp(),
                    "get_company_news",
                    &json!({"company_name": "TechCorp", "limit": i % 4}),
                    &ConnectorOutput::ok(json!({"n": i})),
                )
                .await
        })
    });

    for handle in futures::future::join_all(writes).await {
        handle.unwrap().unwrap();
    }
    assert_eq!(store.len().await, 4);
}
