//! Scenario: snapshot store round-trip and lifecycle.
//!
//! GREEN when:
//! - a snapshot written and re-read is structurally equal to what was put;
//! - the file layout is `<dir>/models_<id>.json` in the persisted wire shape;
//! - a failure snapshot is refused and the previous good snapshot survives;
//! - delete / source_ids behave on an empty, missing, or populated directory;
//! - concurrent writers to one key all succeed and leave one readable file.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mw_schemas::{CreatedAt, FetchFailure, FetchSuccess, Resource, Snapshot};
use mw_snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore, StoreError};

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn success(id: &str, resources: Vec<Resource>) -> Snapshot {
    Snapshot::from_success(&FetchSuccess {
        source_id: id.to_string(),
        resources,
        observed_at: at(1_700_000_000),
    })
}

fn catalog() -> Vec<Resource> {
    vec![
        Resource::new("gpt-4", "gpt-4")
            .with_created_at(CreatedAt::Epoch(1))
            .with_owner("openai"),
        Resource::new("claude-x", "Claude X")
            .with_created_at(CreatedAt::Text("2024-10-22T00:00:00Z".to_string())),
    ]
}

#[tokio::test]
async fn file_store_round_trip_is_structurally_equal() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path().join("snapshots"));

    assert_eq!(store.get("openai").await.unwrap(), None);

    let snap = success("openai", catalog());
    store.put("openai", &snap).await.unwrap();

    let back = store.get("openai").await.unwrap().expect("persisted");
    assert_eq!(back, snap);
}

#[tokio::test]
async fn file_layout_uses_models_prefix_and_wire_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    store.put("openai", &success("openai", catalog())).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("models_openai.json")).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["success"], true);
    assert_eq!(v["provider"], "openai");
    assert_eq!(v["count"], 2);
    assert_eq!(v["models"][0]["id"], "gpt-4");
    assert!(v.get("error").is_none());

    // no temp file left behind
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["models_openai.json".to_string()]);
}

#[tokio::test]
async fn failure_snapshot_is_refused_and_prior_survives() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    let good = success("openai", catalog());
    store.put("openai", &good).await.unwrap();

    let failed = Snapshot::from_failure(&FetchFailure {
        source_id: "openai".to_string(),
        message: "HTTP 401: Unauthorized".to_string(),
        observed_at: at(1_700_000_100),
    });
    let err = store.put("openai", &failed).await.unwrap_err();
    assert!(matches!(err, StoreError::FailureSnapshot(_)));

    assert_eq!(store.get("openai").await.unwrap(), Some(good));
}

#[tokio::test]
async fn put_overwrites_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    store.put("groq", &success("groq", catalog())).await.unwrap();

    let newer = success("groq", vec![Resource::new("llama", "llama")]);
    store.put("groq", &newer).await.unwrap();

    let back = store.get("groq").await.unwrap().unwrap();
    assert_eq!(back.count, 1);
    assert_eq!(back, newer);
}

#[tokio::test]
async fn delete_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path().join("not-yet-created"));

    // missing directory is an empty store, not an error
    assert!(store.source_ids().await.unwrap().is_empty());
    assert!(!store.delete("openai").await.unwrap());

    store.put("openai", &success("openai", catalog())).await.unwrap();
    store.put("anthropic", &success("anthropic", catalog())).await.unwrap();
    std::fs::write(store.dir().join("unrelated.txt"), "x").unwrap();

    assert_eq!(
        store.source_ids().await.unwrap(),
        vec!["anthropic".to_string(), "openai".to_string()]
    );

    assert!(store.delete("openai").await.unwrap());
    assert!(!store.delete("openai").await.unwrap());
    assert_eq!(store.get("openai").await.unwrap(), None);
    assert_eq!(store.source_ids().await.unwrap(), vec!["anthropic".to_string()]);
}

#[tokio::test]
async fn corrupt_file_is_reported_not_treated_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    std::fs::write(dir.path().join("models_openai.json"), "{not json").unwrap();

    let err = store.get("openai").await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == "models_openai"));
}

#[tokio::test]
async fn memory_store_matches_file_semantics() {
    let store = MemorySnapshotStore::new();
    let snap = success("openai", catalog());

    assert_eq!(store.get("openai").await.unwrap(), None);
    store.put("openai", &snap).await.unwrap();
    assert_eq!(store.get("openai").await.unwrap(), Some(snap));
    assert_eq!(store.write_count(), 1);

    let failed = Snapshot::from_failure(&FetchFailure {
        source_id: "openai".to_string(),
        message: "boom".to_string(),
        observed_at: at(0),
    });
    assert!(store.put("openai", &failed).await.is_err());
    assert_eq!(store.write_count(), 1, "refused puts are not counted");

    assert_eq!(store.source_ids().await.unwrap(), vec!["openai".to_string()]);
    assert!(store.delete("openai").await.unwrap());
    assert!(store.source_ids().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_puts_to_one_key_last_writer_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSnapshotStore::new(dir.path().join("snapshots")));

    let mut handles = Vec::new();
    for n in 1..=16usize {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let ids: Vec<Resource> = (0..n)
                .map(|i| Resource::new(format!("m-{i}"), format!("m-{i}")))
                .collect();
            store.put("openai", &success("openai", ids)).await
        }));
    }
    for h in handles {
        h.await.unwrap().expect("concurrent put must not fail");
    }

    let got = store.get("openai").await.unwrap().unwrap();
    assert!((1..=16).contains(&got.count));
    assert_eq!(got.resources.len(), got.count);
    assert_eq!(store.source_ids().await.unwrap(), vec!["openai".to_string()]);

    // no tmp files left behind
    let leftovers: Vec<String> = std::fs::read_dir(dir.path().join("snapshots"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "leftover tmp files: {leftovers:?}");
}
