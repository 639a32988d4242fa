use cavstudio::storage::CopySnapshot;
use cavstudio::{
    CustomSearchSet, HttpProjectStorage, ProjectSnapshot, ProjectStorage, ServerImage,
    TransportError,
};
use serde_json::json;

use crate::support::start_backend;

fn snapshot(project_id: &str, snapshot_id: &str, date: i64) -> serde_json::Value {
    json!({
        "projectId": project_id,
        "snapshotId": snapshot_id,
        "positiveSet": {"images": [{"id": "p1", "weight": 4, "enabled": true, "user_generated": true}]},
        "negativeSet": {"images": []},
        "name": "owls",
        "date": date,
    })
}

#[tokio::test]
async fn snapshot_round_trips_through_set_and_get() {
    let backend = start_backend().await;
    let storage = HttpProjectStorage::new(&backend.url);
    let content = ProjectSnapshot::from_value(snapshot("proj", "snap-1", 10)).unwrap();

    storage
        .set_snapshot("proj", "snap-1", &content)
        .await
        .unwrap();

    assert_eq!(backend.snapshot("snap-1").unwrap()["modelLayer"], json!("googlenet_5b"));
    assert_eq!(storage.get_snapshot("snap-1").await.unwrap(), content);
}

#[tokio::test]
async fn missing_snapshot_is_not_found() {
    let backend = start_backend().await;
    let storage = HttpProjectStorage::new(&backend.url);
    let err = storage.get_snapshot("nope").await.unwrap_err();
    assert!(matches!(err, TransportError::NotFound(_)));
}

#[tokio::test]
async fn listing_is_newest_first_and_keeps_deleted() {
    let backend = start_backend().await;
    backend.insert_snapshot(snapshot("proj", "old", 1));
    backend.insert_snapshot(snapshot("proj", "mid", 2));
    backend.insert_snapshot(snapshot("proj", "new", 3));
    backend.insert_snapshot(snapshot("other", "x", 4));
    let storage = HttpProjectStorage::new(&backend.url);

    storage.delete_snapshot("mid").await.unwrap();
    let listed = storage.list_snapshots_for_project("old").await.unwrap();

    let ids: Vec<_> = listed.iter().map(|s| s.snapshot_id.as_str()).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
    assert!(storage.get_snapshot("mid").await.is_ok());
}

#[tokio::test]
async fn malformed_snapshot_is_rejected() {
    let backend = start_backend().await;
    let mut bad = snapshot("proj", "bad", 1);
    bad["positiveSet"]["images"] = json!([{"id": ""}]);
    backend.insert_snapshot(bad);
    let storage = HttpProjectStorage::new(&backend.url);

    let err = storage.get_snapshot("bad").await.unwrap_err();
    assert!(matches!(err, TransportError::Malformed(_)));
}

#[tokio::test]
async fn copy_targets_new_project() {
    let backend = start_backend().await;
    backend.insert_snapshot(snapshot("proj", "snap-1", 1));
    let storage = HttpProjectStorage::new(&backend.url);

    storage
        .copy_snapshot_to_new_project(&CopySnapshot {
            src_snapshot_id: "snap-1".into(),
            dst_project_id: "proj-2".into(),
            dst_snapshot_id: "snap-2".into(),
            dst_name: "owls copy".into(),
        })
        .await
        .unwrap();

    let copy = storage.get_snapshot("snap-2").await.unwrap();
    assert_eq!(copy.project_id, "proj-2");
    assert_eq!(copy.name.as_deref(), Some("owls copy"));
}

#[tokio::test]
async fn projects_summary_decodes() {
    let backend = start_backend().await;
    backend.insert_snapshot(snapshot("proj", "snap-1", 7));
    let storage = HttpProjectStorage::new(&backend.url);

    let summaries = storage.get_user_projects_summary().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, "proj");
    assert_eq!(summaries[0].latest_snapshot.date, 7);
    assert_eq!(summaries[0].latest_snapshot.top_images[0].weight, 4);
}

#[tokio::test]
async fn search_sets_save_list_and_delete() {
    let backend = start_backend().await;
    let storage = HttpProjectStorage::new(&backend.url);
    let mut set = CustomSearchSet::new();
    set.images.push(ServerImage::new("s1", true));

    set.save(&storage).await.unwrap();
    set.rename("birds", &storage).await.unwrap();

    let fetched = storage.get_search_set(&set.search_set_id).await.unwrap();
    assert_eq!(fetched.name, "birds");
    assert_eq!(fetched.image_count, 1);
    assert_eq!(fetched.owner.as_deref(), Some("tester"));

    storage.delete_search_set(&set.search_set_id).await.unwrap();
    assert!(storage.get_search_sets().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let storage = HttpProjectStorage::new("http://127.0.0.1:1");
    let err = storage.get_snapshot("snap").await.unwrap_err();
    assert!(matches!(err, TransportError::Network(_)));
}
