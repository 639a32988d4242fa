use cavstudio::{ProjectStorage, SetKind};

use crate::support::{user_images, Fixture};

#[tokio::test(start_paused = true)]
async fn flushed_project_reloads_with_same_content() {
    let fx = Fixture::new();
    let project = fx.project();
    project.set_name(Some("owls".into()));
    project.add_images(SetKind::Positive, user_images("p", 3), false).await;
    project.flush().await;

    let reloaded = fx.reload(&project.snapshot_id()).await;

    assert_eq!(reloaded.project_id(), project.project_id());
    assert_eq!(reloaded.name().as_deref(), Some("owls"));
    assert_eq!(reloaded.training_set(SetKind::Positive).len(), 3);
    assert_eq!(reloaded.training_set(SetKind::Negative).enabled_count(), 3);
    assert_eq!(reloaded.snapshots().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn copy_creates_independent_project() {
    let fx = Fixture::new();
    let project = fx.project();
    project.add_images(SetKind::Positive, user_images("p", 1), false).await;

    let copy_id = project.copy_to_new_project("owls copy").await.unwrap();
    let copy = fx.reload(&copy_id).await;

    assert_ne!(copy.project_id(), project.project_id());
    assert_eq!(copy.name().as_deref(), Some("owls copy"));
    assert_eq!(copy.training_set(SetKind::Positive).len(), 1);
    assert_eq!(fx.storage.snapshot_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn deleted_version_leaves_local_list() {
    let fx = Fixture::new();
    let project = fx.project();
    project.add_images(SetKind::Positive, user_images("p", 1), false).await;
    project.learn_neural_lens().await.unwrap();
    let pinned = project.snapshot_id();
    project.add_images(SetKind::Positive, user_images("q", 1), false).await;
    project.flush().await;
    assert_eq!(project.snapshots().len(), 2);

    project.delete_snapshot(&pinned).await.unwrap();

    assert_eq!(project.snapshots().len(), 1);
    assert!(fx.storage.is_snapshot_deleted(&pinned));
    assert!(fx.storage.get_snapshot(&pinned).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn deleted_version_can_still_be_opened_by_id() {
    let fx = Fixture::new();
    let project = fx.project();
    project.set_name(Some("gone".into()));
    project.flush().await;
    let snapshot_id = project.snapshot_id();

    fx.storage.delete_snapshot(&snapshot_id).await.unwrap();
    let listed = fx
        .storage
        .list_snapshots_for_project(&snapshot_id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let reopened = fx.reload(&snapshot_id).await;
    assert_eq!(reopened.snapshot_id(), snapshot_id);
    assert_eq!(reopened.name().as_deref(), Some("gone"));
}

#[tokio::test(start_paused = true)]
async fn loading_unknown_snapshot_fails() {
    let fx = Fixture::new();
    let result = cavstudio::Project::load(fx.services.clone(), &fx.config, "missing").await;
    assert!(result.is_err());
}
