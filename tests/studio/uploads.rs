use cavstudio::{SetKind, TrainingImage};

use crate::support::{payload, settle, Fixture};

#[tokio::test(start_paused = true)]
async fn files_upload_in_background_and_keep_their_keys() {
    let fx = Fixture::new();
    let project = fx.project();

    let keys = project
        .add_image_files(SetKind::Positive, vec![payload(), payload()])
        .await;
    assert_eq!(keys.len(), 2);
    assert!(!project.can_learn_lens());

    settle().await;

    let positives = project.training_set(SetKind::Positive);
    for key in keys {
        let image = positives.get(key).unwrap();
        assert!(image.is_uploaded());
        assert!(image.user_generated());
    }
    assert_eq!(fx.compute.upload_count(), 2);
    assert!(project.can_learn_lens());
}

#[tokio::test(start_paused = true)]
async fn local_images_are_not_persisted() {
    let fx = Fixture::new();
    fx.compute.fail_next_uploads(1);
    let project = fx.project();
    project
        .add_image_files(SetKind::Positive, vec![payload()])
        .await;
    settle().await;

    let snapshot = project.to_snapshot();
    assert!(snapshot.positive_set.images.is_empty());
    assert_eq!(project.training_set(SetKind::Positive).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_upload_is_recorded_and_can_be_retried() {
    let fx = Fixture::new();
    fx.compute.fail_next_uploads(1);
    let project = fx.project();

    let key = project
        .add_image_files(SetKind::Negative, vec![payload()])
        .await[0];
    settle().await;

    let entry = project.training_set(SetKind::Negative).get(key).cloned().unwrap();
    let pending = entry.pending_upload().unwrap();
    assert!(!pending.is_uploading);
    assert_eq!(
        pending.error_description.as_deref(),
        Some("Image upload failed. injected upload failure (HTTP 500)")
    );

    project.retry_upload(SetKind::Negative, key).await.unwrap();
    let entry = project.training_set(SetKind::Negative).get(key).cloned().unwrap();
    assert!(entry.is_uploaded());
    assert_eq!(entry.server_image().unwrap().id, "upload-1");
}

#[tokio::test(start_paused = true)]
async fn upload_keeps_weight_set_while_uploading() {
    let fx = Fixture::new();
    let project = fx.project();
    let image = TrainingImage::uploading(payload());
    let key = image.key();
    project.add_images(SetKind::Positive, vec![image], false).await;
    project.upweight_image(SetKind::Positive, key).await.unwrap();

    project.upload_image(SetKind::Positive, key).await.unwrap();

    let entry = project.training_set(SetKind::Positive).get(key).cloned().unwrap();
    assert!(entry.is_uploaded());
    assert_eq!(entry.weight, 4);
    // already uploaded: nothing to do
    project.upload_image(SetKind::Positive, key).await.unwrap();
    assert_eq!(fx.compute.upload_count(), 1);
}
