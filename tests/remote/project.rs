use cavstudio::{Project, Services, SetKind, SyncConfig, TrainingImage, UploadPayload};

use crate::support::start_backend;

#[tokio::test]
async fn project_uploads_learns_and_saves_over_http() {
    let backend = start_backend().await;
    let config = SyncConfig::default().with_server_url(&backend.url);
    let services = Services::http(&config);
    let project = Project::new(services.clone(), &config);

    let image = TrainingImage::uploading(UploadPayload {
        thumbnail_png: vec![1],
        full_jpeg: vec![2],
    });
    let key = image.key();
    project.add_images(SetKind::Positive, vec![image], false).await;
    project.upload_image(SetKind::Positive, key).await.unwrap();
    assert_eq!(project.training_set(SetKind::Negative).enabled_count(), 1);

    project.learn_neural_lens().await.unwrap();
    project.set_name(Some("remote owls".into()));
    project.flush().await;
    assert!(project.save_error().is_none());

    let stored = backend.snapshot(&project.snapshot_id()).unwrap();
    assert_eq!(stored["name"], "remote owls");
    assert_eq!(stored["neuralLens"]["cavID"], "cav-remote");
    assert_eq!(stored["positiveSet"]["images"][0]["id"], "up-1");

    let reloaded = Project::load(services, &config, &project.snapshot_id())
        .await
        .unwrap();
    assert_eq!(reloaded.name().as_deref(), Some("remote owls"));
    assert_eq!(reloaded.neural_lens().unwrap().cav_id, "cav-remote");
}
