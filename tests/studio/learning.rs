use cavstudio::{CustomSearchSet, ModelLayer, SearchSet, ServerImage, SetKind};

use crate::support::{user_images, Fixture};

#[tokio::test(start_paused = true)]
async fn learning_sends_uploaded_sets_and_layer() {
    let fx = Fixture::new();
    let project = fx.project();
    project.add_images(SetKind::Positive, user_images("p", 2), false).await;
    project.set_model_layer(ModelLayer::Googlenet5b).await;

    project.learn_neural_lens().await.unwrap();

    let request = fx.compute.last_request().unwrap();
    assert_eq!(request.positive_images.len(), 2);
    assert_eq!(request.negative_images.len(), 2);
    assert_eq!(request.model_layer, ModelLayer::Googlenet5b);
    assert!(request.search_images.is_none());

    let lens = project.neural_lens().unwrap();
    assert_eq!(lens.cav_id, "cav-1");
    assert_eq!(lens.model_layer, ModelLayer::Googlenet5b);
    assert_eq!(lens.result_images.len(), 2);
    assert!(!project.is_learning());
}

#[tokio::test(start_paused = true)]
async fn custom_search_images_are_sent() {
    let fx = Fixture::new();
    let project = fx.project();
    let mut custom = CustomSearchSet::new();
    custom.images.push(ServerImage::new("s-1", true));
    project.set_search_set(SearchSet::Custom(custom)).await;
    project.add_images(SetKind::Positive, user_images("p", 1), false).await;

    project.learn_neural_lens().await.unwrap();

    let request = fx.compute.last_request().unwrap();
    assert_eq!(request.search_images.unwrap()[0].id, "s-1");
}

#[tokio::test(start_paused = true)]
async fn failure_is_described_and_learning_can_resume() {
    let fx = Fixture::new();
    fx.compute.fail_next_cavs(1);
    let project = fx.project();
    project.add_images(SetKind::Positive, user_images("p", 1), false).await;

    assert!(project.learn_neural_lens().await.is_err());
    assert_eq!(
        project.neural_lens_error().as_deref(),
        Some("Learning failed. injected learning failure (HTTP 500)")
    );
    assert!(!project.is_learning());
    assert!(project.neural_lens().is_none());

    project.learn_neural_lens().await.unwrap();
    assert!(project.neural_lens_error().is_none());
    assert!(project.neural_lens().is_some());
}

#[tokio::test(start_paused = true)]
async fn relearning_pins_a_new_version() {
    let fx = Fixture::new();
    let project = fx.project();
    project.add_images(SetKind::Positive, user_images("p", 1), false).await;
    project.learn_neural_lens().await.unwrap();
    let first = project.snapshot_id();

    project.learn_neural_lens().await.unwrap();

    assert_ne!(project.snapshot_id(), first);
    assert_eq!(project.revision_number(), 1);
    assert_eq!(project.neural_lens().unwrap().snapshot_id, project.snapshot_id());
}
