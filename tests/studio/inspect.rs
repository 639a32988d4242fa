use std::sync::Arc;

use cavstudio::{CavServer, InspectCache, ServerImage, TicketStatus};

use crate::support::Fixture;

#[tokio::test]
async fn repeated_lookups_share_one_fetch() {
    let fx = Fixture::new();
    let compute: Arc<dyn CavServer> = Arc::new(fx.compute.clone());
    let cache = InspectCache::new(compute);
    let image = ServerImage::new("img-1", false);

    let first = cache.get_top_crops(&image, "cav-1");
    let second = cache.get_top_crops(&image, "cav-1");
    assert!(Arc::ptr_eq(&first, &second));

    let status = first.wait().await;
    assert!(matches!(status, TicketStatus::Completed(ref crops) if crops.scores == vec![1.0]));
    assert_eq!(fx.compute.crop_requests(), 1);

    let third = cache.get_top_crops(&image, "cav-1");
    assert!(matches!(third.status(), TicketStatus::Completed(_)));
    assert_eq!(fx.compute.crop_requests(), 1);
}

#[tokio::test]
async fn different_lens_fetches_again() {
    let fx = Fixture::new();
    let cache = InspectCache::new(Arc::new(fx.compute.clone()));
    let image = ServerImage::new("img-1", false);

    cache.get_top_crops(&image, "cav-1").wait().await;
    let other = cache.get_top_crops(&image, "cav-2");
    assert_eq!(other.cache_key(), "crops-img-1-cav-2");
    other.wait().await;

    assert_eq!(fx.compute.crop_requests(), 2);
}
