use rsdns_jobs::{CacheMaintenanceJob, JobRunner};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::MockCache;

// ============================================================================
// Tests: CacheMaintenanceJob
// ============================================================================

#[tokio::test]
async fn test_run_once_reports_purged_count() {
    let cache = Arc::new(MockCache::new(4));
    let job = CacheMaintenanceJob::new(cache.clone());

    let purged = job.run_once();

    assert_eq!(purged, 4);
    assert_eq!(cache.purge_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweeps_on_interval_not_at_start() {
    // Arrange
    let cache = Arc::new(MockCache::new(0));
    let job = CacheMaintenanceJob::new(cache.clone()).with_interval(30);

    // Act
    Arc::new(job).start().await;
    sleep(Duration::from_secs(1)).await;

    // Assert
    assert_eq!(cache.purge_count(), 0);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(cache.purge_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_sweeps() {
    let cache = Arc::new(MockCache::new(1));
    let token = CancellationToken::new();
    let job = CacheMaintenanceJob::new(cache.clone())
        .with_interval(10)
        .with_cancellation(token.clone());

    Arc::new(job).start().await;
    sleep(Duration::from_secs(11)).await;
    assert_eq!(cache.purge_count(), 1);

    token.cancel();
    sleep(Duration::from_secs(100)).await;
    assert_eq!(cache.purge_count(), 1);
}

// ============================================================================
// Tests: JobRunner
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_runner_starts_registered_jobs() {
    let cache = Arc::new(MockCache::new(0));

    JobRunner::new()
        .with_cache_maintenance(CacheMaintenanceJob::new(cache.clone()).with_interval(5))
        .start()
        .await;
    sleep(Duration::from_secs(6)).await;

    assert_eq!(cache.purge_count(), 1);
}
