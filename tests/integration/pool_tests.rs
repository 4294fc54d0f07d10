use crate::common::fetch_job;
use async_trait::async_trait;
use pagescope::cache::{record_result, submit_if_absent, SnapshotCache};
use pagescope::crawler::{Job, JobKind, JobResult, WorkerPool};
use pagescope::ScanError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Job that blocks until the shared gate hands out a permit, then fails
struct GatedJob {
    id: String,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl Job for GatedJob {
    async fn execute(&self) -> JobResult {
        let _permit = self.gate.acquire().await;
        JobResult {
            job_id: self.id.clone(),
            job_kind: self.kind(),
            outcome: Err(pagescope::crawler::JobError {
                id: self.id.clone(),
                kind: self.kind(),
                source: ScanError::PoolClosed,
            }),
            worker_id: 0,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> JobKind {
        JobKind::FetchAndParse
    }

    fn progress(&self) -> f64 {
        0.0
    }
}

fn gated(id: &str, gate: &Arc<Semaphore>) -> Box<dyn Job> {
    Box::new(GatedJob {
        id: id.to_string(),
        gate: Arc::clone(gate),
    })
}

async fn wait_until_busy(pool: &WorkerPool, busy: usize) {
    for _ in 0..100 {
        if pool.status().busy == busy {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pool never reached {busy} busy workers");
}

#[tokio::test]
async fn test_full_queue_blocks_submitter() {
    let gate = Arc::new(Semaphore::new(0));
    let mut pool = WorkerPool::start(1, 1);
    let mut results = pool.take_results().expect("results available");

    // First job occupies the only worker, second fills the queue
    pool.submit(gated("1", &gate)).await.unwrap();
    wait_until_busy(&pool, 1).await;
    pool.submit(gated("2", &gate)).await.unwrap();

    let blocked = tokio::time::timeout(Duration::from_millis(200), pool.submit(gated("3", &gate))).await;
    assert!(blocked.is_err(), "submit should wait while the queue is full");

    gate.add_permits(3);
    tokio::time::timeout(Duration::from_secs(2), pool.submit(gated("3", &gate)))
        .await
        .expect("submit proceeds once a slot frees")
        .unwrap();

    let stats = pool.close().await.to_vec();
    assert_eq!(stats[0].jobs_processed, 3);
    assert_eq!(stats[0].errors_encountered, 3);

    let mut received = 0;
    while let Some(result) = results.recv().await {
        assert_eq!(result.worker_id, 1);
        received += 1;
    }
    // No job was dropped
    assert_eq!(received, 3);
}

#[tokio::test]
async fn test_pool_runs_fetch_jobs_into_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<!DOCTYPE html><html><head><title>Pooled</title></head></html>"),
        )
        .mount(&server)
        .await;

    let cache = SnapshotCache::new(Duration::from_secs(60));
    let mut pool = WorkerPool::start(2, 4);
    let mut results = pool.take_results().expect("results available");

    let mut keys = HashMap::new();
    for id in 1..=4 {
        let url = format!("{}/page{}", server.uri(), id);
        keys.insert(id.to_string(), url.clone());
        pool.submit(Box::new(fetch_job(&id.to_string(), &url)))
            .await
            .unwrap();
    }

    let status = pool.status();
    assert_eq!(status.total, 2);
    assert_eq!(status.busy + status.free, 2);

    let stats = pool.close().await.to_vec();
    assert_eq!(stats.iter().map(|s| s.jobs_processed).sum::<u64>(), 4);
    assert!(stats.iter().all(|s| s.errors_encountered == 0));

    while let Some(result) = results.recv().await {
        let key = &keys[&result.job_id];
        record_result(&cache, key, &result);
    }

    assert_eq!(cache.len(), 4);
    for key in keys.values() {
        let snapshot = cache.get(key).expect("result recorded");
        assert_eq!(snapshot.page.expect("page present").title, "Pooled");
    }

    assert!(matches!(
        pool.submit(Box::new(fetch_job("5", &server.uri()))).await,
        Err(ScanError::PoolClosed)
    ));
}

#[tokio::test]
async fn test_cached_url_is_not_resubmitted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/once"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<!DOCTYPE html><html><head><title>Once</title></head></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = SnapshotCache::new(Duration::from_secs(60));
    let mut pool = WorkerPool::start(2, 4);
    let mut results = pool.take_results().expect("results available");
    let url = format!("{}/once", server.uri());

    let first = submit_if_absent(&pool, &cache, &url, Box::new(fetch_job("1", &url)))
        .await
        .unwrap();
    assert!(first);
    assert!(cache.contains(&url), "pending snapshot stored on admission");

    // While the first run is pending or in progress
    let second = submit_if_absent(&pool, &cache, &url, Box::new(fetch_job("2", &url)))
        .await
        .unwrap();
    assert!(!second);

    let result = results.recv().await.expect("one result");
    assert_eq!(result.job_id, "1");
    record_result(&cache, &url, &result);

    // After the run finished, within the TTL
    let third = submit_if_absent(&pool, &cache, &url, Box::new(fetch_job("3", &url)))
        .await
        .unwrap();
    assert!(!third);

    let stats = pool.close().await.to_vec();
    assert_eq!(stats.iter().map(|s| s.jobs_processed).sum::<u64>(), 1);
    assert!(results.recv().await.is_none());

    let snapshot = cache.get(&url).expect("snapshot cached");
    assert_eq!(snapshot.page.expect("page present").title, "Once");
}

#[tokio::test]
async fn test_rejected_submit_clears_pending_snapshot() {
    let cache = SnapshotCache::new(Duration::from_secs(60));
    let mut pool = WorkerPool::start(1, 1);
    pool.close().await;

    let url = "http://127.0.0.1:9/closed";
    let result = submit_if_absent(&pool, &cache, url, Box::new(fetch_job("1", url))).await;

    assert!(matches!(result, Err(ScanError::PoolClosed)));
    assert!(!cache.contains(&url.to_string()));
}
