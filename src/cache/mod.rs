//! Time-bounded result cache
//!
//! Scan snapshots are stored under the normalized target URL so repeated
//! requests for a URL already being analyzed, or analyzed recently, are
//! answered without submitting another job.

mod ttl;

pub use ttl::TtlCache;

use crate::crawler::{Job, JobResult, WorkerPool};
use crate::state::ScanSnapshot;

/// Cache of scan snapshots keyed by normalized target URL
pub type SnapshotCache = TtlCache<String, ScanSnapshot>;

/// Writes the final snapshot for a finished job under `url`
pub fn record_result(cache: &SnapshotCache, url: &str, result: &JobResult) {
    let snapshot = ScanSnapshot::from_result(url, result);
    if let Some(error) = &snapshot.error {
        tracing::debug!("Recording failed scan for {}: {}", url, error);
    }
    cache.set(url.to_string(), snapshot);
}

/// Submits `job` unless `url` already has a live snapshot
///
/// On admission a pending snapshot is stored before the job is queued, so a
/// concurrent or later request for the same URL within the TTL is answered
/// from the cache. Returns `false` when the request was short-circuited.
///
/// # Errors
///
/// Whatever [`WorkerPool::submit`] returns. The pending snapshot is removed
/// again so a later request can retry.
pub async fn submit_if_absent(
    pool: &WorkerPool,
    cache: &SnapshotCache,
    url: &str,
    job: Box<dyn Job>,
) -> crate::Result<bool> {
    if !cache.insert_if_absent(url.to_string(), ScanSnapshot::pending(url)) {
        tracing::info!("{} already scanned or in progress, using cached snapshot", url);
        return Ok(false);
    }

    if let Err(e) = pool.submit(job).await {
        cache.remove(&url.to_string());
        return Err(e);
    }
    Ok(true)
}
