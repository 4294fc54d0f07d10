//! Fetch-and-parse job
//!
//! Fetches one page, extracts its structure, then probes every anchor href
//! concurrently. Link probes run as tasks in a [`JoinSet`]; a semaphore
//! bounds how many requests are in flight once the rate limiter admits them.
//! The job returns only after every probe has settled.

use super::fetcher::fetch_page;
use super::job::{Job, JobError, JobKind, JobPayload, JobResult};
use super::parser::parse_html;
use crate::analysis::{
    classify, get_html_version, DoctypeNode, HrefType, HyperLink, LinkError, LinkProber,
    STATUS_NO_RESPONSE,
};
use crate::cache::SnapshotCache;
use crate::state::{ScanSnapshot, PROGRESS_DONE};
use crate::ScanError;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

/// Default upper bound on probes in flight within one job
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 32;

/// Largest accepted bound on probes in flight within one job
pub const MAX_CONCURRENT_PROBES: usize = 1024;

/// Link totals per locality; `*_alive` counts links that answered 200
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCounters {
    pub internal: u64,
    pub internal_alive: u64,
    pub external: u64,
    pub external_alive: u64,
    pub protocol: u64,
}

/// Result payload of a fetch-and-parse job
#[derive(Debug, Clone, PartialEq)]
pub struct PageAnalysis {
    /// Target URL as submitted
    pub url: String,
    pub title: String,

    /// Classification from the DOCTYPE, "Unknown" when it could not be determined
    pub html_version: String,

    /// Count per heading tag h1..h6
    pub headings: BTreeMap<String, usize>,

    /// One entry per anchor href, in probe completion order
    pub hyperlinks: Vec<HyperLink>,
    pub has_login_form: bool,
    pub link_counters: LinkCounters,
}

/// Counters shared by the link tasks of one job
#[derive(Debug, Default)]
struct AtomicLinkCounters {
    internal: AtomicU64,
    internal_alive: AtomicU64,
    external: AtomicU64,
    external_alive: AtomicU64,
    protocol: AtomicU64,
}

impl AtomicLinkCounters {
    fn record(&self, link: &HyperLink) {
        let (total, alive) = match link.href_type {
            HrefType::Internal => (&self.internal, Some(&self.internal_alive)),
            HrefType::External => (&self.external, Some(&self.external_alive)),
            HrefType::Protocol => (&self.protocol, None),
        };

        total.fetch_add(1, Ordering::Relaxed);
        if let Some(alive) = alive {
            if link.is_alive() {
                alive.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn snapshot(&self) -> LinkCounters {
        LinkCounters {
            internal: self.internal.load(Ordering::Relaxed),
            internal_alive: self.internal_alive.load(Ordering::Relaxed),
            external: self.external.load(Ordering::Relaxed),
            external_alive: self.external_alive.load(Ordering::Relaxed),
            protocol: self.protocol.load(Ordering::Relaxed),
        }
    }
}

/// Analyzes a single page and the links on it
#[derive(Debug)]
pub struct FetchJob {
    id: String,
    url: Url,
    client: Client,
    prober: LinkProber,
    max_concurrent_probes: usize,

    /// f64 bits of the completion percentage
    progress: Arc<AtomicU64>,

    /// Snapshot sink for progress updates, keyed by `cache_key`
    cache: Option<(SnapshotCache, String)>,
}

impl FetchJob {
    /// Creates a job for `url`
    ///
    /// `client` fetches the page; `prober` probes its links and carries the
    /// shared per-domain rate limiter.
    pub fn new(id: impl Into<String>, url: Url, client: Client, prober: LinkProber) -> Self {
        Self {
            id: id.into(),
            url,
            client,
            prober,
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
            progress: Arc::new(AtomicU64::new(0f64.to_bits())),
            cache: None,
        }
    }

    /// Bounds probes in flight; clamped to `1..=MAX_CONCURRENT_PROBES`
    pub fn with_max_concurrent_probes(mut self, max: usize) -> Self {
        self.max_concurrent_probes = max.clamp(1, MAX_CONCURRENT_PROBES);
        self
    }

    /// Publishes progress snapshots into `cache` under `key`
    pub fn with_cache(mut self, cache: SnapshotCache, key: impl Into<String>) -> Self {
        self.cache = Some((cache, key.into()));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn set_progress(&self, progress: f64) {
        self.progress.store(progress.to_bits(), Ordering::Relaxed);
    }

    fn publish(&self, snapshot: ScanSnapshot) {
        if let Some((cache, key)) = &self.cache {
            cache.set(key.clone(), snapshot);
        }
    }

    fn failure(&self, source: ScanError) -> JobResult {
        tracing::warn!("{} {} failed for {}: {}", self.kind(), self.id, self.url, source);
        let error = JobError {
            id: self.id.clone(),
            kind: self.kind(),
            source,
        };
        self.set_progress(PROGRESS_DONE);
        self.publish(ScanSnapshot::failed(self.url.as_str(), error.to_string()));

        JobResult {
            job_id: self.id.clone(),
            job_kind: self.kind(),
            outcome: Err(error),
            worker_id: 0,
        }
    }

    /// Probes every href concurrently and collects the settled links
    ///
    /// Progress is written only from this joining loop, so successive
    /// snapshots never go backwards.
    async fn probe_links(&self, hrefs: Vec<String>, base: Url) -> (Vec<HyperLink>, LinkCounters) {
        let total = hrefs.len();
        let counters = Arc::new(AtomicLinkCounters::default());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_probes));
        let base = Arc::new(base);
        let mut tasks = JoinSet::new();

        for href in hrefs {
            let prober = self.prober.clone();
            let counters = Arc::clone(&counters);
            let semaphore = Arc::clone(&semaphore);
            let base = Arc::clone(&base);

            tasks.spawn(async move {
                let check = {
                    let href = href.clone();
                    tokio::spawn(async move {
                        prober
                            .analyze_bounded(&href, Some(base.as_ref()), Some(semaphore.as_ref()))
                            .await
                    })
                };
                let link = settle_link(href, check).await;
                counters.record(&link);
                link
            });
        }

        let mut links = Vec::with_capacity(total);
        let mut settled = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(link) => links.push(link),
                // settle_link absorbs panics of the check itself
                Err(e) => tracing::error!("Link task for {} did not complete: {}", self.url, e),
            }

            settled += 1;
            let progress = settled as f64 / total as f64 * PROGRESS_DONE;
            self.set_progress(progress);
            self.publish(ScanSnapshot::in_progress(self.url.as_str(), progress));
        }

        (links, counters.snapshot())
    }
}

/// Waits for a spawned link check; a check that panicked or was cancelled
/// still yields a link with no response
async fn settle_link(href: String, check: JoinHandle<HyperLink>) -> HyperLink {
    match check.await {
        Ok(link) => link,
        Err(e) => {
            tracing::error!("Link check for {:?} did not complete: {}", href, e);
            HyperLink {
                href_type: classify(&href),
                raw: href,
                resolved: None,
                status_code: STATUS_NO_RESPONSE,
                error: Some(LinkError::Incomplete(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl Job for FetchJob {
    async fn execute(&self) -> JobResult {
        tracing::info!("Executing {} {}: Fetching {}", self.kind(), self.id, self.url);
        self.publish(ScanSnapshot::pending(self.url.as_str()));

        let page = match fetch_page(&self.client, &self.url).await {
            Ok(page) => page,
            Err(e) => return self.failure(e),
        };

        let html_version = get_html_version(&page.body).unwrap_or_else(|e| {
            tracing::debug!("Could not determine HTML version for {}: {}", self.url, e);
            DoctypeNode::unknown()
        });

        // The parsed document is not Send; only owned data leaves parse_html
        let parsed = parse_html(&page.body);
        tracing::debug!(
            "Parsed {}: {} links, login form: {}",
            self.url,
            parsed.hrefs.len(),
            parsed.has_login_form
        );

        let (hyperlinks, link_counters) = self.probe_links(parsed.hrefs, page.final_url).await;

        let analysis = PageAnalysis {
            url: self.url.to_string(),
            title: parsed.title,
            html_version: html_version.name,
            headings: parsed.headings,
            hyperlinks,
            has_login_form: parsed.has_login_form,
            link_counters,
        };

        self.set_progress(PROGRESS_DONE);
        self.publish(ScanSnapshot::completed(analysis.clone()));
        tracing::info!(
            "Finished {} {}: {} links probed",
            self.kind(),
            self.id,
            analysis.hyperlinks.len()
        );

        JobResult {
            job_id: self.id.clone(),
            job_kind: self.kind(),
            outcome: Ok(JobPayload::PageAnalysis(analysis)),
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
        f64::from_bits(self.progress.load(Ordering::Relaxed))
    }
}
