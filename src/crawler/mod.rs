//! Job execution: page fetching, parsing and the worker pool
//!
//! This module contains the scanning pipeline, including:
//! - HTTP client construction and the page fetch
//! - HTML structure extraction
//! - The job abstraction and the fetch-and-parse job
//! - The worker pool running jobs over a bounded queue

mod fetch_job;
mod fetcher;
mod job;
mod parser;
mod pool;

pub use fetch_job::{
    FetchJob, LinkCounters, PageAnalysis, DEFAULT_MAX_CONCURRENT_PROBES, MAX_CONCURRENT_PROBES,
};
pub use fetcher::{build_http_client, fetch_page, FetchedPage};
pub use job::{Job, JobError, JobKind, JobPayload, JobResult};
pub use parser::{parse_html, ParsedPage, HEADING_TAGS};
pub use pool::{PoolStatus, StatusHandle, WorkerPool, WorkerStats, MAX_QUEUE_CAPACITY};
