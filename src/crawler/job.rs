//! Job abstraction executed by the worker pool
//!
//! A job is anything that can run to completion on a worker and report a
//! [`JobResult`]. Failures are data: a job never panics or aborts its worker
//! to signal an error, it returns `Err(JobError)` in the result outcome.

use super::fetch_job::PageAnalysis;
use crate::ScanError;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Kinds of job the pool can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobKind {
    /// Fetch one page and analyze its structure and links
    FetchAndParse,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchAndParse => "FetchJob",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a successful job, one variant per job kind
#[derive(Debug, Clone, PartialEq)]
pub enum JobPayload {
    PageAnalysis(PageAnalysis),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::PageAnalysis(_) => JobKind::FetchAndParse,
        }
    }
}

/// Job-fatal failure tagged with the job that produced it
#[derive(Debug, Error)]
#[error("{kind} {id} failed: {source}")]
pub struct JobError {
    pub id: String,
    pub kind: JobKind,
    #[source]
    pub source: ScanError,
}

/// Outcome of one job execution
#[derive(Debug)]
pub struct JobResult {
    pub job_id: String,
    pub job_kind: JobKind,
    pub outcome: Result<JobPayload, JobError>,

    /// Worker that ran the job; set by the pool
    pub worker_id: usize,
}

impl JobResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The page analysis, if this was a successful fetch-and-parse job
    pub fn page(&self) -> Option<&PageAnalysis> {
        match &self.outcome {
            Ok(JobPayload::PageAnalysis(page)) => Some(page),
            Err(_) => None,
        }
    }
}

/// A unit of work for the worker pool
#[async_trait]
pub trait Job: Send + Sync {
    /// Runs the job to completion
    ///
    /// `worker_id` in the returned result is overwritten by the pool.
    async fn execute(&self) -> JobResult;

    fn id(&self) -> &str;

    fn kind(&self) -> JobKind;

    /// Completion percentage, 0.0 to 100.0
    fn progress(&self) -> f64;
}
