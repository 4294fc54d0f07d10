//! Scan snapshot definitions for tracking job progress
//!
//! A snapshot is what the result cache stores for a target URL: the progress
//! of the job analyzing it and, once finished, its page analysis or error.

use crate::crawler::{JobPayload, JobResult, PageAnalysis};

/// Progress value of a finished scan
pub const PROGRESS_DONE: f64 = 100.0;

/// Current state of one URL's scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSnapshot {
    /// Target URL the scan was requested for
    pub url: String,

    /// Percentage of links settled, 0.0 to 100.0
    pub progress: f64,

    /// Analysis result, present once the scan succeeded
    pub page: Option<PageAnalysis>,

    /// Error text, present once the scan failed
    pub error: Option<String>,
}

impl ScanSnapshot {
    /// A scan that was accepted but has not started
    pub fn pending(url: impl Into<String>) -> Self {
        Self::in_progress(url, 0.0)
    }

    /// A running scan; `progress` is clamped to 0..=100
    pub fn in_progress(url: impl Into<String>, progress: f64) -> Self {
        Self {
            url: url.into(),
            progress: progress.clamp(0.0, PROGRESS_DONE),
            page: None,
            error: None,
        }
    }

    /// A successful scan
    pub fn completed(page: PageAnalysis) -> Self {
        Self {
            url: page.url.clone(),
            progress: PROGRESS_DONE,
            page: Some(page),
            error: None,
        }
    }

    /// A scan aborted by a job-fatal error
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            progress: PROGRESS_DONE,
            page: None,
            error: Some(error.into()),
        }
    }

    /// Returns true once the scan produced a result or an error
    pub fn is_finished(&self) -> bool {
        self.page.is_some() || self.error.is_some()
    }

    /// Builds the final snapshot for a job result
    ///
    /// `url` names the target for failed jobs, whose result carries no page.
    pub fn from_result(url: &str, result: &JobResult) -> Self {
        match &result.outcome {
            Ok(JobPayload::PageAnalysis(page)) => Self::completed(page.clone()),
            Err(error) => Self::failed(url, error.to_string()),
        }
    }
}
