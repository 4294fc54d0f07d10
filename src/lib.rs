//! Pagescope: a single-page link health analyzer
//!
//! This crate fetches one web page, classifies its HTML version, counts its
//! headings, detects login forms, and probes every hyperlink it contains
//! concurrently under per-domain rate limits. Jobs run on a fixed worker pool
//! and their snapshots are kept in a time-bounded cache.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Pagescope operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("fetch error for {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("fetch failed with status: {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("body read error for {url}: {source}")]
    BodyRead { url: String, source: reqwest::Error },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("worker pool is closed")]
    PoolClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Only HTTP/HTTPS links are allowed, got: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Pagescope operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use analysis::{classify, get_html_version, has_login_form, DoctypeNode, HrefType, HyperLink};
pub use cache::{SnapshotCache, TtlCache};
pub use config::Config;
pub use crawler::{FetchJob, Job, JobKind, JobPayload, JobResult, WorkerPool};
pub use state::{DomainRateLimiter, ScanSnapshot};
pub use url::{extract_domain, normalize_url, validate_target_url};
