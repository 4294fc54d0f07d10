//! Shared scan state: per-domain rate limiting and per-URL scan snapshots

mod domain_state;
mod page_state;

pub use domain_state::{DomainLimiter, DomainRateLimiter};
pub use page_state::{ScanSnapshot, PROGRESS_DONE};
