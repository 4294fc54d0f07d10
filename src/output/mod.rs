//! Output module for rendering scan results
//!
//! Reports are plain text: one block per scanned URL plus a summary of the
//! worker pool.

mod report;

pub use report::{format_snapshot, format_worker_stats, print_snapshot, print_worker_stats};
