//! Plain-text scan reports
//!
//! Formatting is kept separate from printing so reports can be checked in
//! tests without capturing stdout.

use crate::crawler::{PageAnalysis, WorkerStats};
use crate::state::ScanSnapshot;
use std::fmt::Write;

/// Formats the report for one target URL
///
/// `with_links` appends one line per probed hyperlink.
pub fn format_snapshot(snapshot: &ScanSnapshot, with_links: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===\n", snapshot.url);

    match (&snapshot.page, &snapshot.error) {
        (Some(page), _) => format_page(&mut out, page, with_links),
        (None, Some(error)) => {
            let _ = writeln!(out, "Scan failed: {}", error);
        }
        (None, None) => {
            let _ = writeln!(out, "Scan in progress: {:.1}%", snapshot.progress);
        }
    }

    out
}

fn format_page(out: &mut String, page: &PageAnalysis, with_links: bool) {
    let counters = &page.link_counters;

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Title: {}", page.title);
    let _ = writeln!(out, "  HTML version: {}", page.html_version);
    let _ = writeln!(
        out,
        "  Login form: {}",
        if page.has_login_form { "yes" } else { "no" }
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Headings:");
    for (tag, count) in &page.headings {
        let _ = writeln!(out, "  {}: {}", tag, count);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Links:");
    let _ = writeln!(out, "  Total: {}", page.hyperlinks.len());
    let _ = writeln!(
        out,
        "  Internal: {} ({} alive)",
        counters.internal, counters.internal_alive
    );
    let _ = writeln!(
        out,
        "  External: {} ({} alive)",
        counters.external, counters.external_alive
    );
    let _ = writeln!(out, "  Protocol: {}", counters.protocol);

    if with_links && !page.hyperlinks.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Link details:");
        for link in &page.hyperlinks {
            let target = link
                .resolved
                .as_ref()
                .map(|url| url.as_str())
                .unwrap_or(&link.raw);
            match &link.error {
                Some(error) => {
                    let _ = writeln!(
                        out,
                        "  [{:>4}] {:<8} {} ({})",
                        link.status_code, link.href_type, target, error
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "  [{:>4}] {:<8} {}",
                        link.status_code, link.href_type, target
                    );
                }
            }
        }
    }
}

/// Formats per-worker statistics followed by totals
pub fn format_worker_stats(stats: &[WorkerStats]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Worker Statistics ===\n");

    for worker in stats {
        let _ = writeln!(
            out,
            "  Worker {}: {} jobs, {} errors",
            worker.worker_id, worker.jobs_processed, worker.errors_encountered
        );
        for (kind, count) in &worker.jobs_by_kind {
            let _ = writeln!(out, "    {}: {}", kind, count);
        }
    }

    let jobs: u64 = stats.iter().map(|w| w.jobs_processed).sum();
    let errors: u64 = stats.iter().map(|w| w.errors_encountered).sum();
    let _ = writeln!(out);
    let _ = writeln!(out, "  Total: {} jobs, {} errors", jobs, errors);

    out
}

/// Prints the report for one target URL to stdout
pub fn print_snapshot(snapshot: &ScanSnapshot, with_links: bool) {
    println!("{}", format_snapshot(snapshot, with_links));
}

/// Prints worker statistics to stdout
pub fn print_worker_stats(stats: &[WorkerStats]) {
    println!("{}", format_worker_stats(stats));
}
