//! Pagescope main entry point
//!
//! This is the command-line interface for the Pagescope page analyzer.

use clap::Parser;
use pagescope::analysis::LinkProber;
use pagescope::cache::{record_result, submit_if_absent, SnapshotCache};
use pagescope::config::{load_config_with_hash, validate, Config};
use pagescope::crawler::{build_http_client, FetchJob, WorkerPool};
use pagescope::output::{print_snapshot, print_worker_stats};
use pagescope::state::DomainRateLimiter;
use pagescope::url::{normalize_url, validate_target_url};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Pagescope: a single-page link health analyzer
///
/// Pagescope fetches each given page, reports its HTML version, title,
/// heading counts and login form presence, and probes every hyperlink on it
/// under per-domain rate limits.
#[derive(Parser, Debug)]
#[command(name = "pagescope")]
#[command(version)]
#[command(about = "A single-page link health analyzer", long_about = None)]
struct Cli {
    /// Pages to analyze
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// List every probed link in the report
    #[arg(long)]
    links: bool,

    /// Validate config and targets without scanning
    #[arg(long)]
    dry_run: bool,
}

/// A target admitted for scanning
struct Target {
    /// Normalized URL string, the result cache key
    key: String,
    url: Url,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            let cfg = Config::default();
            validate(&cfg)?;
            tracing::debug!("No configuration file given, using defaults");
            cfg
        }
    };

    let targets = admit_targets(&cli.urls);
    if targets.is_empty() {
        return Err("no valid target URLs".into());
    }

    if cli.dry_run {
        handle_dry_run(&config, &targets);
        return Ok(());
    }

    handle_scan(config, targets, cli.links).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagescope=info,warn"),
            1 => EnvFilter::new("pagescope=debug,info"),
            2 => EnvFilter::new("pagescope=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Validates and normalizes the command-line URLs
///
/// Rejected URLs are logged and skipped; repeated URLs are scanned once.
fn admit_targets(raw_urls: &[String]) -> Vec<Target> {
    let mut targets: Vec<Target> = Vec::new();

    for raw in raw_urls {
        let admitted = validate_target_url(raw).and_then(|_| normalize_url(raw));
        match admitted {
            Ok(url) => {
                let key = url.to_string();
                if targets.iter().any(|t| t.key == key) {
                    tracing::info!("Skipping duplicate target {}", raw);
                    continue;
                }
                targets.push(Target { key, url });
            }
            Err(e) => tracing::error!("Rejected target {:?}: {}", raw, e),
        }
    }

    targets
}

/// Handles the --dry-run mode: shows the effective settings and targets
fn handle_dry_run(config: &Config, targets: &[Target]) {
    println!("=== Pagescope Dry Run ===\n");

    println!("Worker Pool:");
    println!("  Workers: {}", config.pool.workers);
    println!("  Queue capacity: {}", config.pool.queue_capacity);

    println!("\nHTTP:");
    println!("  Client timeout: {}s", config.http.client_timeout);
    println!("  Connect timeout: {}s", config.http.connect_timeout);
    println!("  Max redirects: {}", config.http.max_redirects);
    println!("  Probe timeout: {}s", config.http.probe_timeout);

    println!("\nRate Limit:");
    println!(
        "  {} requests/s per domain, burst {}",
        config.rate_limit.requests_per_second, config.rate_limit.burst
    );
    println!(
        "  Max concurrent probes: {}",
        config.rate_limit.max_concurrent_probes
    );

    println!("\nCache TTL: {}s", config.cache.ttl_seconds);
    println!("User-Agent: {}", config.user_agent.header_value());

    println!("\nTargets ({}):", targets.len());
    for target in targets {
        println!("  - {}", target.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main scan operation
async fn handle_scan(
    config: Config,
    targets: Vec<Target>,
    with_links: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_http_client(&config.http, &config.user_agent)?;
    let limiter = Arc::new(DomainRateLimiter::from_config(&config.rate_limit));
    let prober = LinkProber::new(
        client.clone(),
        config.user_agent.header_value(),
        limiter,
        config.http.probe_timeout(),
    );

    let cache = SnapshotCache::new(config.cache.ttl());
    let sweeper = cache.spawn_sweeper();

    let mut pool = WorkerPool::from_config(&config.pool);
    let mut results = pool.take_results().ok_or("result stream already taken")?;

    let job_keys: HashMap<String, String> = targets
        .iter()
        .enumerate()
        .map(|(index, target)| ((index + 1).to_string(), target.key.clone()))
        .collect();

    let collector = {
        let cache = cache.clone();
        tokio::spawn(async move {
            while let Some(result) = results.recv().await {
                match job_keys.get(&result.job_id) {
                    Some(key) => record_result(&cache, key, &result),
                    None => tracing::warn!("Result for unknown job {}", result.job_id),
                }
            }
        })
    };

    let ticker = {
        let handle = pool.status_handle();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                let status = handle.status();
                tracing::info!(
                    "Pool status: {} total, {} busy, {} free",
                    status.total,
                    status.busy,
                    status.free
                );
            }
        })
    };

    let mut submitted = 0;
    for (index, target) in targets.iter().enumerate() {
        let job = FetchJob::new(
            (index + 1).to_string(),
            target.url.clone(),
            client.clone(),
            prober.clone(),
        )
        .with_max_concurrent_probes(config.rate_limit.max_concurrent_probes)
        .with_cache(cache.clone(), target.key.clone());

        if submit_if_absent(&pool, &cache, &target.key, Box::new(job)).await? {
            submitted += 1;
        }
    }
    tracing::info!("Submitted {} of {} targets", submitted, targets.len());

    pool.close().await;
    ticker.abort();
    if let Err(e) = collector.await {
        tracing::error!("Result collector did not complete: {}", e);
    }

    for target in &targets {
        match cache.get(&target.key) {
            Some(snapshot) => print_snapshot(&snapshot, with_links),
            None => tracing::warn!("No snapshot for {}", target.key),
        }
    }
    print_worker_stats(pool.worker_stats());

    sweeper.abort();
    Ok(())
}
