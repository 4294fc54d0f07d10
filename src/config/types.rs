use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Pagescope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default, rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Number of workers executing jobs
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the bounded job queue
    #[serde(default = "default_queue_capacity", rename = "queue-capacity")]
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// HTTP client timeouts and redirect policy
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Overall timeout for a page fetch (seconds)
    #[serde(default = "default_client_timeout", rename = "client-timeout")]
    pub client_timeout: u64,

    /// TCP connect timeout (seconds)
    #[serde(default = "default_connect_timeout", rename = "connect-timeout")]
    pub connect_timeout: u64,

    /// Maximum number of redirects followed per request
    #[serde(default = "default_max_redirects", rename = "max-redirects")]
    pub max_redirects: usize,

    /// Timeout for a single HEAD/GET link probe (seconds)
    #[serde(default = "default_probe_timeout", rename = "probe-timeout")]
    pub probe_timeout: u64,
}

impl HttpConfig {
    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            client_timeout: default_client_timeout(),
            connect_timeout: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            probe_timeout: default_probe_timeout(),
        }
    }
}

/// Per-domain token bucket parameters
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens refilled per second for each domain
    #[serde(default = "default_requests_per_second", rename = "requests-per-second")]
    pub requests_per_second: u32,

    /// Bucket size for each domain
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Upper bound on link probes in flight within one job
    #[serde(
        default = "default_max_concurrent_probes",
        rename = "max-concurrent-probes"
    )]
    pub max_concurrent_probes: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
            max_concurrent_probes: default_max_concurrent_probes(),
        }
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached scan snapshot (seconds)
    #[serde(default = "default_ttl_seconds", rename = "ttl-seconds")]
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(default = "default_crawler_name", rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(default = "default_crawler_version", rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(default = "default_contact_url", rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(default = "default_contact_email", rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
            contact_email: default_contact_email(),
        }
    }
}

fn default_workers() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    100
}

fn default_client_timeout() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    3
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_requests_per_second() -> u32 {
    2
}

fn default_burst() -> u32 {
    1
}

fn default_max_concurrent_probes() -> usize {
    32
}

fn default_ttl_seconds() -> u64 {
    600
}

fn default_crawler_name() -> String {
    "Pagescope".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://example.com/pagescope".to_string()
}

fn default_contact_email() -> String {
    "pagescope@example.com".to_string()
}
