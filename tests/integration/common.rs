use pagescope::analysis::LinkProber;
use pagescope::config::{HttpConfig, UserAgentConfig};
use pagescope::crawler::{build_http_client, FetchJob};
use pagescope::state::DomainRateLimiter;
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const TEST_USER_AGENT: &str = "TestBot/1.0 (+https://example.com/contact; test@example.com)";

pub fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

pub fn test_client() -> Client {
    build_http_client(&HttpConfig::default(), &test_user_agent()).expect("client builds")
}

/// Limiter generous enough not to slow tests down
pub fn fast_limiter() -> Arc<DomainRateLimiter> {
    Arc::new(DomainRateLimiter::new(
        NonZeroU32::new(100).unwrap(),
        NonZeroU32::new(100).unwrap(),
    ))
}

pub fn test_prober(limiter: Arc<DomainRateLimiter>) -> LinkProber {
    LinkProber::new(
        test_client(),
        TEST_USER_AGENT,
        limiter,
        Duration::from_secs(2),
    )
}

pub fn fetch_job(id: &str, url: &str) -> FetchJob {
    FetchJob::new(
        id,
        Url::parse(url).expect("valid test URL"),
        test_client(),
        test_prober(fast_limiter()),
    )
}

/// A local URL nothing listens on
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}
