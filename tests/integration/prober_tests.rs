use crate::common::{closed_port_url, fast_limiter, test_prober, TEST_USER_AGENT};
use pagescope::analysis::{HrefType, LinkError, STATUS_NO_RESPONSE};
use pagescope::state::DomainRateLimiter;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_head_success_skips_get() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let link = test_prober(fast_limiter())
        .analyze(&format!("{}/ok", server.uri()), None)
        .await;

    assert_eq!(link.status_code, 200);
    assert_eq!(link.href_type, HrefType::External);
    assert!(link.is_alive());
    assert_eq!(link.error, None);
}

#[tokio::test]
async fn test_head_405_retries_with_get() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/no-head"))
        .respond_with(ResponseTemplate::new(405))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/no-head"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let link = test_prober(fast_limiter()).analyze("/no-head", Some(&base)).await;

    assert_eq!(link.href_type, HrefType::Internal);
    assert_eq!(link.status_code, 200);
}

#[tokio::test]
async fn test_head_400_retries_with_get() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/picky"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/picky"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let link = test_prober(fast_limiter()).analyze("/picky", Some(&base)).await;

    // The GET status is final
    assert_eq!(link.status_code, 404);
    assert!(!link.is_alive());
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let link = test_prober(fast_limiter()).analyze("/broken", Some(&base)).await;
    assert_eq!(link.status_code, 500);
}

#[tokio::test]
async fn test_link_check_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/ua"))
        .and(header("user-agent", TEST_USER_AGENT))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let link = test_prober(fast_limiter()).analyze("/ua", Some(&base)).await;
    assert_eq!(link.status_code, 200);
}

#[tokio::test]
async fn test_unsupported_scheme_makes_no_request() {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();

    let link = test_prober(fast_limiter())
        .analyze("ftp://files.example.com/a.txt", Some(&base))
        .await;

    assert_eq!(link.status_code, -1);
    assert!(matches!(link.error, Some(LinkError::UnsupportedScheme(_))));
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_transport_failure_is_status_zero() {
    let link = test_prober(fast_limiter())
        .analyze(&closed_port_url(), None)
        .await;

    assert_eq!(link.status_code, STATUS_NO_RESPONSE);
    assert!(matches!(link.error, Some(LinkError::Request(_))));
}

#[tokio::test]
async fn test_links_to_one_domain_are_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let limiter = Arc::new(DomainRateLimiter::new(
        NonZeroU32::new(10).unwrap(),
        NonZeroU32::new(1).unwrap(),
    ));
    let prober = test_prober(Arc::clone(&limiter));
    let base = Url::parse(&server.uri()).unwrap();

    let start = Instant::now();
    for href in ["/a", "/b", "/c"] {
        assert_eq!(prober.analyze(href, Some(&base)).await.status_code, 200);
    }

    // Two refills at 10/s take about 200ms
    assert!(start.elapsed() >= Duration::from_millis(150));
    assert_eq!(limiter.domain_count(), 1);
}

#[tokio::test]
async fn test_missing_authority_makes_no_request() {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let prober = test_prober(fast_limiter());

    for href in ["http:/page", "https:example.com"] {
        let link = prober.analyze(href, Some(&base)).await;
        assert_eq!(link.href_type, HrefType::Protocol, "href {:?}", href);
        assert_eq!(link.status_code, STATUS_NO_RESPONSE);
        assert!(matches!(link.error, Some(LinkError::Parse { .. })));
    }

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
    assert_eq!(prober.limiter().domain_count(), 0);
}

#[tokio::test]
async fn test_waiting_domain_holds_no_permit() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // One token per second: the second and third 127.0.0.1 links wait
    let limiter = Arc::new(DomainRateLimiter::new(
        NonZeroU32::new(1).unwrap(),
        NonZeroU32::new(1).unwrap(),
    ));
    let prober = test_prober(limiter);
    let permits = Arc::new(Semaphore::new(1));
    let base = Url::parse(&server.uri()).unwrap();

    let mut slow = Vec::new();
    for href in ["/a", "/b", "/c"] {
        let prober = prober.clone();
        let permits = Arc::clone(&permits);
        let base = base.clone();
        slow.push(tokio::spawn(async move {
            prober
                .analyze_bounded(href, Some(&base), Some(permits.as_ref()))
                .await
        }));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Same server, different domain bucket
    let other = format!("http://localhost:{}/d", base.port().expect("port"));
    let start = Instant::now();
    let link = prober
        .analyze_bounded(&other, None, Some(permits.as_ref()))
        .await;

    assert_eq!(link.status_code, 200);
    assert!(
        start.elapsed() < Duration::from_millis(800),
        "other domain waited {:?}",
        start.elapsed()
    );

    for handle in slow {
        assert_eq!(handle.await.expect("link task").status_code, 200);
    }
}
