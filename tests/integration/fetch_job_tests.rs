use crate::common::{closed_port_url, fetch_job};
use pagescope::analysis::HrefType;
use pagescope::cache::SnapshotCache;
use pagescope::crawler::{Job, JobKind};
use pagescope::ScanError;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SIMPLE_PAGE: &str = r#"<!DOCTYPE html><html><head><title>Test</title></head><body><a href="/page2">Link</a></body></html>"#;

async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

async fn mount_head(server: &MockServer, link_path: &str, status: u16) {
    Mock::given(method("HEAD"))
        .and(path(link_path))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_simple_page_end_to_end() {
    let server = MockServer::start().await;
    mount_page(&server, "/", SIMPLE_PAGE).await;
    mount_head(&server, "/page2", 200).await;

    let job = fetch_job("1", &format!("{}/", server.uri()));
    let result = job.execute().await;

    assert_eq!(result.job_id, "1");
    assert_eq!(result.job_kind, JobKind::FetchAndParse);
    let page = result.page().expect("job succeeds");

    assert_eq!(page.title, "Test");
    assert_eq!(page.html_version, "HTML5");
    assert_eq!(page.hyperlinks.len(), 1);
    assert_eq!(page.hyperlinks[0].href_type, HrefType::Internal);
    assert_eq!(page.hyperlinks[0].status_code, 200);
    assert_eq!(page.link_counters.internal, 1);
    assert_eq!(page.link_counters.internal_alive, 1);
    assert_eq!(page.link_counters.external, 0);
    assert!(!page.has_login_form);
    assert_eq!(job.progress(), 100.0);
}

#[tokio::test]
async fn test_full_page_analysis() {
    let server = MockServer::start().await;
    let external = format!("{}/external", server.uri());
    let body = format!(
        r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">
        <html><head><title>Login</title></head><body>
            <h1>Welcome</h1><h2>One</h2><h2>Two</h2>
            <a href="/alive">alive</a>
            <a href="/dead">dead</a>
            <a href="{external}">external</a>
            <a href="mailto:someone@example.com">mail</a>
            <a name="no-href">skip me</a>
            <form method="post" action="/login">
                <input type="email" name="email">
                <input type="password" name="password">
            </form>
        </body></html>"#
    );
    mount_page(&server, "/", &body).await;
    mount_head(&server, "/alive", 200).await;
    mount_head(&server, "/dead", 404).await;
    mount_head(&server, "/external", 200).await;

    let result = fetch_job("2", &format!("{}/", server.uri())).execute().await;
    let page = result.page().expect("job succeeds");

    assert_eq!(page.html_version, "HTML 4.01 Strict");
    assert_eq!(page.headings["h1"], 1);
    assert_eq!(page.headings["h2"], 2);
    assert_eq!(page.headings["h3"], 0);
    assert!(page.has_login_form);

    // Anchors without href are not counted
    assert_eq!(page.hyperlinks.len(), 4);

    let counters = page.link_counters;
    assert_eq!(counters.internal, 2);
    assert_eq!(counters.internal_alive, 1);
    assert_eq!(counters.external, 1);
    assert_eq!(counters.external_alive, 1);
    assert_eq!(counters.protocol, 1);
    assert!(counters.internal_alive <= counters.internal);
    assert!(counters.external_alive <= counters.external);

    let mail = page
        .hyperlinks
        .iter()
        .find(|l| l.raw.starts_with("mailto:"))
        .expect("mailto link present");
    assert_eq!(mail.status_code, -1);
}

#[tokio::test]
async fn test_unknown_doctype_does_not_fail_job() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<p>just a fragment</p>").await;

    let result = fetch_job("3", &format!("{}/", server.uri())).execute().await;
    let page = result.page().expect("job succeeds");
    assert_eq!(page.html_version, "Unknown");
    assert_eq!(page.title, "");
    assert!(page.hyperlinks.is_empty());
}

#[tokio::test]
async fn test_relative_links_resolve_against_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "/dir/new"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/dir/new", r#"<html><body><a href="child">c</a></body></html>"#).await;
    mount_head(&server, "/dir/child", 200).await;

    let result = fetch_job("4", &format!("{}/old", server.uri())).execute().await;
    let page = result.page().expect("job succeeds");

    let link = &page.hyperlinks[0];
    assert_eq!(link.resolved.as_ref().map(|u| u.path()), Some("/dir/child"));
    assert_eq!(link.status_code, 200);
}

#[tokio::test]
async fn test_non_200_page_fails_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = fetch_job("5", &format!("{}/missing", server.uri()))
        .execute()
        .await;

    let error = result.outcome.expect_err("job fails");
    assert_eq!(error.id, "5");
    assert_eq!(error.kind, JobKind::FetchAndParse);
    match error.source {
        ScanError::HttpStatus { status, .. } => assert_eq!(status.as_u16(), 404),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_network_failure_fails_job() {
    let result = fetch_job("6", &closed_port_url()).execute().await;

    let error = result.outcome.expect_err("job fails");
    assert!(matches!(error.source, ScanError::Fetch { .. }));
    assert!(error.to_string().contains("FetchJob 6"));
}

#[tokio::test]
async fn test_job_publishes_snapshots() {
    let server = MockServer::start().await;
    mount_page(&server, "/", SIMPLE_PAGE).await;
    mount_head(&server, "/page2", 200).await;

    let cache = SnapshotCache::new(Duration::from_secs(60));
    let key = format!("{}/", server.uri());
    let job = fetch_job("7", &key).with_cache(cache.clone(), key.clone());

    job.execute().await;

    let snapshot = cache.get(&key).expect("snapshot written");
    assert!(snapshot.is_finished());
    assert_eq!(snapshot.progress, 100.0);
    assert_eq!(snapshot.page.expect("page present").title, "Test");
}

#[tokio::test]
async fn test_progress_never_decreases() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/fast">f</a><a href="/mid">m</a><a href="/slow">s</a></body></html>"#,
    )
    .await;
    for (link_path, delay) in [("/fast", 0), ("/mid", 150), ("/slow", 300)] {
        Mock::given(method("HEAD"))
            .and(path(link_path))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(delay)))
            .mount(&server)
            .await;
    }

    let cache = SnapshotCache::new(Duration::from_secs(60));
    let key = format!("{}/", server.uri());
    let job = Arc::new(fetch_job("8", &key).with_cache(cache.clone(), key.clone()));

    let running = {
        let job = Arc::clone(&job);
        tokio::spawn(async move { job.execute().await })
    };

    let mut job_values = Vec::new();
    let mut cached_values = Vec::new();
    while !running.is_finished() {
        job_values.push(job.progress());
        if let Some(snapshot) = cache.get(&key) {
            cached_values.push(snapshot.progress);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let result = running.await.expect("job task completes");
    assert!(result.is_ok());
    job_values.push(job.progress());
    cached_values.push(cache.get(&key).expect("snapshot written").progress);

    for values in [&job_values, &cached_values] {
        assert!(
            values.windows(2).all(|pair| pair[0] <= pair[1]),
            "progress decreased: {:?}",
            values
        );
        assert_eq!(values.last().copied(), Some(100.0));
    }
    // The delayed links leave time to observe partial progress
    assert!(job_values.iter().any(|&p| p > 0.0 && p < 100.0));
}

#[tokio::test]
async fn test_undecodable_body_fails_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(b"<html>not gzip at all</html>".to_vec()),
        )
        .mount(&server)
        .await;

    let result = fetch_job("9", &format!("{}/", server.uri())).execute().await;

    let error = result.outcome.expect_err("job fails");
    assert!(
        matches!(error.source, ScanError::BodyRead { .. }),
        "unexpected error: {}",
        error
    );
}
