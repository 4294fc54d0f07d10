//! HTTP fetcher implementation
//!
//! This module builds the shared HTTP client and performs the page fetch of a
//! scan job. Failures are split into the three job-fatal kinds: the request
//! itself failed, the server answered with a non-200 status, or the body
//! could not be read.

use crate::config::{HttpConfig, UserAgentConfig};
use crate::ScanError;
use reqwest::{redirect::Policy, Client, StatusCode};
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects; relative links resolve against it
    pub final_url: Url,

    /// Decoded page body
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `http` - Timeouts and redirect limit
/// * `user_agent` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use pagescope::config::{HttpConfig, UserAgentConfig};
/// use pagescope::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default(), &UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    http: &HttpConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(http.client_timeout())
        .connect_timeout(http.connect_timeout())
        .redirect(Policy::limited(http.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page with GET
///
/// # Errors
///
/// | Condition | Error |
/// |-----------|-------|
/// | Connection, TLS, timeout, redirect limit | `ScanError::Fetch` |
/// | Status other than 200 | `ScanError::HttpStatus` |
/// | Body could not be read or decoded | `ScanError::BodyRead` |
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, ScanError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| ScanError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(ScanError::HttpStatus {
            url: url.to_string(),
            status,
        });
    }

    let final_url = response.url().clone();

    // text() honors the charset of the Content-Type header
    let body = response.text().await.map_err(|source| ScanError::BodyRead {
        url: url.to_string(),
        source,
    })?;

    Ok(FetchedPage { final_url, body })
}
