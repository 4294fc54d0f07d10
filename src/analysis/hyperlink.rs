//! Hyperlink classification and liveness probing
//!
//! Every `<a href>` on a scanned page becomes a [`HyperLink`]: the raw href is
//! classified by locality, resolved against the page URL, and, when it points
//! at an http(s) resource, probed with a HEAD request (GET fallback) after the
//! per-domain rate limiter admits it.

use crate::state::DomainRateLimiter;
use crate::url::extract_domain;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::{ParseError, Url};

/// Status recorded for a link whose scheme is not http/https
pub const STATUS_UNSUPPORTED_SCHEME: i32 = -1;

/// Status recorded when no HTTP response was obtained
pub const STATUS_NO_RESPONSE: i32 = 0;

/// Locality of a hyperlink target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HrefType {
    /// Same-site link: fragments, relative paths, anything not absolute
    Internal,
    /// Absolute link with a scheme, `//` and a host
    External,
    /// Scheme without a host, e.g. `mailto:` or `tel:`
    Protocol,
}

impl HrefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Protocol => "protocol",
        }
    }
}

impl fmt::Display for HrefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Link-local failures; recorded on the link, never fatal to the job
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("parse error for {href:?}: {message}")]
    Parse { href: String, message: String },

    #[error("relative URL {0:?} with no base")]
    RelativeWithoutBase(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("link check did not complete: {0}")]
    Incomplete(String),
}

/// Analysis result for a single `<a href>`
#[derive(Debug, Clone, PartialEq)]
pub struct HyperLink {
    /// The href exactly as written in the page
    pub raw: String,

    /// Absolute URL after resolution, if resolution succeeded
    pub resolved: Option<Url>,

    pub href_type: HrefType,

    /// HTTP status, or [`STATUS_UNSUPPORTED_SCHEME`] / [`STATUS_NO_RESPONSE`]
    pub status_code: i32,

    pub error: Option<LinkError>,
}

impl HyperLink {
    /// A link is alive when its probe answered 200
    pub fn is_alive(&self) -> bool {
        self.status_code == i32::from(StatusCode::OK.as_u16())
    }
}

/// Classifies an href by locality
///
/// - `External`: parses as absolute and names a host after `scheme://`
///   (`https://a.com`)
/// - `Protocol`: parses as absolute but names no host that way (`tel:123`,
///   `http:/page`)
/// - `Internal`: everything else, including fragments, relative paths and
///   malformed values such as `#!` or `./`
///
/// # Examples
///
/// ```
/// use pagescope::analysis::{classify, HrefType};
///
/// assert_eq!(classify("tel:123"), HrefType::Protocol);
/// assert_eq!(classify("https://a.com"), HrefType::External);
/// assert_eq!(classify("https:a.com"), HrefType::Protocol);
/// assert_eq!(classify("./x"), HrefType::Internal);
/// assert_eq!(classify("#"), HrefType::Internal);
/// ```
pub fn classify(href: &str) -> HrefType {
    match Url::parse(href) {
        Ok(url) if has_authority(href) && extract_domain(&url).is_some() => HrefType::External,
        Ok(_) => HrefType::Protocol,
        Err(_) => HrefType::Internal,
    }
}

/// Whether an absolute href spells out `//` right after its scheme
///
/// The URL parser invents a host for special schemes written without it
/// (`http:/page` gets host `page`); such hrefs name no host.
fn has_authority(href: &str) -> bool {
    let href = href.trim_matches(|c: char| c <= ' ');
    href.split_once(':')
        .is_some_and(|(_, rest)| rest.starts_with("//"))
}

/// Resolves an href against the page URL
///
/// Absolute hrefs pass through unchanged; relative ones are joined onto
/// `base` per standard URL resolution. An absolute href whose host exists
/// only because the parser supplied one (`http:/page`) is rejected.
pub fn resolve_url(href: &str, base: Option<&Url>) -> Result<Url, LinkError> {
    match Url::parse(href) {
        Ok(url) if url.has_host() && !has_authority(href) => Err(LinkError::Parse {
            href: href.to_string(),
            message: "missing // before host".to_string(),
        }),
        Ok(url) => Ok(url),
        Err(ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or_else(|| LinkError::RelativeWithoutBase(href.to_string()))?;
            base.join(href).map_err(|e| LinkError::Parse {
                href: href.to_string(),
                message: e.to_string(),
            })
        }
        Err(e) => Err(LinkError::Parse {
            href: href.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Probes hyperlinks over HTTP under per-domain rate limits
#[derive(Debug, Clone)]
pub struct LinkProber {
    client: Client,
    user_agent: String,
    limiter: Arc<DomainRateLimiter>,
    probe_timeout: Duration,
}

impl LinkProber {
    /// Creates a prober sharing `client` and `limiter` across all jobs
    ///
    /// `user_agent` is sent with every probe; `probe_timeout` bounds each
    /// HEAD or GET attempt individually.
    pub fn new(
        client: Client,
        user_agent: impl Into<String>,
        limiter: Arc<DomainRateLimiter>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            limiter,
            probe_timeout,
        }
    }

    pub fn limiter(&self) -> &Arc<DomainRateLimiter> {
        &self.limiter
    }

    /// Resolves and probes one href
    ///
    /// # Outcomes
    ///
    /// | Condition | status_code | error |
    /// |-----------|-------------|-------|
    /// | resolution failed | 0 | Parse / RelativeWithoutBase |
    /// | scheme not http(s) | -1 | UnsupportedScheme |
    /// | transport failure | 0 | Request |
    /// | response | HEAD status, or GET status after 400/405 | none |
    ///
    /// No network call is made in the first two cases.
    pub async fn analyze(&self, raw_href: &str, base: Option<&Url>) -> HyperLink {
        self.analyze_bounded(raw_href, base, None).await
    }

    /// Like [`LinkProber::analyze`], holding a permit from `permits` only
    /// while the request is in flight
    ///
    /// The permit is taken after the rate limiter admits the request, so
    /// links waiting on a slow domain do not hold back other domains.
    pub async fn analyze_bounded(
        &self,
        raw_href: &str,
        base: Option<&Url>,
        permits: Option<&Semaphore>,
    ) -> HyperLink {
        let href_type = classify(raw_href);

        let resolved = match resolve_url(raw_href, base) {
            Ok(url) => url,
            Err(error) => {
                tracing::debug!("Could not resolve {:?}: {}", raw_href, error);
                return HyperLink {
                    raw: raw_href.to_string(),
                    resolved: None,
                    href_type,
                    status_code: STATUS_NO_RESPONSE,
                    error: Some(error),
                };
            }
        };

        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            return HyperLink {
                raw: raw_href.to_string(),
                error: Some(LinkError::UnsupportedScheme(resolved.scheme().to_string())),
                resolved: Some(resolved),
                href_type,
                status_code: STATUS_UNSUPPORTED_SCHEME,
            };
        }

        if let Some(domain) = extract_domain(&resolved) {
            self.limiter.until_ready(&domain).await;
        }

        let _permit = match permits {
            // A closed semaphore only lifts the bound
            Some(permits) => permits.acquire().await.ok(),
            None => None,
        };

        match self.fetch_status(&resolved).await {
            Ok(status) => HyperLink {
                raw: raw_href.to_string(),
                resolved: Some(resolved),
                href_type,
                status_code: i32::from(status.as_u16()),
                error: None,
            },
            Err(e) => {
                tracing::warn!("Failed probing {}: {}", resolved, e);
                HyperLink {
                    raw: raw_href.to_string(),
                    resolved: Some(resolved),
                    href_type,
                    status_code: STATUS_NO_RESPONSE,
                    error: Some(LinkError::Request(e.to_string())),
                }
            }
        }
    }

    /// Sends HEAD, retrying once with GET when the server rejects HEAD
    async fn fetch_status(&self, url: &Url) -> Result<StatusCode, reqwest::Error> {
        let head = self
            .client
            .head(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .timeout(self.probe_timeout)
            .send()
            .await?;

        let status = head.status();
        if status != StatusCode::METHOD_NOT_ALLOWED && status != StatusCode::BAD_REQUEST {
            return Ok(status);
        }

        tracing::trace!("HEAD {} answered {}, retrying with GET", url, status);
        let get = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .timeout(self.probe_timeout)
            .send()
            .await?;

        Ok(get.status())
    }
}
