//! URL handling module for Pagescope
//!
//! This module admits target URLs before a job is created, produces the
//! normalized key used by the result cache, and extracts the host that keys
//! the per-domain rate limiter.

mod normalize;

pub use normalize::normalize_url;

use crate::UrlError;
use url::Url;

/// Validates a user-supplied target URL
///
/// Malformed URLs, URLs without a host and any scheme other than http/https
/// are rejected, so no job is ever created for them.
///
/// # Examples
///
/// ```
/// use pagescope::url::validate_target_url;
///
/// assert!(validate_target_url("https://example.com/").is_ok());
/// assert!(validate_target_url("ftp://example.com/").is_err());
/// assert!(validate_target_url("").is_err());
/// ```
pub fn validate_target_url(raw: &str) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Empty);
    }

    let url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if extract_domain(&url).is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Extracts the lower-cased host from a URL
///
/// Returns `None` when the URL has no host or an empty one
/// (e.g. `mailto:` or `file:///` URLs).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use pagescope::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}
