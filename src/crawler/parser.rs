//! HTML parser for extracting page structure
//!
//! This module turns a fetched body into a [`ParsedPage`]: title, heading
//! counts, the raw hrefs to probe and the login form verdict. The scraper
//! document is not `Send`, so everything a job needs is copied out here and
//! the document is dropped before any await point.

use crate::analysis::has_login_form;
use scraper::{Html, Selector};
use std::collections::BTreeMap;

/// Heading tags counted on every page
pub const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Text of the first `<title>` as written, empty when there is none
    pub title: String,

    /// Element count per heading tag, always holding all six levels
    pub headings: BTreeMap<String, usize>,

    /// Raw `href` values of anchors in document order, duplicates kept
    pub hrefs: Vec<String>,

    pub has_login_form: bool,
}

/// Parses HTML content and extracts the page structure
///
/// Anchors without an `href` attribute are skipped.
///
/// # Example
///
/// ```
/// use pagescope::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.hrefs, vec!["/page".to_string()]);
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        headings: count_headings(&document),
        hrefs: extract_hrefs(&document),
        has_login_form: has_login_form(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let Ok(title_selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>())
        .unwrap_or_default()
}

fn count_headings(document: &Html) -> BTreeMap<String, usize> {
    HEADING_TAGS
        .iter()
        .map(|tag| {
            let count = Selector::parse(tag)
                .map(|selector| document.select(&selector).count())
                .unwrap_or(0);
            (tag.to_string(), count)
        })
        .collect()
}

fn extract_hrefs(document: &Html) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}
