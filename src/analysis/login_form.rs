//! Login form detection
//!
//! Best-effort heuristic over a parsed document. Multi-page flows and forms
//! rendered by JavaScript are not detected.

use scraper::{Html, Selector};

/// `autocomplete` values that password managers key on
///
/// Reference: https://developer.1password.com/docs/web/compatible-website-design/
const AUTOCOMPLETE_VALUES: &[&str] = &["username", "current-password", "new-password", "one-time-code"];

/// Input types that usually carry the login name
const LOGIN_INPUT_TYPES: &[&str] = &["email", "text"];

/// Checks if a document contains a login form
///
/// True when any element carries one of the autocomplete hints. Otherwise
/// all of these must hold:
/// - a `<form>` with non-empty `method` and `action`
/// - an `input[type=password]`
/// - an `input` of type `email` or `text`
///
/// # Example
///
/// ```
/// use pagescope::analysis::has_login_form;
/// use scraper::Html;
///
/// let doc = Html::parse_document(r#"<input autocomplete="current-password">"#);
/// assert!(has_login_form(&doc));
/// ```
pub fn has_login_form(document: &Html) -> bool {
    if AUTOCOMPLETE_VALUES
        .iter()
        .any(|value| matches_any(document, &format!("[autocomplete='{}']", value)))
    {
        return true;
    }

    has_form_with_method_and_action(document)
        && matches_any(document, "input[type='password']")
        && LOGIN_INPUT_TYPES
            .iter()
            .any(|kind| matches_any(document, &format!("input[type='{}']", kind)))
}

/// Checks for a `<form>` whose `method` and `action` are both non-blank
fn has_form_with_method_and_action(document: &Html) -> bool {
    let Ok(form_selector) = Selector::parse("form") else {
        return false;
    };

    document.select(&form_selector).any(|form| {
        let non_blank = |name: &str| {
            form.value()
                .attr(name)
                .map_or(false, |value| !value.trim().is_empty())
        };
        non_blank("method") && non_blank("action")
    })
}

fn matches_any(document: &Html, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|selector| document.select(&selector).next().is_some())
        .unwrap_or(false)
}
