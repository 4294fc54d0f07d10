//! Page analysis primitives
//!
//! Pure building blocks used by the fetch-and-parse job:
//! - DOCTYPE scanning and HTML version classification
//! - Hyperlink classification, resolution and probing
//! - Login form detection

mod doctype;
mod hyperlink;
mod login_form;

pub use doctype::{get_html_version, lookup_public_id, DoctypeError, DoctypeNode, UNKNOWN_VERSION};
pub use hyperlink::{
    classify, resolve_url, HrefType, HyperLink, LinkError, LinkProber, STATUS_NO_RESPONSE,
    STATUS_UNSUPPORTED_SCHEME,
};
pub use login_form::has_login_form;
