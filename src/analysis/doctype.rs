//! DOCTYPE declaration scanner
//!
//! Classifies the HTML version of a document from its `<!DOCTYPE ...>`
//! declaration with a hand-written scan: locate the declaration, split its
//! body into tokens (double-quoted spans kept verbatim), then match the token
//! shape against the known PUBLIC identifiers.

use thiserror::Error;

const DOCTYPE_OPEN: &str = "<!DOCTYPE";

/// Name given to a page whose version could not be determined
pub const UNKNOWN_VERSION: &str = "Unknown";

/// Parsed DOCTYPE information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctypeNode {
    /// Human-readable classification, e.g. "HTML5" or "HTML 4.01 Strict"
    pub name: String,

    /// The root name, always lower-case ("html")
    pub document_type_name: String,

    /// The PUBLIC identifier, if declared
    pub public_id: Option<String>,

    /// The SYSTEM identifier/URI, if declared
    pub system_id: Option<String>,

    /// The exact `<!DOCTYPE ...>` text parsed (empty when inferred)
    pub raw: String,
}

impl DoctypeNode {
    /// Fallback classification used when a declaration cannot be parsed
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_VERSION.to_string(),
            document_type_name: String::new(),
            public_id: None,
            system_id: None,
            raw: String::new(),
        }
    }
}

/// Reasons a document's DOCTYPE could not be classified
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DoctypeError {
    #[error("unsupported DOCTYPE or quirky document (no <!DOCTYPE>)")]
    Missing,

    #[error("malformed <!DOCTYPE> (no closing '>')")]
    Unclosed,

    #[error("unterminated quote in <!DOCTYPE>")]
    UnterminatedQuote,

    #[error("DOCTYPE has no name token, document considered quirky")]
    NoNameToken,

    #[error("unsupported or unrecognized DOCTYPE format, document considered quirky")]
    Unrecognized,
}

/// Known PUBLIC identifiers and the version they denote
///
/// HTML5 and XHTML5 carry no public identifier and are handled separately.
const KNOWN_DOCTYPES: &[(&str, &str)] = &[
    ("-//W3C//DTD HTML 2.0//EN", "HTML 2.0"),
    ("-//IETF//DTD HTML 2.0//EN", "HTML 2.0"),
    ("-//IETF//DTD HTML 2.0 Level 1//EN", "HTML 2.0 Level 1"),
    ("-//IETF//DTD HTML 2.0 Level 2//EN", "HTML 2.0 Level 2"),
    ("-//IETF//DTD HTML 2.0 Strict//EN", "HTML 2.0 Strict"),
    ("-//IETF//DTD HTML 2.0 Strict Level 1//EN", "HTML 2.0 Strict Level 1"),
    ("-//IETF//DTD HTML 2.0 Strict Level 2//EN", "HTML 2.0 Strict Level 2"),
    ("-//W3C//DTD HTML 3.0//EN", "HTML 3.0 Draft"),
    ("-//IETF//DTD HTML 3.0//EN", "HTML 3.0 Draft"),
    ("-//IETF//DTD HTML Level 3//EN", "HTML Level 3"),
    ("-//IETF//DTD HTML Strict Level 3//EN", "HTML Strict Level 3"),
    ("-//W3C//DTD HTML 3.2 Final//EN", "HTML 3.2"),
    ("-//IETF//DTD HTML 3.2 Final//EN", "HTML 3.2"),
    ("-//W3C//DTD HTML 4.0//EN", "HTML 4.0 Strict"),
    ("-//W3C//DTD HTML 4.0 Transitional//EN", "HTML 4.0 Transitional"),
    ("-//W3C//DTD HTML 4.0 Frameset//EN", "HTML 4.0 Frameset"),
    ("-//W3C//DTD HTML 4.01//EN", "HTML 4.01 Strict"),
    ("-//IETF//DTD HTML 4.01//EN", "HTML 4.01 Strict"),
    ("-//W3C//DTD HTML 4.01 Transitional//EN", "HTML 4.01 Transitional"),
    ("-//IETF//DTD HTML 4.01 Transitional//EN", "HTML 4.01 Transitional"),
    ("-//W3C//DTD HTML 4.01 Frameset//EN", "HTML 4.01 Frameset"),
    ("-//IETF//DTD HTML 4.01 Frameset//EN", "HTML 4.01 Frameset"),
    ("-//W3C//DTD XHTML 1.0 Strict//EN", "XHTML 1.0 Strict"),
    ("-//IETF//DTD XHTML 1.0 Strict//EN", "XHTML 1.0 Strict"),
    ("-//W3C//DTD XHTML 1.0 Transitional//EN", "XHTML 1.0 Transitional"),
    ("-//IETF//DTD XHTML 1.0 Transitional//EN", "XHTML 1.0 Transitional"),
    ("-//W3C//DTD XHTML 1.0 Frameset//EN", "XHTML 1.0 Frameset"),
    ("-//IETF//DTD XHTML 1.0 Frameset//EN", "XHTML 1.0 Frameset"),
    ("-//W3C//DTD XHTML 1.1//EN", "XHTML 1.1"),
    ("-//IETF//DTD XHTML 1.1//EN", "XHTML 1.1"),
    ("-//W3C//DTD XHTML Basic 1.0//EN", "XHTML Basic 1.0"),
    ("-//IETF//DTD XHTML Basic 1.0//EN", "XHTML Basic 1.0"),
    ("-//W3C//DTD XHTML Basic 1.1//EN", "XHTML Basic 1.1"),
    ("-//W3C//DTD XHTML-Print 1.0//EN", "XHTML-Print 1.0"),
    ("-//W3C//DTD MathML 2.0//EN", "MathML 2.0"),
];

/// Looks up the version named by a PUBLIC identifier
pub fn lookup_public_id(public_id: &str) -> Option<&'static str> {
    KNOWN_DOCTYPES
        .iter()
        .find(|(id, _)| *id == public_id)
        .map(|(_, name)| *name)
}

/// A declaration token; quoted tokens keep their original casing
#[derive(Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Token::Word(s) | Token::Quoted(s) => s,
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(s) if s == keyword)
    }
}

/// Determines the HTML version of a document from its DOCTYPE
///
/// # Classification
///
/// | Declaration | Result |
/// |-------------|--------|
/// | none, but an `<html` tag | XHTML5 |
/// | none | `DoctypeError::Missing` |
/// | `<!DOCTYPE html>` | HTML5 |
/// | `root PUBLIC "id" "uri"` | table lookup, else "Unknown PUBLIC+SYSTEM declaration" |
/// | `root PUBLIC "id"` | table lookup, else "Unknown PUBLIC-only declaration" |
/// | `root SYSTEM "uri"` | "Unknown SYSTEM-only declaration" |
/// | anything else | `DoctypeError::Unrecognized` |
///
/// # Example
///
/// ```
/// use pagescope::analysis::get_html_version;
///
/// let node = get_html_version("<!DOCTYPE html><html></html>").unwrap();
/// assert_eq!(node.name, "HTML5");
/// assert_eq!(node.document_type_name, "html");
/// ```
pub fn get_html_version(input: &str) -> Result<DoctypeNode, DoctypeError> {
    // ASCII upper-casing keeps byte offsets aligned with `input`
    let upper = input.to_ascii_uppercase();

    let start = match upper.find(DOCTYPE_OPEN) {
        Some(start) => start,
        None => {
            // Without a declaration only an XHTML-style document is accepted
            if upper.contains("<HTML") {
                return Ok(DoctypeNode {
                    name: "XHTML5".to_string(),
                    document_type_name: "html".to_string(),
                    public_id: None,
                    system_id: None,
                    raw: String::new(),
                });
            }
            return Err(DoctypeError::Missing);
        }
    };

    let end = upper[start..]
        .find('>')
        .map(|offset| start + offset)
        .ok_or(DoctypeError::Unclosed)?;

    let raw = &input[start..=end];
    let tokens = tokenize(&input[start + DOCTYPE_OPEN.len()..end])?;

    let root = tokens
        .first()
        .ok_or(DoctypeError::NoNameToken)?
        .text()
        .to_lowercase();

    let node = |name: &str, public_id: Option<&Token>, system_id: Option<&Token>| DoctypeNode {
        name: name.to_string(),
        document_type_name: root.clone(),
        public_id: public_id.map(|t| t.text().to_string()),
        system_id: system_id.map(|t| t.text().to_string()),
        raw: raw.to_string(),
    };

    match tokens.as_slice() {
        [_] if root == "html" => Ok(node("HTML5", None, None)),
        [_, keyword, public_id, system_id, ..] if keyword.is_keyword("PUBLIC") => {
            let name = lookup_public_id(public_id.text())
                .unwrap_or("Unknown PUBLIC+SYSTEM declaration");
            Ok(node(name, Some(public_id), Some(system_id)))
        }
        [_, keyword, public_id] if keyword.is_keyword("PUBLIC") => {
            let name =
                lookup_public_id(public_id.text()).unwrap_or("Unknown PUBLIC-only declaration");
            Ok(node(name, Some(public_id), None))
        }
        [_, keyword, system_id] if keyword.is_keyword("SYSTEM") => Ok(node(
            "Unknown SYSTEM-only declaration",
            None,
            Some(system_id),
        )),
        _ => Err(DoctypeError::Unrecognized),
    }
}

/// Splits a declaration body on ASCII whitespace, except inside double quotes
///
/// Unquoted words are upper-cased for comparison.
fn tokenize(body: &str) -> Result<Vec<Token>, DoctypeError> {
    let bytes = body.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        if bytes[i] == b'"' {
            let close = body[i + 1..]
                .find('"')
                .map(|offset| i + 1 + offset)
                .ok_or(DoctypeError::UnterminatedQuote)?;
            tokens.push(Token::Quoted(body[i + 1..close].to_string()));
            i = close + 1;
        } else {
            let mut j = i;
            while j < bytes.len() && !bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            tokens.push(Token::Word(body[i..j].to_ascii_uppercase()));
            i = j;
        }
    }

    Ok(tokens)
}
