//! URL sanitizing and link button construction.
//!
//! Telegram refuses the whole message when a single button URL is malformed, so
//! every link passes through [`sanitize_url`] before it becomes a button.

use super::client::{ButtonRow, LinkButton};
use super::messages::{BUTTON_DOWNLOAD, BUTTON_STREAM};
use crate::config::BUTTON_URL_MAX_LEN;
use crate::links::LinkRecord;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::form_urlencoded;

/// Scheme-less Telegram hosts that are promoted to `https://`
const BARE_PREFIXES: &[&str] = &["t.me/", "telegram.me/", "telegram.dog/"];

/// Bytes escaped in a path: everything except ASCII alphanumerics and `/%._-~`
const PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'%')
    .remove(b'.')
    .remove(b'_')
    .remove(b'-')
    .remove(b'~');

/// Percent-encodes a URL path, leaving `/`, `%` and unreserved characters alone.
///
/// Existing escapes survive because `%` is kept, so the function is idempotent.
#[must_use]
pub fn quote_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_SET).to_string()
}

/// Decodes and re-encodes a query string, keeping pairs with blank values.
fn requote_query(query: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form_urlencoded::parse(query.as_bytes()))
        .finish()
}

/// The five components of an absolute URL.
struct UrlParts<'a> {
    scheme: String,
    netloc: &'a str,
    path: &'a str,
    query: &'a str,
    fragment: &'a str,
}

impl<'a> UrlParts<'a> {
    /// Splits `scheme://netloc/path?query#fragment`. Returns `None` when there is no
    /// scheme or no `//` authority marker.
    fn split(url: &'a str) -> Option<Self> {
        let (scheme, rest) = url.split_once(':')?;
        let valid_scheme = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return None;
        }
        let rest = rest.strip_prefix("//")?;

        let (rest, fragment) = rest.split_once('#').unwrap_or((rest, ""));
        let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (netloc, path) = rest.find('/').map_or((rest, ""), |i| rest.split_at(i));

        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            netloc,
            path,
            query,
            fragment,
        })
    }

    fn canonical(&self) -> String {
        let mut out = format!("{}://{}{}", self.scheme, self.netloc, quote_path(self.path));
        let query = requote_query(self.query);
        if !query.is_empty() {
            out.push('?');
            out.push_str(&query);
        }
        if !self.fragment.is_empty() {
            out.push('#');
            out.push_str(&quote_path(self.fragment));
        }
        out
    }
}

/// Normalizes a candidate link for use in an inline button.
///
/// - blank input yields `None`
/// - `t.me/...`, `telegram.me/...` and `telegram.dog/...` get an `https://` scheme
/// - anything that is not `http`/`https`, or whose host is empty or contains
///   whitespace, yields `None`
/// - path, query and fragment are always re-encoded, so embedded whitespace disappears and the
///   output is canonical
/// - results longer than 1024 characters yield `None`
///
/// Never panics.
///
/// # Examples
///
/// ```
/// use stream_link_bot::bot::buttons::sanitize_url;
///
/// assert_eq!(
///     sanitize_url(Some("t.me/some channel")).as_deref(),
///     Some("https://t.me/some%20channel")
/// );
/// assert_eq!(sanitize_url(Some("javascript:alert(1)")), None);
/// assert_eq!(sanitize_url(Some("   ")), None);
/// ```
#[must_use]
pub fn sanitize_url(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Tabs and line breaks are stripped before splitting, like browsers do
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
        .collect();

    let candidate = if BARE_PREFIXES.iter().any(|p| cleaned.starts_with(p)) {
        format!("https://{cleaned}")
    } else {
        cleaned
    };

    let parts = UrlParts::split(&candidate)?;
    if !matches!(parts.scheme.as_str(), "http" | "https")
        || parts.netloc.is_empty()
        || parts.netloc.contains(char::is_whitespace)
    {
        return None;
    }

    let safe = parts.canonical();
    // The host is kept as given, so count characters rather than bytes
    (safe.chars().count() <= BUTTON_URL_MAX_LEN).then_some(safe)
}

/// Builds the stream/download button row for a link record.
///
/// Buttons whose URL does not survive [`sanitize_url`] are left out; when both are
/// left out there is no row at all.
#[must_use]
pub fn build_link_buttons(links: &LinkRecord) -> Option<ButtonRow> {
    let mut row = Vec::with_capacity(2);
    if let Some(url) = sanitize_url(links.stream_link.as_deref()) {
        row.push(LinkButton::new(BUTTON_STREAM, url));
    }
    if let Some(url) = sanitize_url(links.online_link.as_deref()) {
        row.push(LinkButton::new(BUTTON_DOWNLOAD, url));
    }
    (!row.is_empty()).then_some(row)
}
