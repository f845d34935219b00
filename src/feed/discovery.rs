//! Alternate-feed discovery for HTML pages.
//!
//! A page that advertises its feed through
//! `<link rel="alternate" type="application/rss+xml" href="...">` is replaced
//! by that feed. Only one hop is ever taken.

use super::fetcher::FetchResponse;

const FEED_TYPES: [&str; 2] = ["application/rss+xml", "application/atom+xml"];

/// The advertised feed URL of an HTML response, resolved against its final URL.
pub fn alternate_feed(response: &FetchResponse) -> Option<String> {
    if !looks_like_html(response) {
        return None;
    }
    find_feed_link_in_html(&response.text(), &response.url)
}

/// HTML by Content-Type, or by sniffing when the server sent none.
fn looks_like_html(response: &FetchResponse) -> bool {
    if response.content_type.is_empty() || response.content_type == "text/plain" {
        let head = String::from_utf8_lossy(&response.body[..response.body.len().min(512)])
            .to_lowercase();
        return head.contains("<html") || head.contains("<!doctype html");
    }
    response.content_type == "text/html" || response.content_type == "application/xhtml+xml"
}

/// Scans HTML for `<link>` tags with `rel="alternate"` and RSS/Atom type attributes.
///
/// Handles attribute ordering variations and resolves relative URLs against
/// the base URL. Returns the first matching feed URL.
fn find_feed_link_in_html(html: &str, base_url: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with `html`
    let html_lower = html.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(link_start) = html_lower[search_from..].find("<link") {
        let abs_start = search_from + link_start;
        let remaining = &html_lower[abs_start..];

        let tag_end = remaining.find('>')?;
        let tag = &remaining[..=tag_end];

        if contains_attr(tag, "rel", "alternate") && is_feed_type(tag) {
            // href is read from the original HTML to preserve URL case
            let original_tag = &html[abs_start..abs_start + tag_end + 1];
            if let Some(href) = extract_attr_value(original_tag, "href") {
                return resolve_url(href, base_url);
            }
        }

        search_from = abs_start + tag_end + 1;
    }

    None
}

/// Checks if a lowercased tag contains an attribute with the given value.
fn contains_attr(tag: &str, attr_name: &str, attr_value: &str) -> bool {
    let pattern_double = format!("{attr_name}=\"{attr_value}\"");
    let pattern_single = format!("{attr_name}='{attr_value}'");
    tag.contains(&pattern_double) || tag.contains(&pattern_single)
}

fn is_feed_type(tag: &str) -> bool {
    FEED_TYPES.iter().any(|t| tag.contains(t))
}

/// Extracts the value of an attribute from a tag string (case-preserving).
fn extract_attr_value<'a>(tag: &'a str, attr_name: &str) -> Option<&'a str> {
    let tag_lower = tag.to_ascii_lowercase();
    let attr_prefix = format!("{attr_name}=");

    let value_start = tag_lower.find(&attr_prefix)? + attr_prefix.len();
    let rest = tag.get(value_start..)?;
    let quote = *rest.as_bytes().first()?;

    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let inner = &rest[1..];
    let end = inner.find(quote as char)?;
    Some(&inner[..end])
}

fn resolve_url(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match url::Url::parse(base_url) {
        Ok(base) => base.join(href).ok().map(String::from),
        Err(_) => url::Url::parse(href).ok().map(String::from),
    }
}
