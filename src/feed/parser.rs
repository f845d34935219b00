use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use thiserror::Error;

use super::model::{Extension, Feed, Item};
use super::rules::Ruleset;

/// Namespaces whose elements are part of the feed grammar, not extensions.
const CORE_NAMESPACES: [&str; 3] = [
    "http://www.w3.org/2005/Atom",
    "http://purl.org/rss/1.0/",
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#",
];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    NotAFeed(String),

    #[error("Invalid rule {rule:?}: {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Unsupported parsing mode {0:?}")]
    UnsupportedMode(String),
}

/// Turns a fetched document into a [`Feed`].
pub trait FeedParser: Send + Sync {
    /// `url` is the final URL of the document. With a `ruleset` the document
    /// is an HTML page scraped by the rules, otherwise it must be a feed.
    fn parse(
        &self,
        body: &[u8],
        encoding: Option<&str>,
        url: &str,
        ruleset: Option<&Ruleset>,
    ) -> Result<Feed, ParseError>;
}

/// RSS/Atom/JSON Feed grammar via feed-rs, custom rules via [`Ruleset`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParser;

impl FeedParser for DefaultParser {
    fn parse(
        &self,
        body: &[u8],
        encoding: Option<&str>,
        url: &str,
        ruleset: Option<&Ruleset>,
    ) -> Result<Feed, ParseError> {
        match ruleset {
            Some(rules) => {
                tracing::debug!(url = %url, encoding = ?encoding, "Parsing page with custom rules");
                Ok(rules.extract(&String::from_utf8_lossy(body), url))
            }
            None => parse_feed(body, url),
        }
    }
}

/// Parses a feed document.
///
/// Item links are kept as written; `url` becomes the feed link when the
/// document declares none.
pub fn parse_feed(body: &[u8], url: &str) -> Result<Feed, ParseError> {
    let parsed = feed_rs::parser::parse(body).map_err(|e| ParseError::NotAFeed(e.to_string()))?;
    let mut extensions = scan_extensions(body).into_iter();

    let link = primary_link(&parsed.links).unwrap_or_else(|| url.to_owned());

    let items = parsed
        .entries
        .into_iter()
        .map(|entry| Item {
            link: primary_link(&entry.links).unwrap_or_default(),
            title: entry.title.map(|t| t.content),
            description: entry.summary.map(|s| s.content),
            content: entry.content.and_then(|c| c.body),
            published: entry.published,
            updated: entry.updated,
            extensions: extensions.next().unwrap_or_default(),
        })
        .collect();

    Ok(Feed {
        title: parsed.title.map(|t| t.content),
        description: parsed.description.map(|d| d.content),
        link: Some(link),
        items,
    })
}

/// First `alternate` (or untyped) link, else the first link at all.
fn primary_link(links: &[feed_rs::model::Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_owned())
        .filter(|href| !href.is_empty())
}

/// Collects the namespaced children of every `<item>`/`<entry>`, in document order.
///
/// Documents that are not XML yield no extensions.
fn scan_extensions(body: &[u8]) -> Vec<Vec<Extension>> {
    let mut reader = NsReader::from_reader(body);
    let mut buf = Vec::new();
    let mut items: Vec<Vec<Extension>> = Vec::new();
    let mut depth = 0usize;
    let mut item_depth: Option<usize> = None;
    let mut current: Option<Extension> = None;

    loop {
        let (namespace, event) = match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, event)) => (extension_namespace(&ns), event.into_owned()),
            Err(e) => {
                tracing::trace!(error = %e, "Stopped extension scan");
                break;
            }
        };
        buf.clear();

        match event {
            Event::Start(start) => {
                depth += 1;
                let local = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                match item_depth {
                    None if local == "item" || local == "entry" => {
                        item_depth = Some(depth);
                        items.push(Vec::new());
                    }
                    Some(d) if depth == d + 1 => {
                        current = namespace.map(|namespace| Extension {
                            namespace,
                            name: local,
                            value: String::new(),
                        });
                    }
                    _ => {}
                }
            }
            Event::Empty(empty) => {
                let local = String::from_utf8_lossy(empty.local_name().as_ref()).into_owned();
                match item_depth {
                    None if local == "item" || local == "entry" => items.push(Vec::new()),
                    Some(d) if depth == d => {
                        if let (Some(namespace), Some(fields)) = (namespace, items.last_mut()) {
                            fields.push(Extension {
                                namespace,
                                name: local,
                                value: String::new(),
                            });
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(text) => {
                if let (Some(ext), Ok(text)) = (current.as_mut(), text.unescape()) {
                    ext.value.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(ext) = current.as_mut() {
                    ext.value.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                if let Some(d) = item_depth {
                    if depth == d + 1 {
                        if let (Some(mut ext), Some(fields)) = (current.take(), items.last_mut()) {
                            ext.value = ext.value.trim().to_owned();
                            fields.push(ext);
                        }
                    } else if depth == d {
                        item_depth = None;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    items
}

fn extension_namespace(resolved: &ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => {
            let uri = String::from_utf8_lossy(ns.as_ref()).into_owned();
            (!CORE_NAMESPACES.contains(&uri.as_str())).then_some(uri)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::model::FEEDBURNER_NS;
    use pretty_assertions::assert_eq;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:feedburner="http://rssnamespace.org/feedburner/ext/1.0"
     xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example Blog</title>
    <description>An example blog</description>
    <item>
      <title>First Post</title>
      <link>http://feeds.example.com/~r/blog/1</link>
      <description>Short &lt;b&gt;summary&lt;/b&gt;</description>
      <content:encoded><![CDATA[<p>Full text</p>]]></content:encoded>
      <feedburner:origLink>https://example.com/post/1</feedburner:origLink>
      <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Second Post</title>
      <link>/post/2</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Blog</title>
  <link href="https://example.com/feed.xml" rel="self"/>
  <link href="https://example.com/" rel="alternate"/>
  <entry>
    <id>1</id>
    <title>Entry</title>
    <link href="https://example.com/entry/1"/>
    <updated>2024-01-02T00:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let feed = parse_feed(RSS.as_bytes(), "https://example.com/feed.xml").unwrap();

        assert_eq!(feed.title.as_deref(), Some("Example Blog"));
        assert_eq!(feed.description.as_deref(), Some("An example blog"));
        assert_eq!(feed.items.len(), 2);

        let first = &feed.items[0];
        assert_eq!(first.title.as_deref(), Some("First Post"));
        assert!(first.link.starts_with("http://feeds.example.com/~r/blog/1"));
        assert_eq!(first.content.as_deref(), Some("<p>Full text</p>"));
        assert!(first.published.is_some());
    }

    #[test]
    fn test_feed_link_defaults_to_request_url() {
        let feed = parse_feed(RSS.as_bytes(), "https://example.com/feed.xml").unwrap();
        assert_eq!(feed.link.as_deref(), Some("https://example.com/feed.xml"));
    }

    #[test]
    fn test_atom_prefers_alternate_link() {
        let feed = parse_feed(ATOM.as_bytes(), "https://example.com/feed.xml").unwrap();
        assert_eq!(feed.link.as_deref(), Some("https://example.com/"));
        assert_eq!(feed.items[0].link, "https://example.com/entry/1");
        assert!(feed.items[0].updated.is_some());
    }

    #[test]
    fn test_extensions_are_attached_in_document_order() {
        let feed = parse_feed(RSS.as_bytes(), "https://example.com/feed.xml").unwrap();

        assert_eq!(
            feed.items[0].extension(FEEDBURNER_NS, "origLink"),
            Some("https://example.com/post/1")
        );
        assert_eq!(feed.items[1].extension(FEEDBURNER_NS, "origLink"), None);
    }

    #[test]
    fn test_atom_elements_are_not_extensions() {
        let feed = parse_feed(ATOM.as_bytes(), "https://example.com/feed.xml").unwrap();
        assert!(feed.items[0].extensions.is_empty());
    }

    #[test]
    fn test_html_is_not_a_feed() {
        let err = parse_feed(b"<html><body>Hello</body></html>", "https://example.com").unwrap_err();
        assert!(matches!(err, ParseError::NotAFeed(_)));
    }

    #[test]
    fn test_self_closing_items_keep_extensions_aligned() {
        let rss = r#"<rss version="2.0" xmlns:feedburner="http://rssnamespace.org/feedburner/ext/1.0">
<channel><title>T</title>
  <item/>
  <item><feedburner:origLink>https://example.com/real</feedburner:origLink><feedburner:flag/></item>
</channel></rss>"#;

        let scanned = scan_extensions(rss.as_bytes());

        assert_eq!(scanned.len(), 2);
        assert!(scanned[0].is_empty());
        assert_eq!(
            scanned[1],
            vec![
                Extension {
                    namespace: FEEDBURNER_NS.to_owned(),
                    name: "origLink".to_owned(),
                    value: "https://example.com/real".to_owned(),
                },
                Extension {
                    namespace: FEEDBURNER_NS.to_owned(),
                    name: "flag".to_owned(),
                    value: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_scan_extensions_tolerates_garbage() {
        assert!(scan_extensions(b"{\"version\": \"json\"}").is_empty());
        assert!(scan_extensions(b"").is_empty());
    }
}
