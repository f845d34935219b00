use anyhow::{Context, Result};
use serde::Serialize;

use super::timestamp;
use crate::feed::Feed;

#[derive(Serialize)]
struct JsonFeed<'a> {
    title: Option<&'a str>,
    desc: Option<&'a str>,
    link: Option<&'a str>,
    items: Vec<JsonItem<'a>>,
}

#[derive(Serialize)]
struct JsonItem<'a> {
    title: Option<&'a str>,
    link: &'a str,
    desc: Option<&'a str>,
    content: Option<&'a str>,
    time: Option<String>,
    updated: Option<String>,
}

impl<'a> From<&'a Feed> for JsonFeed<'a> {
    fn from(feed: &'a Feed) -> Self {
        Self {
            title: feed.title.as_deref(),
            desc: feed.description.as_deref(),
            link: feed.link.as_deref(),
            items: feed
                .items
                .iter()
                .map(|item| JsonItem {
                    title: item.title.as_deref(),
                    link: &item.link,
                    desc: item.description.as_deref(),
                    content: item.content.as_deref(),
                    time: timestamp(item.published),
                    updated: timestamp(item.updated),
                })
                .collect(),
        }
    }
}

/// Renders the feed as JSON; `indent` pretty-prints with four spaces.
pub fn render(feed: &Feed, indent: bool) -> Result<String> {
    let doc = JsonFeed::from(feed);
    if !indent {
        return serde_json::to_string(&doc).context("Failed to serialize JSON");
    }

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    doc.serialize(&mut serializer)
        .context("Failed to serialize JSON")?;
    String::from_utf8(out).context("JSON output is not valid UTF-8")
}
